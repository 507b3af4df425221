//! Integration tests for repository harvesting
//!
//! A wiremock server plays both the contents API (under `/api`) and the raw
//! file host (under `/raw`).

use docs_harvester::config::{Config, CrawlerConfig, Format, GithubConfig, OutputConfig};
use docs_harvester::crawler::{harvest, RAW_DIR_NAME};
use docs_harvester::storage::{JsonStateStore, StateStore};
use docs_harvester::url::{parse_target, Target};
use docs_harvester::{AbortReason, RunOutcome};
use serde_json::json;
use std::path::Path;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INTRO: &str = "---\ntitle: Intro\n---\n# Introduction\r\n\r\nThis project harvests documentation from many places.\r\n";
const SETUP: &str = "# Setup\n\nInstall the tool and point it at a documentation site.\n\n```sh\nharvest docs.example.com\n```\n";

fn create_test_config(server: &MockServer, output_dir: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            request_delay_ms: 0,
            backoff_base_ms: 1,
            max_retries: 1,
            ..CrawlerConfig::default()
        },
        output: OutputConfig {
            output_dir: output_dir.to_path_buf(),
            formats: vec![Format::Json, Format::Markdown],
            ..OutputConfig::default()
        },
        github: GithubConfig {
            token: Some("secret".to_string()),
            api_base_url: format!("{}/api", server.uri()),
            raw_base_url: format!("{}/raw", server.uri()),
            ..GithubConfig::default()
        },
        ..Config::default()
    }
}

fn raw_url(server: &MockServer, file: &str) -> String {
    format!("{}/raw/acme/widgets/main/docs/{}", server.uri(), file)
}

async fn mount_listings(server: &MockServer, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/api/repos/acme/widgets/contents/docs"))
        .and(query_param("ref", "main"))
        .and(header("authorization", "token secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "name": "intro.md",
                "path": "docs/intro.md",
                "type": "file",
                "download_url": raw_url(server, "intro.md")
            },
            {
                "name": "logo.png",
                "path": "docs/logo.png",
                "type": "file",
                "download_url": raw_url(server, "logo.png")
            },
            {
                "name": "guide",
                "path": "docs/guide",
                "type": "dir",
                "download_url": null
            }
        ])))
        .expect(expected)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/repos/acme/widgets/contents/docs/guide"))
        .and(query_param("ref", "main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "name": "setup.md",
                "path": "docs/guide/setup.md",
                "type": "file",
                "download_url": raw_url(server, "guide/setup.md")
            }
        ])))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_file(server: &MockServer, file: &str, body: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/raw/acme/widgets/main/docs/{}", file)))
        .and(header("authorization", "token secret"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/plain"))
        .expect(expected)
        .mount(server)
        .await;
}

fn repo_target(config: &Config) -> Target {
    parse_target("acme/widgets", &config.github).unwrap()
}

#[tokio::test]
async fn test_repo_harvest() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, out.path());

    mount_listings(&server, 1).await;
    mount_file(&server, "intro.md", INTRO, 1).await;
    mount_file(&server, "guide/setup.md", SETUP, 1).await;

    let target = repo_target(&config);
    let summary = harvest(&config, &target, std::future::pending()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.requests_issued, 4);
    assert!(summary.project_dir.ends_with("github_docs_acme_widgets"));

    // Raw documents keep their layout below the docs directory
    let raw_dir = summary.project_dir.join(RAW_DIR_NAME);
    assert_eq!(
        std::fs::read_to_string(raw_dir.join("intro.md")).unwrap(),
        "# Introduction\n\nThis project harvests documentation from many places.\n"
    );
    assert!(raw_dir.join("guide").join("setup.md").exists());

    let markdown_path = summary
        .artifacts
        .iter()
        .find(|p| p.extension().and_then(|e| e.to_str()) == Some("md"))
        .unwrap();
    assert!(markdown_path.ends_with("acme_widgets_docs.md"));
    let markdown = std::fs::read_to_string(markdown_path).unwrap();
    assert!(markdown.starts_with("# acme/widgets Documentation"));
    assert!(markdown.contains("## Setup"));
    assert!(markdown.contains("```sh\nharvest docs.example.com\n```"));

    let records: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(summary.project_dir.join("acme_widgets_docs.json")).unwrap(),
    )
    .unwrap();
    let paths: Vec<&str> = records
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["source_path"].as_str())
        .collect();
    assert_eq!(paths, vec!["intro.md", "guide/setup.md"]);
}

#[tokio::test]
async fn test_rate_limit_aborts_and_resumes() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, out.path());

    mount_listings(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/raw/acme/widgets/main/docs/intro.md"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", "1700000000"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let target = repo_target(&config);
    let summary = harvest(&config, &target, std::future::pending()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Aborted(AbortReason::RateLimited));
    assert_eq!(summary.outcome.exit_code(), 2);
    assert_eq!(summary.pages, 0);
    assert_eq!(summary.failed, 0);

    let store = JsonStateStore::in_project(&summary.project_dir, target.origin_key());
    let saved = store.load().unwrap().expect("checkpoint written on abort");
    assert_eq!(
        saved.frontier.front().map(|e| e.url.as_str()),
        Some(raw_url(&server, "intro.md").as_str())
    );

    // Resume after the limit resets; listings are not fetched again
    server.reset().await;
    mount_listings(&server, 0).await;
    mount_file(&server, "intro.md", INTRO, 1).await;
    mount_file(&server, "guide/setup.md", SETUP, 1).await;

    let mut resumed_config = config.clone();
    resumed_config.output.incremental = true;
    let resumed = harvest(&resumed_config, &target, std::future::pending())
        .await
        .unwrap();

    assert_eq!(resumed.outcome, RunOutcome::Completed);
    assert_eq!(resumed.pages, 2);
    assert_eq!(resumed.requests_issued, 2);
}

#[tokio::test]
async fn test_missing_docs_directory() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, out.path());

    Mock::given(method("GET"))
        .and(path("/api/repos/acme/widgets/contents/docs"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let target = repo_target(&config);
    let summary = harvest(&config, &target, std::future::pending()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Aborted(AbortReason::NothingFetched));
    assert!(summary.artifacts.is_empty());
}
