//! Integration tests for website harvesting
//!
//! These tests use wiremock to create mock documentation sites and run the
//! full harvest cycle end-to-end into a temporary output directory.

use docs_harvester::config::{Config, CrawlerConfig, Format, OutputConfig};
use docs_harvester::crawler::{harvest, HarvestSummary};
use docs_harvester::storage::{JsonStateStore, StateStore, STATE_FILE_NAME};
use docs_harvester::url::{parse_target, Target};
use docs_harvester::{AbortReason, RunOutcome};
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fast test configuration writing below `output_dir`
fn create_test_config(output_dir: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            request_delay_ms: 0,
            backoff_base_ms: 1,
            max_retries: 2,
            request_timeout_secs: 30,
            ..CrawlerConfig::default()
        },
        output: OutputConfig {
            output_dir: output_dir.to_path_buf(),
            formats: vec![Format::Json, Format::Html, Format::Markdown],
            cache_ttl: 0,
            ..OutputConfig::default()
        },
        ..Config::default()
    }
}

/// A documentation page with a navigation block and real content
fn doc_page(title: &str, links: &[&str], body: &str) -> String {
    let nav: String = links
        .iter()
        .map(|href| format!("<a href=\"{}\">{}</a>", href, href))
        .collect();
    format!(
        r#"<html><head><title>{title} | Docs</title></head><body>
        <nav class="sidebar">{nav}</nav>
        <main>
            <h1>{title}</h1>
            <p>{body}</p>
        </main>
        <footer>Copyright Example Corp</footer>
        </body></html>"#
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

async fn mount_page(server: &MockServer, route: &str, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .expect(expected)
        .mount(server)
        .await;
}

fn site_target(server: &MockServer, config: &Config) -> Target {
    parse_target(&format!("{}/", server.uri()), &config.github).unwrap()
}

fn read_artifact(summary: &HarvestSummary, extension: &str) -> String {
    let path = summary
        .artifacts
        .iter()
        .find(|p| p.extension().and_then(|e| e.to_str()) == Some(extension))
        .unwrap_or_else(|| panic!("no .{} artifact in {:?}", extension, summary.artifacts));
    std::fs::read_to_string(path).unwrap()
}

/// Never resolves
fn no_shutdown() -> std::future::Pending<()> {
    std::future::pending()
}

#[tokio::test]
async fn test_full_site_crawl() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();
    let config = create_test_config(out.path());

    mount_page(
        &server,
        "/",
        doc_page(
            "Welcome",
            &["/guide", "/reference", "https://elsewhere.example/page", "/assets/logo.png"],
            "Welcome to the example project documentation.",
        ),
        1,
    )
    .await;
    mount_page(
        &server,
        "/guide",
        doc_page("Guide", &["/", "/reference"], "The guide walks through installation and setup."),
        1,
    )
    .await;
    mount_page(
        &server,
        "/reference",
        doc_page("Reference", &["/guide"], "The reference lists every configuration option."),
        1,
    )
    .await;

    let target = site_target(&server, &config);
    let summary = harvest(&config, &target, no_shutdown()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.pages, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.artifacts.len(), 3);
    assert!(summary.artifacts.iter().all(|p| p.exists()));

    // Discovery order: root, then the links in page order
    let document = read_artifact(&summary, "html");
    let welcome = document.find("Welcome").unwrap();
    let guide = document.find("Guide").unwrap();
    let reference = document.find("Reference").unwrap();
    assert!(welcome < guide && guide < reference);
    assert!(!document.contains("Copyright Example Corp"));

    let markdown = read_artifact(&summary, "md");
    assert!(markdown.contains("The reference lists every configuration option."));

    let records: serde_json::Value = serde_json::from_str(&read_artifact(&summary, "json")).unwrap();
    assert_eq!(records.as_array().unwrap().len(), 3);

    // A completed run without --incremental leaves no checkpoint behind
    assert!(!summary.project_dir.join(STATE_FILE_NAME).exists());
}

#[tokio::test]
async fn test_max_pages_stops_run() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();
    let mut config = create_test_config(out.path());
    config.crawler.max_pages = Some(2);

    mount_page(
        &server,
        "/",
        doc_page("Home", &["/one", "/two"], "Home page with plenty of introductory text."),
        1,
    )
    .await;
    mount_page(&server, "/one", doc_page("One", &[], "First chapter of the documentation."), 1).await;
    mount_page(&server, "/two", doc_page("Two", &[], "Second chapter of the documentation."), 0).await;

    let target = site_target(&server, &config);
    let summary = harvest(&config, &target, no_shutdown()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.pages, 2);
}

#[tokio::test]
async fn test_max_depth_limits_links() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();
    let mut config = create_test_config(out.path());
    config.crawler.max_depth = Some(1);

    mount_page(&server, "/", doc_page("Home", &["/a"], "Home page with introductory text."), 1).await;
    mount_page(&server, "/a", doc_page("A", &["/b"], "Depth one page with some content."), 1).await;
    mount_page(&server, "/b", doc_page("B", &[], "Depth two page never fetched."), 0).await;

    let target = site_target(&server, &config);
    let summary = harvest(&config, &target, no_shutdown()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.pages, 2);
}

#[tokio::test]
async fn test_non_documentation_site_aborts() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();
    let mut config = create_test_config(out.path());
    config.crawler.max_consecutive_non_doc = 3;

    let links = ["/e1", "/e2", "/e3", "/e4", "/e5", "/e6"];
    mount_page(
        &server,
        "/",
        format!(
            "<html><body><nav>{}</nav></body></html>",
            links
                .iter()
                .map(|l| format!("<a href=\"{}\">x</a>", l))
                .collect::<String>()
        ),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .respond_with(html("<html><body><p>Login</p></body></html>".to_string()))
        .mount(&server)
        .await;

    let target = site_target(&server, &config);
    let summary = harvest(&config, &target, no_shutdown()).await.unwrap();

    assert_eq!(
        summary.outcome,
        RunOutcome::Aborted(AbortReason::NonDocumentation)
    );
    assert_eq!(summary.outcome.exit_code(), 2);
    assert_eq!(summary.pages, 0);
    assert!(summary.artifacts.is_empty());
    // Root plus three near-empty pages trip the guard
    assert_eq!(summary.requests_issued, 4);
}

#[tokio::test]
async fn test_failed_pages_are_recorded() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();
    let config = create_test_config(out.path());

    mount_page(
        &server,
        "/",
        doc_page("Home", &["/missing", "/flaky"], "Home page with introductory text."),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    // First attempt fails, the retry succeeds
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/flaky", doc_page("Flaky", &[], "Served on the second attempt."), 1).await;

    let target = site_target(&server, &config);
    let summary = harvest(&config, &target, no_shutdown()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.requests_issued, 4);

    // Failures stay in the JSON records but not in the document
    let records = read_artifact(&summary, "json");
    assert!(records.contains("/missing"));
    assert!(records.contains("\"failed\""));
    let document = read_artifact(&summary, "html");
    assert!(!document.contains("/missing"));
    assert!(document.contains("Served on the second attempt."));
}

#[tokio::test]
async fn test_no_images_in_any_artifact() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();
    let mut config = create_test_config(out.path());
    config.output.no_images = true;

    mount_page(
        &server,
        "/",
        r#"<html><body><main>
            <h1>Architecture</h1>
            <p>The system is split into three services that talk over a queue.</p>
            <img src="/img/diagram.png" alt="Architecture diagram">
        </main></body></html>"#
            .to_string(),
        1,
    )
    .await;

    let target = site_target(&server, &config);
    let summary = harvest(&config, &target, no_shutdown()).await.unwrap();

    assert_eq!(summary.pages, 1);
    for artifact in &summary.artifacts {
        let content = std::fs::read_to_string(artifact).unwrap();
        assert!(
            !content.contains("diagram.png"),
            "{} still references the image",
            artifact.display()
        );
    }
}

#[tokio::test]
async fn test_images_are_absolute_by_default() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();
    let config = create_test_config(out.path());

    mount_page(
        &server,
        "/",
        r#"<html><body><main>
            <h1>Architecture</h1>
            <p>The system is split into three services that talk over a queue.</p>
            <img src="img/diagram.png" alt="Architecture diagram">
        </main></body></html>"#
            .to_string(),
        1,
    )
    .await;

    let target = site_target(&server, &config);
    let summary = harvest(&config, &target, no_shutdown()).await.unwrap();

    let document = read_artifact(&summary, "html");
    assert!(document.contains(&format!("{}/img/diagram.png", server.uri())));
}

#[tokio::test]
async fn test_cache_serves_second_run() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();
    let mut config = create_test_config(out.path());
    config.output.cache_ttl = 3600;

    mount_page(&server, "/", doc_page("Home", &["/page"], "Home page with introductory text."), 1).await;
    mount_page(&server, "/page", doc_page("Page", &[], "A page that should only be fetched once."), 1).await;

    let target = site_target(&server, &config);
    let first = harvest(&config, &target, no_shutdown()).await.unwrap();
    assert_eq!(first.requests_issued, 2);

    let second = harvest(&config, &target, no_shutdown()).await.unwrap();
    assert_eq!(second.outcome, RunOutcome::Completed);
    assert_eq!(second.pages, 2);
    assert_eq!(second.requests_issued, 0);

    let records = read_artifact(&second, "json");
    assert!(records.contains("\"cache_hit\""));
}

#[tokio::test]
async fn test_cached_redirect_resolves_links() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();
    let mut config = create_test_config(out.path());
    config.output.cache_ttl = 3600;

    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/docs/"))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/docs/", doc_page("Docs", &["intro"], "Documentation landing page."), 1).await;
    mount_page(&server, "/docs/intro", doc_page("Intro", &[], "Relative links resolve below the docs root."), 1).await;

    let target = parse_target(&format!("{}/docs/", server.uri()), &config.github).unwrap();
    let first = harvest(&config, &target, no_shutdown()).await.unwrap();
    assert_eq!(first.outcome, RunOutcome::Completed);
    assert_eq!(first.pages, 2);
    assert_eq!(first.failed, 0);

    // The cached root must still resolve "intro" against the redirect target
    let second = harvest(&config, &target, no_shutdown()).await.unwrap();
    assert_eq!(second.outcome, RunOutcome::Completed);
    assert_eq!(second.pages, 2);
    assert_eq!(second.failed, 0);
    assert_eq!(second.requests_issued, 0);
    assert!(read_artifact(&second, "json").contains(&format!("{}/docs/intro", server.uri())));
}

#[tokio::test]
async fn test_incremental_rerun_fetches_nothing() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();
    let mut config = create_test_config(out.path());
    config.output.incremental = true;

    mount_page(&server, "/", doc_page("Home", &["/page"], "Home page with introductory text."), 1).await;
    mount_page(&server, "/page", doc_page("Page", &[], "Content kept in the checkpoint."), 1).await;

    let target = site_target(&server, &config);
    let first = harvest(&config, &target, no_shutdown()).await.unwrap();
    assert_eq!(first.outcome, RunOutcome::Completed);
    assert!(first.project_dir.join(STATE_FILE_NAME).exists());

    let second = harvest(&config, &target, no_shutdown()).await.unwrap();
    assert_eq!(second.outcome, RunOutcome::Completed);
    assert_eq!(second.requests_issued, 0);
    assert_eq!(second.pages, 2);
    assert!(read_artifact(&second, "md").contains("Content kept in the checkpoint."));
}

#[tokio::test]
async fn test_interrupt_saves_and_resumes() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();
    let mut config = create_test_config(out.path());

    mount_page(&server, "/", doc_page("Home", &["/slow"], "Home page with introductory text."), 1).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            html(doc_page("Slow", &[], "This page takes far too long.")).set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let target = site_target(&server, &config);
    let shutdown = tokio::time::sleep(Duration::from_millis(500));
    let summary = harvest(&config, &target, shutdown).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Aborted(AbortReason::Interrupted));
    assert_eq!(summary.pages, 1);

    let store = JsonStateStore::in_project(&summary.project_dir, target.origin_key());
    let saved = store.load().unwrap().expect("checkpoint written on interrupt");
    let root = format!("{}/", server.uri());
    let slow = format!("{}/slow", server.uri());
    assert!(saved.is_visited(&root));
    assert!(!saved.is_visited(&slow));
    assert_eq!(saved.frontier.front().map(|e| e.url.as_str()), Some(slow.as_str()));

    // Resume against a fast server; the root must not be fetched again
    server.reset().await;
    mount_page(&server, "/", doc_page("Home", &[], "unused"), 0).await;
    mount_page(&server, "/slow", doc_page("Slow", &[], "Now served quickly."), 1).await;

    config.output.incremental = true;
    let resumed = harvest(&config, &target, no_shutdown()).await.unwrap();
    assert_eq!(resumed.outcome, RunOutcome::Completed);
    assert_eq!(resumed.pages, 2);
    assert_eq!(resumed.requests_issued, 1);
}

#[tokio::test]
async fn test_interrupt_after_periodic_checkpoint() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();
    let mut config = create_test_config(out.path());
    config.crawler.checkpoint_interval = 2;

    mount_page(
        &server,
        "/",
        doc_page("Home", &["/a", "/b", "/slow"], "Home page with introductory text."),
        1,
    )
    .await;
    mount_page(&server, "/a", doc_page("A", &[], "First page saved by the periodic checkpoint."), 1).await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(
            html(doc_page("B", &[], "Fetched after the periodic checkpoint."))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            html(doc_page("Slow", &[], "This page takes far too long.")).set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let target = site_target(&server, &config);
    let project_dir = out.path().join(target.project_dir_name());
    let store = JsonStateStore::in_project(&project_dir, target.origin_key());

    // The first checkpoint on disk is the periodic one, taken after two pages
    let watcher_store = store.clone();
    let watcher = tokio::spawn(async move {
        loop {
            if let Ok(Some(state)) = watcher_store.load() {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });

    let shutdown = tokio::time::sleep(Duration::from_millis(1500));
    let summary = harvest(&config, &target, shutdown).await.unwrap();
    assert_eq!(summary.outcome, RunOutcome::Aborted(AbortReason::Interrupted));
    assert_eq!(summary.pages, 3);

    let periodic = tokio::time::timeout(Duration::from_secs(1), watcher)
        .await
        .expect("periodic checkpoint was never written")
        .unwrap();
    let root = format!("{}/", server.uri());
    let a = format!("{}/a", server.uri());
    let b = format!("{}/b", server.uri());
    let slow = format!("{}/slow", server.uri());
    assert!(periodic.is_visited(&root));
    assert!(periodic.is_visited(&a));
    assert!(!periodic.is_visited(&b));

    // The interrupt checkpoint extends the periodic one with everything fetched since
    let saved = store.load().unwrap().expect("checkpoint written on interrupt");
    assert!(periodic.visited.is_subset(&saved.visited));
    assert!(saved.is_visited(&b));
    assert!(!saved.is_visited(&slow));
    assert_eq!(saved.page_count, 3);
    assert_eq!(saved.frontier.front().map(|e| e.url.as_str()), Some(slow.as_str()));
}

#[tokio::test]
async fn test_unreachable_root_fetches_nothing() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();
    let config = create_test_config(out.path());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let target = site_target(&server, &config);
    let summary = harvest(&config, &target, no_shutdown()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Aborted(AbortReason::NothingFetched));
    assert_eq!(summary.pages, 0);
    assert_eq!(summary.failed, 1);
    assert!(summary.artifacts.is_empty());
}
