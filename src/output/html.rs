//! Single-document HTML rendering
//!
//! The document has a title, a generation timestamp, a table of contents
//! and every page in discovery order. It doubles as the input of the PDF
//! renderer, so it carries its own print stylesheet.

use crate::output::traits::OutputResult;
use crate::state::{ContentBlock, PageRecord};
use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write as _;
use std::path::Path;

const STYLESHEET: &str = r#"
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; line-height: 1.5; max-width: 52em; margin: 0 auto; padding: 1em; color: #222; }
pre { background: #f6f8fa; padding: 0.8em; overflow-x: auto; white-space: pre-wrap; }
code { font-family: "SFMono-Regular", Consolas, monospace; font-size: 0.9em; }
img { max-width: 100%; }
.generated, .source { color: #666; font-size: 0.85em; }
.toc ol { padding-left: 1.2em; }
.page { page-break-before: always; }
"#;

/// Writes the HTML document for `pages`
///
/// Failed records must already be filtered out by the caller.
pub fn write_html(
    pages: &[&PageRecord],
    title: &str,
    generated_at: DateTime<Utc>,
    output_path: &Path,
) -> OutputResult<()> {
    let html = render_html(pages, title, generated_at);
    std::fs::write(output_path, html)?;
    Ok(())
}

/// Renders the HTML document for `pages`
pub fn render_html(pages: &[&PageRecord], title: &str, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let title = encode_text(title);

    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{} Documentation</title>", title);
    let _ = writeln!(out, "<style>{}</style>", STYLESHEET);
    out.push_str("</head>\n<body>\n");

    let _ = writeln!(out, "<h1>{} Documentation</h1>", title);
    let _ = writeln!(
        out,
        "<p class=\"generated\">Generated {} from {} pages</p>",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        pages.len()
    );

    out.push_str("<nav class=\"toc\">\n<h2>Table of Contents</h2>\n<ol>\n");
    for (index, page) in pages.iter().enumerate() {
        let _ = writeln!(
            out,
            "<li><a href=\"#{}\">{}</a></li>",
            anchor(index),
            encode_text(&page.title)
        );
    }
    out.push_str("</ol>\n</nav>\n");

    for (index, page) in pages.iter().enumerate() {
        let _ = writeln!(out, "<section class=\"page\" id=\"{}\">", anchor(index));
        let _ = writeln!(out, "<h1 class=\"page-title\">{}</h1>", encode_text(&page.title));
        let _ = writeln!(
            out,
            "<p class=\"source\">Source: <a href=\"{}\">{}</a></p>",
            encode_double_quoted_attribute(&page.url),
            encode_text(&page.url)
        );
        for block in &page.content_blocks {
            render_block(&mut out, block);
        }
        out.push_str("</section>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn anchor(index: usize) -> String {
    format!("page-{}", index + 1)
}

fn render_block(out: &mut String, block: &ContentBlock) {
    match block {
        ContentBlock::Heading { level, text } => {
            // Page titles take h1
            let level = (*level).saturating_add(1).clamp(2, 6);
            let _ = writeln!(out, "<h{0}>{1}</h{0}>", level, encode_text(text));
        }
        ContentBlock::Text { text } => {
            let lines: Vec<String> = text.lines().map(|l| encode_text(l).into_owned()).collect();
            let _ = writeln!(out, "<p>{}</p>", lines.join("<br>\n"));
        }
        ContentBlock::Code { language, code } => match language {
            Some(language) => {
                let _ = writeln!(
                    out,
                    "<pre><code class=\"language-{}\">{}</code></pre>",
                    encode_double_quoted_attribute(language),
                    encode_text(code)
                );
            }
            None => {
                let _ = writeln!(out, "<pre><code>{}</code></pre>", encode_text(code));
            }
        },
        ContentBlock::Image { src, alt } => {
            let _ = writeln!(
                out,
                "<figure><img src=\"{}\" alt=\"{}\"></figure>",
                encode_double_quoted_attribute(src),
                encode_double_quoted_attribute(alt)
            );
        }
        ContentBlock::List { ordered, items } => {
            let tag = if *ordered { "ol" } else { "ul" };
            let _ = writeln!(out, "<{}>", tag);
            for item in items {
                let _ = writeln!(out, "<li>{}</li>", encode_text(item));
            }
            let _ = writeln!(out, "</{}>", tag);
        }
    }
}
