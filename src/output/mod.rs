//! Output module for assembling harvested pages into artifacts
//!
//! This module handles:
//! - A JSON record file with every page record
//! - One HTML document with a table of contents
//! - A PDF rendered from that HTML document by an external program
//! - A Markdown rendering of the same document

mod html;
mod json;
mod markdown;
mod pdf;
mod traits;

pub use html::{render_html, write_html};
pub use json::write_json;
pub use markdown::{format_markdown, write_markdown};
pub use pdf::CommandRenderer;
pub use traits::{OutputError, OutputResult, PdfRenderer};

use crate::config::Format;
use crate::state::{ContentBlock, PageRecord};
use crate::url::resolve_resource;
use chrono::Utc;
use std::path::{Path, PathBuf};
use url::Url;

/// Where and how artifacts are written
pub struct ExportContext<'a> {
    /// Directory receiving the artifacts
    pub dir: &'a Path,
    /// Artifact base name; each format appends its extension
    pub stem: &'a str,
    /// Document title
    pub title: &'a str,
    /// Omit images from every artifact
    pub strip_images: bool,
    pub renderer: &'a dyn PdfRenderer,
}

impl ExportContext<'_> {
    /// Path of the artifact for `format`
    pub fn artifact_path(&self, format: Format) -> PathBuf {
        self.dir
            .join(format!("{}.{}", self.stem, format.extension()))
    }
}

/// Writes the requested artifacts for `pages`
///
/// JSON carries every record; the document formats carry pages with
/// content only. The HTML document is written whenever HTML or PDF is
/// requested, since the PDF is rendered from it. A renderer failure is
/// logged and leaves the PDF out of the returned list.
///
/// # Returns
///
/// * `Ok(paths)` - Paths of the artifacts written, in format order
/// * `Err(OutputError)` - An artifact could not be written
pub fn export(
    pages: &[PageRecord],
    formats: &[Format],
    ctx: &ExportContext<'_>,
) -> OutputResult<Vec<PathBuf>> {
    std::fs::create_dir_all(ctx.dir)?;

    let prepared = prepare_pages(pages, ctx.strip_images);
    let documents: Vec<&PageRecord> = prepared
        .iter()
        .filter(|page| page.status.has_content())
        .collect();
    let generated_at = Utc::now();
    let wants = |format: Format| formats.contains(&format);

    let mut artifacts = Vec::new();

    if wants(Format::Json) {
        let path = ctx.artifact_path(Format::Json);
        write_json(&prepared, &path)?;
        artifacts.push(path);
    }

    if wants(Format::Html) || wants(Format::Pdf) {
        let path = ctx.artifact_path(Format::Html);
        write_html(&documents, ctx.title, generated_at, &path)?;
        artifacts.push(path);
    }

    if wants(Format::Markdown) {
        let path = ctx.artifact_path(Format::Markdown);
        write_markdown(&documents, ctx.title, generated_at, &path)?;
        artifacts.push(path);
    }

    if wants(Format::Pdf) {
        let html = ctx.artifact_path(Format::Html);
        let pdf = ctx.artifact_path(Format::Pdf);
        match ctx.renderer.render(&html, &pdf) {
            Ok(()) => artifacts.push(pdf),
            Err(e) => tracing::error!("Skipping PDF: {}", e),
        }
    }

    for path in &artifacts {
        tracing::info!("Wrote {}", path.display());
    }

    Ok(artifacts)
}

/// Copies pages with image references made absolute, or removed entirely
fn prepare_pages(pages: &[PageRecord], strip_images: bool) -> Vec<PageRecord> {
    pages
        .iter()
        .cloned()
        .map(|mut page| {
            if strip_images {
                page.strip_images();
                return page;
            }

            let Ok(base) = Url::parse(&page.url) else {
                return page;
            };
            for block in &mut page.content_blocks {
                if let ContentBlock::Image { src, .. } = block {
                    if let Some(absolute) = resolve_resource(src, &base) {
                        *src = absolute;
                    }
                }
            }
            page.images = page
                .images
                .iter()
                .map(|src| resolve_resource(src, &base).unwrap_or_else(|| src.clone()))
                .collect();
            page
        })
        .collect()
}
