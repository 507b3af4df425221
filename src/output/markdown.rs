//! Markdown document generation
//!
//! This module renders the harvested pages as one Markdown file with a
//! contents list, for readers who prefer plain text over HTML or PDF.

use crate::output::traits::OutputResult;
use crate::state::{ContentBlock, PageRecord};
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the Markdown document for `pages`
///
/// # Arguments
///
/// * `pages` - Pages with content, in discovery order
/// * `title` - Document title
/// * `generated_at` - Timestamp shown under the title
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the document
/// * `Err(OutputError)` - Failed to write the document
pub fn write_markdown(
    pages: &[&PageRecord],
    title: &str,
    generated_at: DateTime<Utc>,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown(pages, title, generated_at);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats pages as a Markdown document
pub fn format_markdown(pages: &[&PageRecord], title: &str, generated_at: DateTime<Utc>) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {} Documentation\n\n", title));
    md.push_str(&format!(
        "_Generated {} from {} pages_\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        pages.len()
    ));

    md.push_str("## Contents\n\n");
    for (index, page) in pages.iter().enumerate() {
        md.push_str(&format!(
            "{}. [{}](#page-{})\n",
            index + 1,
            escape_inline(&page.title),
            index + 1
        ));
    }
    md.push('\n');

    for (index, page) in pages.iter().enumerate() {
        md.push_str("---\n\n");
        md.push_str(&format!("<a id=\"page-{}\"></a>\n\n", index + 1));
        md.push_str(&format!("## {}\n\n", escape_inline(&page.title)));
        md.push_str(&format!("Source: <{}>\n\n", page.url));
        for block in &page.content_blocks {
            format_block(&mut md, block);
        }
    }

    md
}

fn format_block(md: &mut String, block: &ContentBlock) {
    match block {
        ContentBlock::Heading { level, text } => {
            // Document and page titles take the first two levels
            let level = usize::from(*level).saturating_add(2).min(6);
            md.push_str(&format!("{} {}\n\n", "#".repeat(level), text));
        }
        ContentBlock::Text { text } => {
            md.push_str(&text.lines().collect::<Vec<_>>().join("  \n"));
            md.push_str("\n\n");
        }
        ContentBlock::Code { language, code } => {
            let fence = if code.contains("```") { "~~~~" } else { "```" };
            md.push_str(&format!(
                "{}{}\n{}\n{}\n\n",
                fence,
                language.as_deref().unwrap_or(""),
                code,
                fence
            ));
        }
        ContentBlock::Image { src, alt } => {
            md.push_str(&format!("![{}]({})\n\n", escape_inline(alt), src));
        }
        ContentBlock::List { ordered, items } => {
            for (index, item) in items.iter().enumerate() {
                if *ordered {
                    md.push_str(&format!("{}. {}\n", index + 1, item));
                } else {
                    md.push_str(&format!("- {}\n", item));
                }
            }
            md.push('\n');
        }
    }
}

/// Escapes characters that would break link text
fn escape_inline(text: &str) -> String {
    text.replace('[', "\\[").replace(']', "\\]")
}
