//! Markdown normalization and extraction
//!
//! Repository documentation arrives as raw Markdown. It is normalized
//! (line endings, front matter) before being written to disk and parsed
//! with `pulldown-cmark` into the same block model HTML pages use.

use crate::crawler::parser::ExtractOptions;
use crate::state::{ContentBlock, PageRecord, PageStatus};
use crate::url::resolve_resource;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use url::Url;

/// Normalizes line endings and removes YAML front matter
pub fn normalize_markdown(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let body = strip_front_matter(&unified);
    let mut out = body.trim_start_matches('\n').trim_end().to_string();
    out.push('\n');
    out
}

/// Returns the document without a leading `---` delimited front matter block
///
/// Input must already use `\n` line endings. A document whose opening
/// delimiter is never closed is returned unchanged.
pub fn strip_front_matter(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("---\n") else {
        return text;
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        offset += line.len();
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return &rest[offset..];
        }
    }
    text
}

/// Extracts a page record from a Markdown document
///
/// The title is the first level-1 heading, then the file stem of the URL.
/// Relative image references are resolved against `url`.
pub fn extract_markdown(url: &Url, raw: &str, options: &ExtractOptions) -> PageRecord {
    let normalized = normalize_markdown(raw);

    let mut writer = MarkdownWriter::new(url, options.strip_images);
    let parser = Parser::new_ext(
        &normalized,
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS,
    );
    for event in parser {
        writer.handle(event);
    }

    let title = writer
        .first_h1()
        .or_else(|| file_stem(url))
        .unwrap_or_else(|| url.to_string());

    let mut record = PageRecord::new(url.as_str(), title, PageStatus::Fetched);
    record.content_blocks = writer.blocks;
    record.images = writer.images;
    record
}

fn file_stem(url: &Url) -> Option<String> {
    let name = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let stem = name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name);
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Event sink building content blocks
struct MarkdownWriter<'a> {
    base: &'a Url,
    strip_images: bool,
    blocks: Vec<ContentBlock>,
    images: std::collections::BTreeSet<String>,
    text: String,
    heading: Option<u8>,
    code: Option<(Option<String>, String)>,
    lists: Vec<(bool, Vec<String>)>,
    image: Option<(String, String)>,
    table_rows: Vec<String>,
    table_row: Vec<String>,
}

impl<'a> MarkdownWriter<'a> {
    fn new(base: &'a Url, strip_images: bool) -> Self {
        Self {
            base,
            strip_images,
            blocks: Vec::new(),
            images: Default::default(),
            text: String::new(),
            heading: None,
            code: None,
            lists: Vec::new(),
            image: None,
            table_rows: Vec::new(),
            table_row: Vec::new(),
        }
    }

    fn first_h1(&self) -> Option<String> {
        self.blocks.iter().find_map(|block| match block {
            ContentBlock::Heading { level: 1, text } => Some(text.clone()),
            _ => None,
        })
    }

    fn take_text(&mut self) -> String {
        let text = collapse_whitespace(&self.text);
        self.text.clear();
        text
    }

    fn flush_text(&mut self) {
        let text = self.take_text();
        if !text.is_empty() {
            self.blocks.push(ContentBlock::Text { text });
        }
    }

    /// Moves gathered text into the innermost open list as an item
    fn flush_item(&mut self) {
        let text = self.take_text();
        if let Some((_, items)) = self.lists.last_mut() {
            if !text.is_empty() {
                items.push(text);
            }
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if let Some((_, code)) = self.code.as_mut() {
                    code.push_str(&text);
                } else if let Some((_, alt)) = self.image.as_mut() {
                    alt.push_str(&text);
                } else {
                    self.text.push_str(&text);
                }
            }
            Event::Code(code) => {
                self.text.push_str(&code);
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some((_, code)) = self.code.as_mut() {
                    code.push('\n');
                } else {
                    self.text.push(' ');
                }
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading(level, _, _) => {
                self.flush_text();
                self.heading = Some(level as u8);
            }
            Tag::Paragraph => {
                if self.lists.is_empty() {
                    self.flush_text();
                }
            }
            Tag::CodeBlock(kind) => {
                self.flush_text();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .filter(|lang| !lang.is_empty())
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((language, String::new()));
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.flush_text();
                } else {
                    self.flush_item();
                }
                self.lists.push((start.is_some(), Vec::new()));
            }
            Tag::Item => {
                self.flush_item();
            }
            Tag::Image(_, dest, _) => {
                self.image = Some((dest.to_string(), String::new()));
            }
            Tag::Table(_) => {
                self.flush_text();
                self.table_rows.clear();
            }
            Tag::TableHead | Tag::TableRow => {
                self.table_row.clear();
            }
            Tag::TableCell => {
                self.text.clear();
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading(..) => {
                let text = self.take_text();
                if let Some(level) = self.heading.take() {
                    if !text.is_empty() {
                        self.blocks.push(ContentBlock::Heading { level, text });
                    }
                }
            }
            Tag::Paragraph => {
                if self.lists.is_empty() {
                    self.flush_text();
                } else {
                    self.text.push(' ');
                }
            }
            Tag::CodeBlock(_) => {
                if let Some((language, code)) = self.code.take() {
                    let code = code.trim_end_matches('\n').to_string();
                    if !code.trim().is_empty() {
                        self.blocks.push(ContentBlock::Code { language, code });
                    }
                }
            }
            Tag::Item => {
                self.flush_item();
            }
            Tag::List(_) => {
                self.flush_item();
                if let Some((ordered, items)) = self.lists.pop() {
                    match self.lists.last_mut() {
                        Some((_, parent)) => parent.extend(items),
                        None if !items.is_empty() => {
                            self.blocks.push(ContentBlock::List { ordered, items });
                        }
                        None => {}
                    }
                }
            }
            Tag::Image(..) => {
                if let Some((dest, alt)) = self.image.take() {
                    self.push_image(&dest, &alt);
                }
            }
            Tag::TableCell => {
                let cell = self.take_text();
                self.table_row.push(cell);
            }
            Tag::TableHead | Tag::TableRow => {
                let row = std::mem::take(&mut self.table_row).join(" | ");
                if !row.trim().is_empty() {
                    self.table_rows.push(row);
                }
            }
            Tag::Table(_) => {
                let text = std::mem::take(&mut self.table_rows).join("\n");
                if !text.is_empty() {
                    self.blocks.push(ContentBlock::Text { text });
                }
            }
            _ => {}
        }
    }

    fn push_image(&mut self, dest: &str, alt: &str) {
        if self.strip_images {
            return;
        }
        let Some(src) = resolve_resource(dest, self.base) else {
            return;
        };
        self.images.insert(src.clone());
        self.blocks.push(ContentBlock::Image {
            src,
            alt: collapse_whitespace(alt),
        });
    }
}
