//! Content extraction for fetched pages
//!
//! This module turns one fetched body into a [`PageRecord`] and the list of
//! in-scope links it points at:
//! - Picking the main content container with an ordered list of strategies
//! - Skipping navigation chrome inside that container
//! - Converting the remaining markup into typed content blocks
//! - Collecting navigation links, falling back to every anchor on the page
//!
//! Markdown bodies are handed to [`crate::crawler::markdown`].

use crate::crawler::markdown::extract_markdown;
use crate::state::{ContentBlock, PageRecord, PageStatus};
use crate::url::{resolve_link, resolve_resource};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::{BTreeSet, HashSet};
use url::Url;

/// Containers used by common documentation generators, in priority order
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    ".markdown-body",
    ".content",
    "article",
    ".docusaurus-content",
    ".gitbook-content",
    ".md-content",
    "[role=\"main\"]",
    "#readme",
    ".Box-body",
];

/// Selectors for navigation links, tried before falling back to every anchor
const NAV_LINK_SELECTORS: &[&str] = &[
    "nav a[href]",
    ".sidebar a[href]",
    ".navigation a[href]",
    ".toc a[href]",
    ".menu a[href]",
    ".js-navigation-item a[href]",
    ".Box a[href]",
];

/// Elements that never carry page content
const CHROME_TAGS: &[&str] = &[
    "nav", "footer", "aside", "header", "script", "style", "noscript", "template", "svg",
    "button", "form", "iframe",
];

/// Class names marking navigation chrome
const CHROME_CLASSES: &[&str] = &["sidebar", "navigation", "nav", "toc", "menu"];

/// Elements whose text flows into the surrounding block
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "cite", "code", "del", "em", "i", "ins", "kbd", "label", "mark", "q", "s",
    "samp", "small", "span", "strong", "sub", "sup", "time", "u", "var",
];

/// Options that change what extraction keeps
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Drop every image block and image reference
    pub strip_images: bool,
}

/// The result of extracting one page
#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: PageRecord,

    /// In-scope links in document order, normalized and deduplicated
    pub links: Vec<String>,
}

/// One way of locating the main content container
#[derive(Clone, Copy)]
pub struct ContentStrategy {
    pub name: &'static str,
    pub select: fn(&Html) -> Option<ElementRef<'_>>,
}

/// Content strategies in the order they are tried
pub const STRATEGIES: &[ContentStrategy] = &[
    ContentStrategy {
        name: "known-container",
        select: select_known_container,
    },
    ContentStrategy {
        name: "largest-text-block",
        select: select_largest_text_block,
    },
    ContentStrategy {
        name: "body",
        select: select_body,
    },
];

/// Extracts a page record and links from a fetched body
///
/// # Arguments
///
/// * `url` - The canonical page URL, used to resolve relative references
/// * `body` - The response body
/// * `content_type` - The response content type (may be empty)
/// * `options` - Extraction options
/// * `in_scope` - Predicate deciding which discovered links are kept
///
/// # Returns
///
/// An [`Extraction`] with status `fetched`. Bodies that are neither HTML nor
/// Markdown produce a record with no blocks and no links.
pub fn extract(
    url: &Url,
    body: &str,
    content_type: &str,
    options: &ExtractOptions,
    in_scope: &dyn Fn(&Url) -> bool,
) -> Extraction {
    match classify(url, body, content_type) {
        BodyKind::Html => extract_html(url, body, options, in_scope),
        BodyKind::Markdown => Extraction {
            record: extract_markdown(url, body, options),
            links: Vec::new(),
        },
        BodyKind::Other => {
            tracing::debug!("Unsupported content type '{}' at {}", content_type, url);
            Extraction {
                record: PageRecord::new(url.as_str(), url.as_str(), PageStatus::Fetched),
                links: Vec::new(),
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum BodyKind {
    Html,
    Markdown,
    Other,
}

fn classify(url: &Url, body: &str, content_type: &str) -> BodyKind {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "text/html" | "application/xhtml+xml" => BodyKind::Html,
        "text/markdown" | "text/x-markdown" => BodyKind::Markdown,
        "" | "text/plain" | "application/octet-stream" => {
            let path = url.path().to_ascii_lowercase();
            if path.ends_with(".md") || path.ends_with(".markdown") {
                BodyKind::Markdown
            } else if looks_like_html(body) {
                BodyKind::Html
            } else {
                BodyKind::Other
            }
        }
        _ => BodyKind::Other,
    }
}

fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(256).collect();
    let head = head.to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html") || head.contains("<body")
}

/// Extracts a page record and links from an HTML document
pub fn extract_html(
    url: &Url,
    html: &str,
    options: &ExtractOptions,
    in_scope: &dyn Fn(&Url) -> bool,
) -> Extraction {
    let document = Html::parse_document(html);
    let title = extract_title(&document).unwrap_or_else(|| url.to_string());

    let mut record = PageRecord::new(url.as_str(), title, PageStatus::Fetched);

    let container = STRATEGIES.iter().find_map(|strategy| {
        (strategy.select)(&document).map(|element| (strategy.name, element))
    });

    if let Some((strategy, element)) = container {
        tracing::trace!("Content of {} selected by {}", url, strategy);
        let mut writer = BlockWriter::new(url, options.strip_images);
        writer.walk(element);
        let (blocks, images) = writer.finish();
        record.content_blocks = blocks;
        record.images = images;
    }

    let links = extract_links(&document, url, in_scope);

    Extraction { record, links }
}

/// Page title: first `<h1>`, then `<title>`
fn extract_title(document: &Html) -> Option<String> {
    ["h1", "title"].iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        document
            .select(&selector)
            .map(|element| collapse_whitespace(&element.text().collect::<String>()))
            .find(|s| !s.is_empty())
    })
}

fn select_known_container(document: &Html) -> Option<ElementRef<'_>> {
    CONTENT_SELECTORS.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        document.select(&selector).find(|element| has_text(*element))
    })
}

fn select_largest_text_block(document: &Html) -> Option<ElementRef<'_>> {
    let selector = Selector::parse("div, section, td").ok()?;
    document
        .select(&selector)
        .filter(|element| !is_chrome(*element))
        .map(|element| (direct_paragraph_text(element), element))
        .filter(|(len, _)| *len > 0)
        .max_by_key(|(len, _)| *len)
        .map(|(_, element)| element)
}

fn select_body(document: &Html) -> Option<ElementRef<'_>> {
    let selector = Selector::parse("body").ok()?;
    document.select(&selector).next()
}

/// Characters of text in the element's direct `<p>` children
fn direct_paragraph_text(element: ElementRef<'_>) -> usize {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "p")
        .map(|p| p.text().map(|t| t.trim().chars().count()).sum::<usize>())
        .sum()
}

fn has_text(element: ElementRef<'_>) -> bool {
    element.text().any(|t| !t.trim().is_empty())
}

/// Returns true for navigation chrome that must not become content
fn is_chrome(element: ElementRef<'_>) -> bool {
    let value = element.value();
    if CHROME_TAGS.contains(&value.name()) {
        return true;
    }
    value
        .classes()
        .any(|class| CHROME_CLASSES.iter().any(|c| class.eq_ignore_ascii_case(c)))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of an element with chrome descendants removed, whitespace collapsed
fn element_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_text(element, &mut out);
    collapse_whitespace(&out)
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    if child.value().name() == "br" {
                        out.push(' ');
                    } else if !is_chrome(child) {
                        push_text(child, out);
                        out.push(' ');
                    }
                }
            }
            _ => {}
        }
    }
}

/// Code language from a `language-*` or `lang-*` class on `pre` or its `code`
fn code_language(pre: ElementRef<'_>) -> Option<String> {
    let from_classes = |element: ElementRef<'_>| {
        element.value().classes().find_map(|class| {
            class
                .strip_prefix("language-")
                .or_else(|| class.strip_prefix("lang-"))
                .filter(|lang| !lang.is_empty())
                .map(str::to_string)
        })
    };

    from_classes(pre).or_else(|| {
        pre.children()
            .filter_map(ElementRef::wrap)
            .find(|child| child.value().name() == "code")
            .and_then(from_classes)
    })
}

/// Walks a content container and emits blocks in document order
struct BlockWriter<'a> {
    base: &'a Url,
    strip_images: bool,
    blocks: Vec<ContentBlock>,
    images: BTreeSet<String>,
    pending: String,
}

impl<'a> BlockWriter<'a> {
    fn new(base: &'a Url, strip_images: bool) -> Self {
        Self {
            base,
            strip_images,
            blocks: Vec::new(),
            images: BTreeSet::new(),
            pending: String::new(),
        }
    }

    fn finish(mut self) -> (Vec<ContentBlock>, BTreeSet<String>) {
        self.flush();
        (self.blocks, self.images)
    }

    /// Emits gathered stray text as a text block
    fn flush(&mut self) {
        let text = collapse_whitespace(&self.pending);
        self.pending.clear();
        if !text.is_empty() {
            self.blocks.push(ContentBlock::Text { text });
        }
    }

    fn push_text_block(&mut self, text: String) {
        if !text.is_empty() {
            self.blocks.push(ContentBlock::Text { text });
        }
    }

    fn walk(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.pending.push_str(text),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.visit(child);
                    }
                }
                _ => {}
            }
        }
    }

    fn visit(&mut self, element: ElementRef<'_>) {
        if is_chrome(element) {
            return;
        }

        let name = element.value().name();
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                let level = name[1..].parse::<u8>().unwrap_or(1);
                let text = element_text(element);
                if !text.is_empty() {
                    self.blocks.push(ContentBlock::Heading { level, text });
                }
            }
            "p" | "blockquote" | "dd" | "dt" | "figcaption" => {
                self.flush();
                let text = element_text(element);
                self.push_text_block(text);
                self.collect_nested_images(element);
            }
            "pre" => {
                self.flush();
                let code: String = element.text().collect();
                let code = code.trim_matches('\n').to_string();
                if !code.trim().is_empty() {
                    self.blocks.push(ContentBlock::Code {
                        language: code_language(element),
                        code,
                    });
                }
            }
            "ul" | "ol" => {
                self.flush();
                let items: Vec<String> = element
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|child| child.value().name() == "li")
                    .map(element_text)
                    .filter(|item| !item.is_empty())
                    .collect();
                if !items.is_empty() {
                    self.blocks.push(ContentBlock::List {
                        ordered: name == "ol",
                        items,
                    });
                }
                self.collect_nested_images(element);
            }
            "table" => {
                self.flush();
                let text = table_text(element);
                self.push_text_block(text);
            }
            "img" => {
                self.flush();
                self.push_image(element);
            }
            "br" => self.pending.push(' '),
            "hr" => self.flush(),
            _ if INLINE_TAGS.contains(&name) => {
                self.walk(element);
                self.pending.push(' ');
            }
            _ => {
                self.flush();
                self.walk(element);
                self.flush();
            }
        }
    }

    /// Emits image blocks for images nested inside a text or list element
    fn collect_nested_images(&mut self, element: ElementRef<'_>) {
        let Ok(selector) = Selector::parse("img") else {
            return;
        };
        for img in element.select(&selector) {
            self.push_image(img);
        }
    }

    fn push_image(&mut self, img: ElementRef<'_>) {
        if self.strip_images {
            return;
        }
        let Some(src) = img
            .value()
            .attr("src")
            .and_then(|src| resolve_resource(src, self.base))
        else {
            return;
        };
        let alt = collapse_whitespace(img.value().attr("alt").unwrap_or(""));
        self.images.insert(src.clone());
        self.blocks.push(ContentBlock::Image { src, alt });
    }
}

/// Renders a table as text rows with cells joined by ` | `
fn table_text(table: ElementRef<'_>) -> String {
    let (Ok(rows), Ok(cells)) = (Selector::parse("tr"), Selector::parse("th, td")) else {
        return String::new();
    };

    table
        .select(&rows)
        .map(|row| {
            row.select(&cells)
                .map(element_text)
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .filter(|row| !row.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extracts in-scope links, preferring navigation menus
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` inside navigation containers; every `<a href>` on the
///   page when navigation yields no in-scope link
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and data URIs
/// - Fragment-only links
/// - Anything the scope predicate rejects
fn extract_links(document: &Html, base: &Url, in_scope: &dyn Fn(&Url) -> bool) -> Vec<String> {
    let nav_links = collect_links(document, base, NAV_LINK_SELECTORS, in_scope);
    if !nav_links.is_empty() {
        return nav_links;
    }
    collect_links(document, base, &["a[href]"], in_scope)
}

fn collect_links(
    document: &Html,
    base: &Url,
    selectors: &[&str],
    in_scope: &dyn Fn(&Url) -> bool,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for css in selectors {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        for element in document.select(&selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let Some(link) = resolve_link(href, base) else {
                continue;
            };
            if in_scope(&link) && seen.insert(link.to_string()) {
                links.push(link.to_string());
            }
        }
    }

    links
}
