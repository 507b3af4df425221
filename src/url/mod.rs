//! URL handling module for Docs-Harvester
//!
//! This module provides URL normalization, crawl target parsing, and the
//! origin-scope checks that keep a crawl on its documentation source.

mod normalize;
mod scope;
mod target;

pub use normalize::normalize_url;
pub use scope::{RepoScope, SiteScope};
pub use target::{parse_target, RepoRef, Target};

use url::Url;

/// Resolves an href found on `base` into a normalized absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links (same page anchors)
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let absolute = base.join(href).ok()?;
    normalize_url(absolute.as_str()).ok()
}

/// Resolves a resource reference (image source) to an absolute URL
///
/// Unlike [`resolve_link`] the URL is not normalized, so query strings and
/// trailing slashes that a CDN may depend on are preserved.
pub fn resolve_resource(src: &str, base: &Url) -> Option<String> {
    let src = src.trim();
    if src.is_empty() || src.to_ascii_lowercase().starts_with("data:") {
        return None;
    }

    let absolute = base.join(src).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}
