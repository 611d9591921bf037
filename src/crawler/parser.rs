//! HTML parsing for fetched documents
//!
//! This module turns an HTML body into a [`FetchedDocument`]:
//! - Page title (from `<title>`)
//! - Visible text, whitespace-collapsed, without script/style content
//! - Outlinks with their anchor text (from `<a href>` and canonical links)

use crate::processor::{FetchedDocument, Outlink};
use crate::url::resolve_link;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Elements whose text is never part of the document text
const SKIPPED_TEXT: &[&str] = &["script", "style", "noscript", "template", "title"];

/// Parses HTML content into title, text and outlinks
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document, anchor text attached
/// - `<link rel="canonical" href="...">`, without anchor text
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - Fragment-only links
///
/// Links are resolved against `base_url` and normalized. A URL that appears
/// more than once is kept once, with the first non-empty anchor seen.
///
/// # Example
///
/// ```
/// use ripple_frontier::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let doc = parse_html(html, &base_url);
/// assert_eq!(doc.title, Some("Test".to_string()));
/// assert_eq!(doc.outlinks[0].url, "https://example.com/page");
/// assert_eq!(doc.outlinks[0].anchor, "Link");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> FetchedDocument {
    let document = Html::parse_document(html);

    FetchedDocument {
        title: extract_title(&document),
        text: extract_text(&document),
        outlinks: extract_outlinks(&document, base_url),
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(element.text()))
        .filter(|s| !s.is_empty())
}

fn extract_text(document: &Html) -> String {
    let mut words: Vec<&str> = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |e| SKIPPED_TEXT.contains(&e.name()))
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

fn extract_outlinks(document: &Html, base_url: &Url) -> Vec<Outlink> {
    let mut outlinks: Vec<Outlink> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    let mut push = |href: &str, anchor: String| {
        if is_excluded_scheme(href) {
            return;
        }
        let Some(url) = resolve_link(base_url, href) else {
            return;
        };
        let url = url.to_string();
        if seen.insert(url.clone()) {
            outlinks.push(Outlink::new(url, anchor));
        } else if !anchor.is_empty() {
            if let Some(existing) = outlinks
                .iter_mut()
                .find(|o| o.url == url && o.anchor.is_empty())
            {
                existing.anchor = anchor;
            }
        }
    };

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            // Skip if it has the download attribute
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href, anchor_text(&element));
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href, String::new());
            }
        }
    }

    outlinks
}

fn anchor_text(element: &ElementRef<'_>) -> String {
    let text = collapse_whitespace(element.text());
    if !text.is_empty() {
        return text;
    }
    // Image links carry their description in alt text
    Selector::parse("img[alt]")
        .ok()
        .and_then(|img| element.select(&img).next())
        .and_then(|img| img.value().attr("alt"))
        .map(|alt| alt.trim().to_string())
        .unwrap_or_default()
}

fn is_excluded_scheme(href: &str) -> bool {
    let href = href.trim_start().to_ascii_lowercase();
    ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| href.starts_with(scheme))
}

fn collapse_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
