//! Article title probing.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use crate::publisher::Publisher;
use crate::select::parse_selector;

/// Social preview metadata, probed first.
const META_PROBES: &[&str] = &["meta[property='og:title']", "meta[name='twitter:title']"];

/// Generic headings, probed after publisher-specific ones.
const HEADING_PROBES: &[&str] = &["article h1", "h1"];

/// Trailing " - Medium", " | Dev.to" and similar site suffixes.
static SITE_SUFFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\s*[-|–]\s*(Medium|Dev\.to|GitHub|Substack).*$").ok());

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse(&element.text().collect::<String>())
}

fn first_text(html: &Html, css: &str) -> Option<String> {
    let selector = parse_selector(css)?;
    html.select(&selector)
        .map(element_text)
        .find(|text| !text.is_empty())
}

fn first_meta(html: &Html, css: &str) -> Option<String> {
    let selector = parse_selector(css)?;
    html.select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse)
        .find(|text| !text.is_empty())
}

fn document_title(html: &Html) -> Option<String> {
    let title = first_text(html, "title")?;
    let stripped = match SITE_SUFFIX.as_ref() {
        Some(re) => re.replace(&title, "").trim().to_string(),
        None => title,
    };
    Some(stripped).filter(|t| !t.is_empty())
}

/// Finds the article title, or an empty string if the document has none.
///
/// Runs against the unstripped document, since headers and metadata are
/// removed as boilerplate.
#[must_use]
pub fn extract_title(html: &Html, publisher: Publisher) -> String {
    META_PROBES
        .iter()
        .find_map(|css| first_meta(html, css))
        .or_else(|| {
            publisher
                .title_selectors()
                .iter()
                .chain(HEADING_PROBES)
                .find_map(|css| first_text(html, css))
        })
        .or_else(|| document_title(html))
        .unwrap_or_default()
}
