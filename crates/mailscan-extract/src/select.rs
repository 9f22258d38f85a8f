//! Content region selection.

use std::collections::HashSet;

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::publisher::Publisher;

/// Regions that never contain article text. Removed before any query runs.
const BOILERPLATE: &[&str] = &[
    // Structural
    "script",
    "style",
    "noscript",
    "iframe",
    "nav",
    "header",
    "footer",
    "aside",
    // Widgets and ads
    ".sidebar",
    ".comments",
    ".social-share",
    ".advertisement",
    ".ad",
    ".ads",
    ".adsbygoogle",
    ".cookie-banner",
    ".newsletter-signup",
    ".newsletter-cta",
    ".related-posts",
    ".author-bio",
    ".author-card",
    ".share-buttons",
    ".social-buttons",
    ".popup",
    ".modal",
    ".overlay",
    // Landmark roles
    "[role='banner']",
    "[role='navigation']",
    "[role='complementary']",
    // Publisher chrome
    ".metabar",
    ".reactions",
    ".reaction-button",
    ".crayons-article__aside",
    ".pw-multi-vote-icon",
    ".pw-post-body-paragraph-highlight",
    ".js-postMetaLockup",
    ".js-stickyFooter",
    "#lite-post-promo",
    ".js-postActionsBar",
];

/// Elements collected by block assembly, all scoped to an article container.
const BLOCK_SELECTOR: &str = "article p, article h1, article h2, article h3, article pre, \
                              article code, article ul, article ol, article blockquote, article figure";

/// Fewest blocks that count as an article.
pub const MIN_BLOCKS: usize = 4;

/// Parses a CSS selector, logging and skipping selectors the parser rejects.
pub(crate) fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!(css, error = %e, "Invalid selector");
            None
        }
    }
}

/// Detaches every block-listed region from the document.
pub fn strip_boilerplate(html: &mut Html) {
    let ids: Vec<_> = BOILERPLATE
        .iter()
        .filter_map(|css| parse_selector(css))
        .flat_map(|selector| html.select(&selector).map(|el| el.id()).collect::<Vec<_>>())
        .collect();

    debug!(removed = ids.len(), "Stripped boilerplate regions");
    for id in ids {
        if let Some(mut node) = html.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Runs the publisher's structural queries and returns the inner HTML of the
/// first match that clears its gate.
#[must_use]
pub fn select_content(html: &Html, publisher: Publisher) -> Option<String> {
    for query in publisher.content_queries() {
        let Some(selector) = parse_selector(query.selector) else {
            continue;
        };
        let Some(element) = html.select(&selector).next() else {
            continue;
        };
        let inner = element.inner_html();
        let len = inner.trim().chars().count();
        if len > 0 && len > query.min_len {
            debug!(selector = query.selector, len, "Content query matched");
            return Some(inner);
        }
    }
    None
}

/// Concatenates the article's semantic blocks in document order.
///
/// Blocks nested inside an already collected block are skipped, so a `code`
/// inside a `pre` is emitted once. Returns `None` with fewer than
/// [`MIN_BLOCKS`] non-blank blocks.
#[must_use]
pub fn assemble_blocks(html: &Html) -> Option<String> {
    let selector = parse_selector(BLOCK_SELECTOR)?;
    let mut taken: HashSet<NodeId> = HashSet::new();
    let mut blocks = Vec::new();

    for element in html.select(&selector) {
        if element.ancestors().any(|a| taken.contains(&a.id())) {
            continue;
        }
        let inner = element.inner_html();
        if inner.trim().is_empty() {
            continue;
        }
        taken.insert(element.id());
        blocks.push(wrap(element, &inner));
    }

    if blocks.len() < MIN_BLOCKS {
        debug!(blocks = blocks.len(), "Too few semantic blocks");
        return None;
    }
    Some(blocks.join("\n"))
}

fn wrap(element: ElementRef<'_>, inner: &str) -> String {
    let tag = element.value().name();
    format!("<{tag}>{inner}</{tag}>")
}

/// Selects article content: structural queries first, then block assembly
/// for publishers that mark articles up as semantic blocks.
#[must_use]
pub fn extract_content(html: &Html, publisher: Publisher) -> Option<String> {
    select_content(html, publisher).or_else(|| {
        if publisher.assembles_blocks() {
            assemble_blocks(html)
        } else {
            None
        }
    })
}
