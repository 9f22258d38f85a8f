//! Known publishers and their extraction rules.
//!
//! Publisher detection is a closed lookup table: a host maps to exactly one
//! [`Publisher`], and each variant carries its fetch cascade, content queries
//! and title selectors as data.

use serde::{Deserialize, Serialize};

use crate::strategy::{FetchStrategy, HeaderProfile, TargetRewrite};

/// Article sites with dedicated extraction rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Publisher {
    /// Medium and publications hosted on it.
    Medium,
    /// DEV Community.
    DevTo,
    /// GitHub repositories.
    GitHub,
    /// Substack newsletters.
    Substack,
    /// Anything else.
    Generic,
}

/// Host patterns, matched in order. A pattern matches the host itself and
/// any subdomain of it.
const HOST_TABLE: &[(&str, Publisher)] = &[
    ("medium.com", Publisher::Medium),
    ("towardsdatascience.com", Publisher::Medium),
    ("levelup.gitconnected.com", Publisher::Medium),
    ("betterprogramming.pub", Publisher::Medium),
    ("dev.to", Publisher::DevTo),
    ("github.com", Publisher::GitHub),
    ("substack.com", Publisher::Substack),
];

const MEDIUM_STRATEGIES: &[FetchStrategy] = &[
    FetchStrategy::new(
        "freedium",
        TargetRewrite::MirrorHost("freedium.cfd"),
        HeaderProfile::MirrorProxy,
        500,
    ),
    FetchStrategy::new(
        "scribe",
        TargetRewrite::MirrorHost("scribe.rip"),
        HeaderProfile::MirrorProxy,
        500,
    ),
    FetchStrategy::new(
        "direct-referrer",
        TargetRewrite::Original,
        HeaderProfile::SearchReferrer,
        200,
    ),
    FetchStrategy::new(
        "web-cache",
        TargetRewrite::WebCache,
        HeaderProfile::CacheMinimal,
        500,
    ),
];

const DEVTO_STRATEGIES: &[FetchStrategy] = &[FetchStrategy::new(
    "direct",
    TargetRewrite::Original,
    HeaderProfile::Browser,
    0,
)];

const GITHUB_STRATEGIES: &[FetchStrategy] = &[
    FetchStrategy::new(
        "readme-api",
        TargetRewrite::GitHubReadmeApi,
        HeaderProfile::GitHubApi,
        0,
    ),
    FetchStrategy::new("direct", TargetRewrite::Original, HeaderProfile::Browser, 0),
];

const SUBSTACK_STRATEGIES: &[FetchStrategy] = &[FetchStrategy::new(
    "direct",
    TargetRewrite::Original,
    HeaderProfile::SubstackReferrer,
    0,
)];

const GENERIC_STRATEGIES: &[FetchStrategy] = &[FetchStrategy::new(
    "direct",
    TargetRewrite::Original,
    HeaderProfile::Browser,
    0,
)];

/// A structural selector and the length its first match must exceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentQuery {
    /// CSS selector; only the first matching element is considered.
    pub selector: &'static str,
    /// The match's inner HTML must be longer than this many characters.
    pub min_len: usize,
}

const fn query(selector: &'static str, min_len: usize) -> ContentQuery {
    ContentQuery { selector, min_len }
}

/// Gate for the domain-agnostic query list.
const GENERIC_GATE: usize = 500;

/// Gate for Medium containers, which often wrap only a teaser.
const MEDIUM_GATE: usize = 200;

const MEDIUM_QUERIES: &[ContentQuery] = &[
    query(".main-content article", MEDIUM_GATE),
    query(".main-content", MEDIUM_GATE),
    query("article section", MEDIUM_GATE),
    query("article", MEDIUM_GATE),
];

const DEVTO_QUERIES: &[ContentQuery] = &[
    query("#article-body", 0),
    query(".crayons-article__body", 0),
    query(".crayons-article__main", 0),
    query("article", 0),
];

const GITHUB_QUERIES: &[ContentQuery] = &[
    query(".markdown-body", 0),
    query("#readme .Box-body", 0),
    query("[data-target='readme-toc.content']", 0),
    query(".comment-body", 0),
];

const SUBSTACK_QUERIES: &[ContentQuery] = &[
    query(".body.markup", 0),
    query(".post-content", 0),
    query(".available-content", 0),
    query("article", 0),
];

const GENERIC_QUERIES: &[ContentQuery] = &[
    query("article", GENERIC_GATE),
    query("[role='main']", GENERIC_GATE),
    query("main", GENERIC_GATE),
    query(".post-content", GENERIC_GATE),
    query(".article-content", GENERIC_GATE),
    query(".entry-content", GENERIC_GATE),
    query(".post-body", GENERIC_GATE),
    query(".article-body", GENERIC_GATE),
    query(".story-body", GENERIC_GATE),
    query(".content-body", GENERIC_GATE),
    query("#content", GENERIC_GATE),
    query("#main-content", GENERIC_GATE),
    query(".main-content", GENERIC_GATE),
    query(".content", GENERIC_GATE),
];

impl Publisher {
    /// Detects the publisher for a host name.
    #[must_use]
    pub fn detect(host: &str) -> Self {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        HOST_TABLE
            .iter()
            .find(|(pattern, _)| {
                host == *pattern
                    || host
                        .strip_suffix(pattern)
                        .is_some_and(|prefix| prefix.ends_with('.'))
            })
            .map_or(Self::Generic, |(_, publisher)| *publisher)
    }

    /// Returns the stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Medium => "medium",
            Self::DevTo => "devto",
            Self::GitHub => "github",
            Self::Substack => "substack",
            Self::Generic => "generic",
        }
    }

    /// Ordered fetch cascade.
    #[must_use]
    pub const fn strategies(self) -> &'static [FetchStrategy] {
        match self {
            Self::Medium => MEDIUM_STRATEGIES,
            Self::DevTo => DEVTO_STRATEGIES,
            Self::GitHub => GITHUB_STRATEGIES,
            Self::Substack => SUBSTACK_STRATEGIES,
            Self::Generic => GENERIC_STRATEGIES,
        }
    }

    /// Ordered structural content queries.
    #[must_use]
    pub const fn content_queries(self) -> &'static [ContentQuery] {
        match self {
            Self::Medium => MEDIUM_QUERIES,
            Self::DevTo => DEVTO_QUERIES,
            Self::GitHub => GITHUB_QUERIES,
            Self::Substack => SUBSTACK_QUERIES,
            Self::Generic => GENERIC_QUERIES,
        }
    }

    /// Whether articles are marked up as contiguous semantic blocks, making
    /// block assembly a useful last resort.
    #[must_use]
    pub const fn assembles_blocks(self) -> bool {
        matches!(self, Self::Medium)
    }

    /// Publisher-specific heading selectors, probed after social metadata.
    #[must_use]
    pub const fn title_selectors(self) -> &'static [&'static str] {
        match self {
            Self::Medium => &["h1[data-testid='storyTitle']"],
            Self::DevTo => &[".crayons-article__header h1"],
            Self::Substack => &[".post-title"],
            Self::GitHub | Self::Generic => &[],
        }
    }
}

impl std::fmt::Display for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
