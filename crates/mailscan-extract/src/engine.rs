//! The strategy cascade runner.

use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{AttemptError, ExtractError, Result};
use crate::fetch::PageFetcher;
use crate::publisher::Publisher;
use crate::sanitize::sanitize;
use crate::select::{extract_content, strip_boilerplate};
use crate::strategy::FetchStrategy;
use crate::title::extract_title;

/// Format of an extracted body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Sanitized HTML.
    Html,
    /// Plain text.
    Text,
}

impl ContentKind {
    /// Returns the stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Text => "text",
        }
    }
}

/// A successfully extracted article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Article title, empty if none was found.
    pub title: String,
    /// Sanitized article body.
    pub body_html: String,
    /// Body format.
    pub content_kind: ContentKind,
}

/// The content rules and fetch cascade applied to one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionPlan {
    /// Publisher whose content queries and title selectors apply, whichever
    /// host a strategy ends up fetching from.
    pub publisher: Publisher,
    /// Strategies in priority order.
    pub strategies: Vec<FetchStrategy>,
}

impl ExtractionPlan {
    /// The built-in plan for a publisher.
    #[must_use]
    pub fn for_publisher(publisher: Publisher) -> Self {
        Self {
            publisher,
            strategies: publisher.strategies().to_vec(),
        }
    }
}

/// Runs extraction cascades against a [`PageFetcher`].
///
/// Holds no mutable state; one extractor can serve concurrent calls.
#[derive(Debug, Clone)]
pub struct Extractor<F> {
    fetcher: F,
}

impl<F: PageFetcher> Extractor<F> {
    /// Creates an extractor over the given fetcher.
    pub const fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Returns the underlying fetcher.
    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Extracts the article at `url` using its publisher's built-in plan.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidUrl`] for malformed or non-http(s) URLs
    /// and [`ExtractError::NotExtractable`] when every strategy fails.
    pub async fn extract(&self, url: &str) -> Result<ExtractionResult> {
        let parsed = parse_url(url)?;
        let publisher = Publisher::detect(parsed.host_str().unwrap_or_default());
        info!(url, %publisher, "Extracting article");
        self.run_plan(&parsed, &ExtractionPlan::for_publisher(publisher))
            .await
    }

    /// Runs an explicit plan. The first strategy whose sanitized body clears
    /// its threshold wins; later strategies are never tried.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::NotExtractable`] when every strategy fails.
    pub async fn run_plan(&self, url: &Url, plan: &ExtractionPlan) -> Result<ExtractionResult> {
        let mut attempts = Vec::with_capacity(plan.strategies.len());

        for strategy in &plan.strategies {
            match self.attempt(url, plan.publisher, strategy).await {
                Ok(result) => {
                    info!(
                        url = %url,
                        strategy = strategy.label,
                        len = result.body_html.len(),
                        "Extracted article"
                    );
                    return Ok(result);
                }
                Err(e) => {
                    warn!(url = %url, strategy = strategy.label, error = %e, "Strategy failed");
                    attempts.push((strategy.label, e));
                }
            }
        }

        Err(ExtractError::NotExtractable {
            url: url.to_string(),
            attempts,
        })
    }

    async fn attempt(
        &self,
        url: &Url,
        publisher: Publisher,
        strategy: &FetchStrategy,
    ) -> std::result::Result<ExtractionResult, AttemptError> {
        let target = strategy
            .target
            .resolve(url)
            .ok_or(AttemptError::NotApplicable)?;
        debug!(target = %target.url, strategy = strategy.label, "Fetching");

        let page = self
            .fetcher
            .get(&target.url, &strategy.headers.headers())
            .await?;
        if page.status != 200 {
            return Err(AttemptError::BadStatus(page.status));
        }
        if let Some(encoding) = page.undecoded_encoding() {
            return Err(AttemptError::UndecodedBody(encoding.to_string()));
        }

        let body = page.text();
        let (title, content) = process_document(&body, publisher);
        let body_html = content.ok_or(AttemptError::NoContent)?;

        let len = body_html.chars().count();
        if !strategy.accepts(len) {
            return Err(AttemptError::TooShort {
                len,
                min: strategy.min_len,
            });
        }

        Ok(ExtractionResult {
            title: target.title.unwrap_or(title),
            body_html,
            content_kind: ContentKind::Html,
        })
    }
}

/// Parses, titles, strips and selects in one synchronous step, so the
/// non-`Send` document never lives across an await.
fn process_document(body: &str, publisher: Publisher) -> (String, Option<String>) {
    let mut html = Html::parse_document(body);
    let title = extract_title(&html, publisher);
    strip_boilerplate(&mut html);
    let content = extract_content(&html, publisher)
        .map(|fragment| sanitize(&fragment))
        .filter(|cleaned| !cleaned.is_empty());
    (title, content)
}

fn parse_url(url: &str) -> Result<Url> {
    let invalid = |reason: String| ExtractError::InvalidUrl {
        url: url.to_string(),
        reason,
    };
    let parsed = Url::parse(url.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(parsed)
}
