//! # mailscan-extract
//!
//! Turns an arbitrary article URL into clean, readable HTML.
//!
//! ## Features
//!
//! - **Publisher table**: a closed set of known publishers, each carrying an
//!   ordered cascade of fetch strategies (mirrors, referrer tricks, web cache)
//! - **Content selection**: boilerplate removal followed by per-publisher
//!   structural queries and a semantic-block fallback
//! - **Title probing**: social-preview metadata, headings, then `<title>`
//! - **Sanitization**: idempotent stripping of scripts, hidden regions,
//!   tracking attributes and lazy-load markup
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailscan_extract::{Extractor, HttpFetcher, FetchConfig};
//!
//! let extractor = Extractor::new(HttpFetcher::new(&FetchConfig::default())?);
//! let article = extractor.extract("https://dev.to/someone/some-post").await?;
//! println!("{}: {} bytes", article.title, article.body_html.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod engine;
mod error;
pub mod fetch;
pub mod publisher;
pub mod sanitize;
pub mod select;
pub mod strategy;
pub mod title;

pub use engine::{ContentKind, ExtractionPlan, ExtractionResult, Extractor};
pub use error::{AttemptError, ExtractError, FetchError, Result};
pub use fetch::{FetchConfig, FetchedPage, HttpFetcher, PageFetcher};
pub use publisher::{ContentQuery, Publisher};
pub use sanitize::sanitize;
pub use strategy::{FetchStrategy, HeaderProfile, Target, TargetRewrite};
