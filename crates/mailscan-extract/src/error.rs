//! Error types for article extraction.

use thiserror::Error;

/// Transport-level failure of the fetch capability.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    /// The request failed before a response arrived (DNS, TLS, timeout, redirects).
    #[error("Request failed: {0}")]
    Transport(String),

    /// The response body could not be read.
    #[error("Failed to read body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            Self::Client(e.to_string())
        } else if e.is_body() || e.is_decode() {
            Self::Body(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Why a single fetch strategy did not produce an acceptable article.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The strategy's URL rewrite does not apply to this URL.
    #[error("strategy does not apply to this URL")]
    NotApplicable,

    /// The fetch capability failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The server answered with something other than 200.
    #[error("unexpected HTTP status {0}")]
    BadStatus(u16),

    /// The body still carries a content encoding the client did not undo.
    #[error("undecoded body with content-encoding {0}")]
    UndecodedBody(String),

    /// No content query or block assembly matched the document.
    #[error("no extractable content in document")]
    NoContent,

    /// Content was found but is shorter than the strategy accepts.
    #[error("content too short: {len} < {min}")]
    TooShort {
        /// Sanitized body length in characters.
        len: usize,
        /// Strategy threshold in characters.
        min: usize,
    },
}

/// Definitive outcome of a failed extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The URL could not be parsed or is not http(s).
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl {
        /// URL as supplied by the caller.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// Every strategy in the cascade failed.
    #[error("No extractable content at {url} after {} attempts", attempts.len())]
    NotExtractable {
        /// URL as supplied by the caller.
        url: String,
        /// One entry per strategy, in cascade order: `(label, failure)`.
        attempts: Vec<(&'static str, AttemptError)>,
    },
}

/// Result type alias for extraction.
pub type Result<T> = std::result::Result<T, ExtractError>;
