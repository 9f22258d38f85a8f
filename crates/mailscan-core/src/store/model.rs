//! Store model types.

use chrono::{DateTime, Utc};
use mailscan_extract::{ContentKind, ExtractionResult};
use serde::{Deserialize, Serialize};

use crate::mail::MailMessage;

/// Base of web-mail deep links.
const WEBMAIL_LINK_PREFIX: &str = "https://mail.google.com/mail/u/0/#inbox/";

/// A normalized, indexed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailRecord {
    /// Identity: the Message-ID, or a synthesized id for messages without one.
    pub external_id: String,
    /// Formatted sender.
    pub sender: String,
    /// Decoded subject.
    pub subject: String,
    /// Display title; mirrors the subject.
    pub title: String,
    /// Web-mail deep link.
    pub link: String,
    /// Folder the message was scanned from.
    pub source_folder: String,
    /// Message date, if known.
    pub timestamp: Option<DateTime<Utc>>,
    /// Preview text.
    pub snippet: String,
    /// Whether the message has been read.
    pub is_read: bool,
    /// When this record was written.
    pub created_at: DateTime<Utc>,
}

impl MailRecord {
    /// Builds a record from a fetched message under the given identity.
    #[must_use]
    pub fn from_message(message: &MailMessage, external_id: String) -> Self {
        Self {
            link: webmail_link(&external_id),
            external_id,
            sender: message.from.clone(),
            subject: message.subject.clone(),
            title: message.subject.clone(),
            source_folder: message.folder.clone(),
            timestamp: message.date,
            snippet: message.snippet.clone(),
            is_read: message.is_read,
            created_at: Utc::now(),
        }
    }
}

/// Deep link to a message in the web-mail client.
#[must_use]
pub fn webmail_link(external_id: &str) -> String {
    format!("{WEBMAIL_LINK_PREFIX}{external_id}")
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Records on this page, newest first.
    pub records: Vec<MailRecord>,
    /// Matching records across all pages.
    pub total: u64,
    /// 1-based page number.
    pub page: u32,
    /// Records per page.
    pub page_size: u32,
    /// Number of pages.
    pub total_pages: u32,
}

/// Message store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStats {
    /// Number of stored records.
    pub total_count: u64,
}

/// An extracted article as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArticle {
    /// Caller-supplied article identity.
    pub id: String,
    /// Source URL.
    pub url: String,
    /// Host of the source URL.
    pub domain: String,
    /// Article title.
    pub title: String,
    /// Sanitized body.
    pub body_html: String,
    /// Body format.
    pub content_kind: ContentKind,
    /// When the article was stored.
    pub imported_at: DateTime<Utc>,
}

impl StoredArticle {
    /// Wraps an extraction result for storage.
    #[must_use]
    pub fn new(id: impl Into<String>, url: impl Into<String>, result: &ExtractionResult) -> Self {
        let url = url.into();
        let domain = url::Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        Self {
            id: id.into(),
            url,
            domain,
            title: result.title.clone(),
            body_html: result.body_html.clone(),
            content_kind: result.content_kind,
            imported_at: Utc::now(),
        }
    }

    /// Returns the extraction result portion.
    #[must_use]
    pub fn to_result(&self) -> ExtractionResult {
        ExtractionResult {
            title: self.title.clone(),
            body_html: self.body_html.clone(),
            content_kind: self.content_kind,
        }
    }
}

/// Article store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleStats {
    /// Number of stored articles.
    pub total_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_message() {
        let message = MailMessage {
            message_id: "<a@b>".to_string(),
            from: "A <a@b>".to_string(),
            subject: "Hello".to_string(),
            date: None,
            snippet: "Hello".to_string(),
            folder: "INBOX".to_string(),
            is_read: true,
        };
        let record = MailRecord::from_message(&message, "<a@b>".to_string());
        assert_eq!(record.title, "Hello");
        assert_eq!(record.link, "https://mail.google.com/mail/u/0/#inbox/<a@b>");
        assert_eq!(record.source_folder, "INBOX");
        assert!(record.is_read);
    }

    #[test]
    fn test_stored_article_domain() {
        let result = ExtractionResult {
            title: "T".to_string(),
            body_html: "<p>b</p>".to_string(),
            content_kind: ContentKind::Html,
        };
        let article = StoredArticle::new("42", "https://dev.to/x/y", &result);
        assert_eq!(article.domain, "dev.to");
        assert_eq!(article.to_result(), result);

        let odd = StoredArticle::new("43", "not a url", &result);
        assert_eq!(odd.domain, "");
    }
}
