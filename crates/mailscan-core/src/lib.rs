//! # mailscan-core
//!
//! Core ingestion pipeline for mailscan.
//!
//! This crate provides:
//! - **Mail access** - a session capability over IMAP (async-imap, rustls)
//! - **Scan orchestration** - cancellable, progress-reporting mailbox scans
//!   running as detached tasks
//! - **Message store** - searchable, paginated message index (`SQLite`)
//! - **Article store** - extracted article bodies keyed by article id
//! - **Credentials** - IMAP passwords in the system keyring

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod mail;
pub mod scan;
pub mod store;

pub use error::{Error, Result};
pub use mail::credentials;
pub use mail::{
    CredentialError, Credentials, ImapConnector, MailConnector, MailError, MailMessage,
    MailSession, Security,
};
pub use scan::{
    CancelOutcome, CancellationSignal, ScanAccepted, ScanError, ScanMonitor, ScanOrchestrator,
    ScanPhase, ScanProgress, ScanRequest, ScanStatus,
};
pub use store::{
    ArticleRepository, ArticleStats, ArticleStore, MailRecord, MessageRepository, MessageStats,
    MessageStore, SearchPage, StoredArticle,
};
