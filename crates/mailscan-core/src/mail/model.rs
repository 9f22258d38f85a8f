//! Mail access model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default IMAP host.
pub const DEFAULT_HOST: &str = "imap.gmail.com";

/// Default implicit-TLS IMAP port.
pub const DEFAULT_PORT: u16 = 993;

/// Security/encryption mode for connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// No encryption (testing against local servers only).
    None,
    /// Implicit TLS (connect directly with TLS).
    #[default]
    Tls,
}

impl Security {
    /// Get display name for the security mode.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::None => "None (insecure)",
            Self::Tls => "SSL/TLS",
        }
    }
}

/// Credentials and server address for opening a mail session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Login name, usually the email address.
    pub username: String,
    /// Password or app password.
    pub password: String,
}

impl Credentials {
    /// Credentials for the default provider.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            security: Security::Tls,
            username: username.into(),
            password: password.into(),
        }
    }

    /// Overrides the server address.
    #[must_use]
    pub fn with_server(mut self, host: impl Into<String>, port: u16, security: Security) -> Self {
        self.host = host.into();
        self.port = port;
        self.security = security;
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Envelope-level view of one message, as returned by a mail session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    /// RFC 5322 Message-ID, empty when the message has none.
    pub message_id: String,
    /// Formatted sender: `Name <mailbox@host>` or `mailbox@host`.
    pub from: String,
    /// Decoded subject.
    pub subject: String,
    /// Date header, if present and parseable.
    pub date: Option<DateTime<Utc>>,
    /// Short preview text.
    pub snippet: String,
    /// Folder the message was fetched from.
    pub folder: String,
    /// Whether the message carries the `\Seen` flag.
    pub is_read: bool,
}
