//! The mail access capability.

use async_trait::async_trait;

use super::model::{Credentials, MailMessage};

/// Error type for mail access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailError {
    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Operation failed.
    #[error("Operation failed: {0}")]
    Operation(String),
}

/// Opens authenticated mail sessions.
#[async_trait]
pub trait MailConnector: Send + Sync {
    /// Connects and logs in.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Connection`] or [`MailError::Authentication`].
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn MailSession>, MailError>;
}

/// An open, authenticated mailbox session.
#[async_trait]
pub trait MailSession: Send {
    /// Lists every folder name on the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the request or the connection drops.
    async fn list_folders(&mut self) -> Result<Vec<String>, MailError>;

    /// Fetches message envelopes in `folder`.
    ///
    /// A `limit` of zero fetches every message; otherwise only the last
    /// `limit` messages by sequence number.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder cannot be selected or fetched.
    async fn fetch_messages(&mut self, folder: &str, limit: u32) -> Result<Vec<MailMessage>, MailError>;

    /// Ends the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not acknowledge the logout.
    async fn logout(&mut self) -> Result<(), MailError>;
}

/// Sequence range covering the last `limit` of `exists` messages, or all of
/// them when `limit` is zero. `None` for an empty folder.
#[must_use]
pub fn sequence_range(exists: u32, limit: u32) -> Option<String> {
    if exists == 0 {
        return None;
    }
    let from = if limit > 0 && exists > limit {
        exists - limit + 1
    } else {
        1
    };
    Some(format!("{from}:{exists}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_range() {
        assert_eq!(sequence_range(0, 0), None);
        assert_eq!(sequence_range(0, 10), None);
        assert_eq!(sequence_range(42, 0).as_deref(), Some("1:42"));
        assert_eq!(sequence_range(42, 10).as_deref(), Some("33:42"));
        assert_eq!(sequence_range(5, 10).as_deref(), Some("1:5"));
        assert_eq!(sequence_range(10, 10).as_deref(), Some("1:10"));
    }
}
