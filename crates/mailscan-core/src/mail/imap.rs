//! IMAP implementation of the mail access capability.

use async_imap::imap_proto::types::Envelope;
use async_imap::types::{Fetch, Flag};
use async_trait::async_trait;
use futures::TryStreamExt;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info};

use super::header::{decode_header, format_sender, parse_date, truncate_text};
use super::model::{Credentials, MailMessage, Security};
use super::session::{MailConnector, MailError, MailSession, sequence_range};
use super::stream::{ImapStream, connect_plain, connect_tls};

/// Fetch items requested per message.
const FETCH_ITEMS: &str = "(UID FLAGS ENVELOPE)";

/// Maximum snippet length in characters.
const SNIPPET_LEN: usize = 200;

type Session = async_imap::Session<Compat<ImapStream>>;

fn operation(e: impl std::fmt::Display) -> MailError {
    MailError::Operation(e.to_string())
}

/// Opens IMAP sessions over TLS or plain TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImapConnector;

impl ImapConnector {
    /// Creates a connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MailConnector for ImapConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn MailSession>, MailError> {
        debug!(
            host = %credentials.host,
            port = credentials.port,
            security = credentials.security.display_name(),
            "Connecting to IMAP server"
        );
        let stream = match credentials.security {
            Security::Tls => connect_tls(&credentials.host, credentials.port).await,
            Security::None => connect_plain(&credentials.host, credentials.port).await,
        }
        .map_err(|e| MailError::Connection(e.to_string()))?;

        let client = async_imap::Client::new(stream.compat());
        let session = client
            .login(&credentials.username, &credentials.password)
            .await
            .map_err(|(e, _)| MailError::Authentication(e.to_string()))?;

        info!(user = %credentials.username, host = %credentials.host, "Logged in");
        Ok(Box::new(ImapSession { session }))
    }
}

/// An authenticated async-imap session.
struct ImapSession {
    session: Session,
}

#[async_trait]
impl MailSession for ImapSession {
    async fn list_folders(&mut self) -> Result<Vec<String>, MailError> {
        let names: Vec<_> = self
            .session
            .list(Some(""), Some("*"))
            .await
            .map_err(operation)?
            .try_collect()
            .await
            .map_err(operation)?;

        Ok(names.iter().map(|n| n.name().to_string()).collect())
    }

    async fn fetch_messages(&mut self, folder: &str, limit: u32) -> Result<Vec<MailMessage>, MailError> {
        let mailbox = self.session.select(folder).await.map_err(operation)?;
        let Some(range) = sequence_range(mailbox.exists, limit) else {
            debug!(folder, "Folder is empty");
            return Ok(Vec::new());
        };

        debug!(folder, %range, "Fetching envelopes");
        let fetches: Vec<Fetch> = self
            .session
            .fetch(&range, FETCH_ITEMS)
            .await
            .map_err(operation)?
            .try_collect()
            .await
            .map_err(operation)?;

        let messages = envelope_messages(
            fetches
                .iter()
                .map(|f| (f.envelope(), f.flags().any(|flag| matches!(flag, Flag::Seen)))),
            folder,
        );
        let skipped = fetches.len() - messages.len();
        if skipped > 0 {
            debug!(folder, skipped, "Skipped messages without an envelope");
        }
        Ok(messages)
    }

    async fn logout(&mut self) -> Result<(), MailError> {
        self.session.logout().await.map_err(operation)
    }
}

/// Converts fetched `(envelope, seen)` pairs, dropping entries the server
/// returned without an envelope.
fn envelope_messages<'a, 'b: 'a>(
    fetched: impl IntoIterator<Item = (Option<&'a Envelope<'b>>, bool)>,
    folder: &str,
) -> Vec<MailMessage> {
    fetched
        .into_iter()
        .filter_map(|(envelope, is_read)| Some(to_message(envelope?, is_read, folder)))
        .collect()
}

fn to_message(envelope: &Envelope<'_>, is_read: bool, folder: &str) -> MailMessage {
    let message_id = envelope
        .message_id
        .as_deref()
        .map(|id| String::from_utf8_lossy(id).trim().to_string())
        .unwrap_or_default();
    let subject = envelope
        .subject
        .as_deref()
        .map(decode_header)
        .unwrap_or_default();
    let from = envelope
        .from
        .as_ref()
        .and_then(|addrs| addrs.first())
        .map(|a| format_sender(a.name.as_deref(), a.mailbox.as_deref(), a.host.as_deref()))
        .unwrap_or_default();
    let date = envelope.date.as_deref().and_then(parse_date);

    MailMessage {
        message_id,
        from,
        snippet: truncate_text(&subject, SNIPPET_LEN),
        subject,
        date,
        folder: folder.to_string(),
        is_read,
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use async_imap::imap_proto::types::Address;

    use super::*;

    fn envelope(message_id: &'static [u8], subject: &'static [u8]) -> Envelope<'static> {
        Envelope {
            date: Some(Cow::Borrowed(&b"Tue, 2 Jan 2024 10:00:00 +0000"[..])),
            subject: Some(Cow::Borrowed(subject)),
            from: Some(vec![Address {
                name: Some(Cow::Borrowed(&b"Ann"[..])),
                adl: None,
                mailbox: Some(Cow::Borrowed(&b"ann"[..])),
                host: Some(Cow::Borrowed(&b"example.com"[..])),
            }]),
            sender: None,
            reply_to: None,
            to: None,
            cc: None,
            bcc: None,
            in_reply_to: None,
            message_id: Some(Cow::Borrowed(message_id)),
        }
    }

    #[test]
    fn test_messages_without_envelope_are_skipped() {
        let first = envelope(b" <m1@example.com> ", b"Hello");
        let second = envelope(b"<m2@example.com>", b"Again");
        let messages = envelope_messages(
            [(Some(&first), true), (None, false), (Some(&second), false), (None, true)],
            "INBOX",
        );

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message_id, "<m1@example.com>");
        assert_eq!(messages[0].subject, "Hello");
        assert!(messages[0].is_read);
        assert!(messages[0].date.is_some());
        assert!(messages[0].from.contains("ann@example.com"));
        assert_eq!(messages[1].message_id, "<m2@example.com>");
        assert!(!messages[1].is_read);
        assert_eq!(messages[1].folder, "INBOX");
    }

    #[test]
    fn test_only_envelopeless_fetches_yield_nothing() {
        assert!(envelope_messages([(None, true), (None, false)], "Sent").is_empty());
    }
}
