//! Mail access: the session capability the scanner consumes and its IMAP
//! implementation.

pub mod credentials;
pub mod header;
mod imap;
mod model;
mod session;
mod stream;

pub use credentials::{CredentialError, CredentialResult};
pub use imap::ImapConnector;
pub use model::{Credentials, MailMessage, Security};
pub use session::{MailConnector, MailError, MailSession};
