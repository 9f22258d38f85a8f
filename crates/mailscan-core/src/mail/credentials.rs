//! Secure credential storage using system keyring.
//!
//! IMAP passwords are stored in the platform's native credential store,
//! keyed by login name:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use keyring::Entry;
use tracing::{debug, warn};

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "mailscan";

/// Credential type identifier for IMAP passwords.
const IMAP_CREDENTIAL: &str = "imap";

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Failed to access keyring.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// A login name is required to key the entry.
    #[error("Username is required for credential storage")]
    MissingUsername,
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

/// Generates the keyring entry key for a login.
fn credential_key(username: &str) -> CredentialResult<String> {
    let username = username.trim();
    if username.is_empty() {
        return Err(CredentialError::MissingUsername);
    }
    Ok(format!("{SERVICE_NAME}_{IMAP_CREDENTIAL}_{}", username.to_lowercase()))
}

fn entry(username: &str) -> CredentialResult<Entry> {
    let key = credential_key(username)?;
    Ok(Entry::new(SERVICE_NAME, &key)?)
}

/// Stores an IMAP password securely in the system keyring.
///
/// # Errors
///
/// Returns an error if the username is empty or the keyring operation fails.
pub fn store_password(username: &str, password: &str) -> CredentialResult<()> {
    entry(username)?.set_password(password)?;
    debug!("Stored IMAP password for {username}");
    Ok(())
}

/// Retrieves an IMAP password from the system keyring.
///
/// # Errors
///
/// Returns an error if the username is empty or the keyring operation fails.
pub fn get_password(username: &str) -> CredentialResult<Option<String>> {
    match entry(username)?.get_password() {
        Ok(password) => Ok(Some(password)),
        Err(keyring::Error::NoEntry) => {
            debug!("No IMAP password found for {username}");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Deletes an IMAP password from the keyring. Missing entries are not an error.
///
/// # Errors
///
/// Returns an error if the keyring operation fails (except for missing entries).
pub fn delete_password(username: &str) -> CredentialResult<()> {
    match entry(username)?.delete_credential() {
        Ok(()) => debug!("Deleted IMAP password for {username}"),
        Err(keyring::Error::NoEntry) => {
            debug!("No IMAP password to delete for {username}");
        }
        Err(e) => {
            warn!("Failed to delete IMAP password: {e}");
            return Err(e.into());
        }
    }
    Ok(())
}
