//! Detached scan task.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::cancel::CancellationSignal;
use super::state::{ScanMonitor, ScanOutcome, ScanPhase, folder_percent};
use crate::mail::{Credentials, MailConnector, MailError, MailMessage, MailSession};
use crate::store::{MailRecord, MessageStore};

/// Folder scanned when a request names none.
pub const DEFAULT_FOLDER: &str = "INBOX";

/// Messages processed between cancellation checkpoints.
const CANCEL_CHECK_INTERVAL: usize = 10;

/// Why a scan could not be started.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// Another scan holds the running flag.
    #[error("a scan is already in progress")]
    AlreadyRunning,
    /// Called outside a Tokio runtime.
    #[error("no async runtime is available to run the scan")]
    NoRuntime,
}

/// Parameters for one scan.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Folders to walk, in order.
    pub folders: Vec<String>,
    /// Account to scan.
    pub credentials: Credentials,
}

impl ScanRequest {
    /// Scan of the default folder.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            folders: Vec::new(),
            credentials,
        }
    }

    /// Replaces the folder list.
    #[must_use]
    pub fn with_folders(mut self, folders: Vec<String>) -> Self {
        self.folders = folders;
        self
    }

    fn normalized_folders(&self) -> Vec<String> {
        let folders: Vec<String> = self
            .folders
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();
        if folders.is_empty() {
            vec![DEFAULT_FOLDER.to_string()]
        } else {
            folders
        }
    }
}

/// Acknowledgement returned when a scan starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanAccepted {
    /// Folders the scan will walk.
    pub folders: Vec<String>,
}

/// Starts at most one background scan at a time and publishes its state
/// through a [`ScanMonitor`].
#[derive(Clone)]
pub struct ScanOrchestrator {
    connector: Arc<dyn MailConnector>,
    store: Arc<dyn MessageStore>,
    monitor: Arc<ScanMonitor>,
}

impl ScanOrchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        connector: Arc<dyn MailConnector>,
        store: Arc<dyn MessageStore>,
        monitor: Arc<ScanMonitor>,
    ) -> Self {
        Self {
            connector,
            store,
            monitor,
        }
    }

    /// Shared scan state.
    #[must_use]
    pub fn monitor(&self) -> &Arc<ScanMonitor> {
        &self.monitor
    }

    /// Spawns a scan on the current Tokio runtime and returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::AlreadyRunning`] if a scan is active; the
    /// active scan is unaffected. Returns [`ScanError::NoRuntime`] outside a
    /// Tokio runtime, leaving the monitor idle.
    pub fn start(&self, request: ScanRequest) -> Result<ScanAccepted, ScanError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ScanError::NoRuntime)?;
        let folders = request.normalized_folders();
        if !self.monitor.try_begin(folders.len()) {
            return Err(ScanError::AlreadyRunning);
        }

        info!("Starting scan of {} folder(s): {:?}", folders.len(), folders);
        let run = ScanRun {
            connector: Arc::clone(&self.connector),
            store: Arc::clone(&self.store),
            monitor: Arc::clone(&self.monitor),
            cancel: self.monitor.cancellation(),
            folders: folders.clone(),
            credentials: request.credentials,
        };
        runtime.spawn(run.execute());

        Ok(ScanAccepted { folders })
    }

    /// Lists the account's folders over a short-lived session.
    ///
    /// # Errors
    ///
    /// Returns an error if connecting or listing fails.
    pub async fn list_folders(&self, credentials: &Credentials) -> Result<Vec<String>, MailError> {
        let mut session = self.connector.connect(credentials).await?;
        let folders = session.list_folders().await;
        if let Err(e) = session.logout().await {
            debug!("Logout after folder listing failed: {}", e);
        }
        folders
    }
}

/// Stable identifier for a message: its Message-ID, or a synthesized one
/// built from folder, date and position in the fetched batch.
#[must_use]
pub fn record_id(message: &MailMessage, folder: &str, index: usize) -> String {
    let id = message.message_id.trim();
    if !id.is_empty() {
        return id.to_string();
    }
    let stamp = message.date.map_or_else(
        || "undated".to_string(),
        |date| date.format("%Y%m%d%H%M%S").to_string(),
    );
    format!("synthetic:{folder}:{stamp}:{index}")
}

/// Marks the scan as failed if the task unwinds before reaching a terminal
/// state, so the running flag is never left set.
struct RunGuard {
    monitor: Arc<ScanMonitor>,
    armed: bool,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if self.armed {
            error!("Scan task ended without a terminal state");
            self.monitor
                .finish(&ScanOutcome::Failed("scan task aborted".to_string()));
        }
    }
}

struct ScanRun {
    connector: Arc<dyn MailConnector>,
    store: Arc<dyn MessageStore>,
    monitor: Arc<ScanMonitor>,
    cancel: CancellationSignal,
    folders: Vec<String>,
    credentials: Credentials,
}

impl ScanRun {
    async fn execute(self) {
        let mut guard = RunGuard {
            monitor: Arc::clone(&self.monitor),
            armed: true,
        };
        let outcome = self.scan().await;
        match &outcome {
            ScanOutcome::Completed { processed } => {
                info!("Scan completed: {} messages indexed", processed);
            }
            ScanOutcome::Cancelled { processed } => {
                info!("Scan cancelled after {} messages", processed);
            }
            ScanOutcome::Failed(reason) => warn!("Scan failed: {}", reason),
        }
        self.monitor.finish(&outcome);
        guard.armed = false;
    }

    async fn scan(&self) -> ScanOutcome {
        let mut session = match self.connector.connect(&self.credentials).await {
            Ok(session) => session,
            Err(e) => {
                error!("IMAP connection failed: {}", e);
                return ScanOutcome::Failed(format!("connection failed: {e}"));
            }
        };
        self.monitor
            .update_progress(|p| p.phase = ScanPhase::Scanning);

        let outcome = self.scan_folders(session.as_mut()).await;
        if let Err(e) = session.logout().await {
            debug!("Logout after scan failed: {}", e);
        }
        outcome
    }

    async fn scan_folders(&self, session: &mut dyn MailSession) -> ScanOutcome {
        let total = self.folders.len();
        let mut processed: u64 = 0;

        for (i, folder) in self.folders.iter().enumerate() {
            if self.cancel.consume() {
                return ScanOutcome::Cancelled { processed };
            }
            self.monitor.update_progress(|p| {
                p.current_folder.clone_from(folder);
                p.folders_done = i;
                p.percent_complete = folder_percent(i, total);
            });
            info!("Scanning folder {} ({}/{})", folder, i + 1, total);

            let messages = match session.fetch_messages(folder, 0).await {
                Ok(messages) => messages,
                Err(e) => {
                    warn!("Skipping folder {}: {}", folder, e);
                    continue;
                }
            };
            let fetched = messages.len() as u64;
            self.monitor.update_progress(|p| p.emails_total += fetched);
            debug!("Fetched {} messages from {}", fetched, folder);

            for (j, message) in messages.iter().enumerate() {
                if j % CANCEL_CHECK_INTERVAL == 0 && self.cancel.consume() {
                    return ScanOutcome::Cancelled { processed };
                }
                let record = MailRecord::from_message(message, record_id(message, folder, j));
                if let Err(e) = self.store.upsert(&record).await {
                    warn!("Failed to store message {}: {}", record.external_id, e);
                    continue;
                }
                processed += 1;
                self.monitor.update_progress(|p| p.emails_done += 1);
                if processed % 10 == 0 {
                    info!("Indexed {} messages so far", processed);
                }
            }
        }

        ScanOutcome::Completed { processed }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn message(id: &str) -> MailMessage {
        MailMessage {
            message_id: id.to_string(),
            from: "a@example.com".to_string(),
            subject: "Hello".to_string(),
            date: None,
            snippet: String::new(),
            folder: "INBOX".to_string(),
            is_read: false,
        }
    }

    #[test]
    fn test_record_id_prefers_message_id() {
        assert_eq!(record_id(&message(" <m1@x> "), "INBOX", 3), "<m1@x>");
    }

    #[test]
    fn test_record_id_synthesized() {
        let mut msg = message("");
        assert_eq!(record_id(&msg, "INBOX", 4), "synthetic:INBOX:undated:4");

        msg.date = Utc.with_ymd_and_hms(2024, 3, 9, 8, 5, 1).single();
        assert_eq!(
            record_id(&msg, "Sent", 0),
            "synthetic:Sent:20240309080501:0"
        );
    }

    #[test]
    fn test_request_folders_default_to_inbox() {
        let creds = Credentials::new("u@example.com", "pw");
        let request = ScanRequest::new(creds.clone());
        assert_eq!(request.normalized_folders(), vec!["INBOX"]);

        let request = ScanRequest::new(creds).with_folders(vec![
            " Sent ".to_string(),
            String::new(),
            "Archive".to_string(),
        ]);
        assert_eq!(request.normalized_folders(), vec!["Sent", "Archive"]);
    }
}
