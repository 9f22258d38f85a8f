//! Scan status and progress shared between the scan task and observers.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cancel::CancellationSignal;

/// Lifecycle phase of a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPhase {
    /// No scan has run yet.
    #[default]
    Idle,
    /// Opening the IMAP session.
    Connecting,
    /// Walking folders.
    Scanning,
    /// Finished every folder.
    Completed,
    /// Stopped on user request.
    Cancelled,
    /// Stopped on a connection failure or an aborted task.
    Error,
}

impl ScanPhase {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Scanning => "scanning",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        }
    }

    /// Whether a scan in this phase has ended.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Error)
    }
}

/// Summary of the current or most recent scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatus {
    /// A scan task is active.
    pub running: bool,
    /// When the last scan ended.
    pub last_scan_timestamp: Option<DateTime<Utc>>,
    /// Messages stored by the last completed or cancelled scan.
    pub last_email_count: u64,
    /// Why the last scan did not complete, if it didn't.
    pub last_error: Option<String>,
}

/// Fine-grained progress of the current or most recent scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Folder being scanned.
    pub current_folder: String,
    /// Folders requested.
    pub folders_total: usize,
    /// Folders finished.
    pub folders_done: usize,
    /// Messages fetched so far.
    pub emails_total: u64,
    /// Messages stored so far.
    pub emails_done: u64,
    /// Folder-granular completion, 0 to 100.
    pub percent_complete: u32,
    /// Lifecycle phase.
    pub phase: ScanPhase,
}

/// Result of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The running scan will stop at its next checkpoint.
    Requested,
    /// A request was already waiting to be observed.
    AlreadyPending,
    /// No scan is running.
    NotRunning,
}

/// How a scan task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScanOutcome {
    Completed { processed: u64 },
    Cancelled { processed: u64 },
    Failed(String),
}

#[derive(Debug, Default)]
struct Shared {
    status: ScanStatus,
    progress: ScanProgress,
}

/// Mutex-guarded scan state plus the cancellation slot.
///
/// Readers always receive copies. The running flag and the cancellation
/// slot change together under the lock, so a request can never leak from
/// one scan into the next.
#[derive(Debug, Default)]
pub struct ScanMonitor {
    shared: Mutex<Shared>,
    cancel: CancellationSignal,
}

impl ScanMonitor {
    /// Creates an idle monitor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the status.
    #[must_use]
    pub fn status(&self) -> ScanStatus {
        self.lock().status.clone()
    }

    /// Copy of the progress.
    #[must_use]
    pub fn progress(&self) -> ScanProgress {
        self.lock().progress.clone()
    }

    /// Status and progress read under one lock.
    #[must_use]
    pub fn snapshot(&self) -> (ScanStatus, ScanProgress) {
        let shared = self.lock();
        (shared.status.clone(), shared.progress.clone())
    }

    /// Whether a scan task is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock().status.running
    }

    /// Asks the running scan to stop.
    pub fn request_cancel(&self) -> CancelOutcome {
        let shared = self.lock();
        if !shared.status.running {
            return CancelOutcome::NotRunning;
        }
        if self.cancel.request() {
            CancelOutcome::Requested
        } else {
            CancelOutcome::AlreadyPending
        }
    }

    pub(crate) fn cancellation(&self) -> CancellationSignal {
        self.cancel.clone()
    }

    /// Claims the running flag. Returns `false` if a scan already holds it.
    pub(crate) fn try_begin(&self, folders_total: usize) -> bool {
        let mut shared = self.lock();
        if shared.status.running {
            return false;
        }
        shared.status.running = true;
        shared.status.last_error = None;
        shared.progress = ScanProgress {
            folders_total,
            phase: ScanPhase::Connecting,
            ..ScanProgress::default()
        };
        self.cancel.clear();
        true
    }

    pub(crate) fn update_progress(&self, f: impl FnOnce(&mut ScanProgress)) {
        f(&mut self.lock().progress);
    }

    /// Records the terminal state and releases the running flag.
    pub(crate) fn finish(&self, outcome: &ScanOutcome) {
        let mut shared = self.lock();
        let Shared { status, progress } = &mut *shared;
        status.running = false;
        status.last_scan_timestamp = Some(Utc::now());
        match outcome {
            ScanOutcome::Completed { processed } => {
                status.last_email_count = *processed;
                status.last_error = None;
                progress.folders_done = progress.folders_total;
                progress.percent_complete = 100;
                progress.phase = ScanPhase::Completed;
            }
            ScanOutcome::Cancelled { processed } => {
                status.last_email_count = *processed;
                status.last_error = Some("cancelled by user".to_string());
                progress.phase = ScanPhase::Cancelled;
            }
            ScanOutcome::Failed(reason) => {
                status.last_error = Some(reason.clone());
                progress.phase = ScanPhase::Error;
            }
        }
        self.cancel.clear();
    }
}

/// Folder-granular percentage; reaches 100 only when the scan completes.
pub(crate) fn folder_percent(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    u32::try_from(done.saturating_mul(100) / total).unwrap_or(100)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_wire_names() {
        assert_eq!(ScanPhase::default(), ScanPhase::Idle);
        assert_eq!(ScanPhase::Cancelled.as_str(), "cancelled");
        assert_eq!(
            serde_json::to_string(&ScanPhase::Scanning).unwrap(),
            "\"scanning\""
        );
        assert!(ScanPhase::Error.is_terminal());
        assert!(!ScanPhase::Connecting.is_terminal());
    }

    #[test]
    fn test_begin_is_exclusive() {
        let monitor = ScanMonitor::new();
        assert!(monitor.try_begin(2));
        assert!(!monitor.try_begin(3));

        let (status, progress) = monitor.snapshot();
        assert!(status.running);
        assert_eq!(progress.folders_total, 2);
        assert_eq!(progress.phase, ScanPhase::Connecting);
    }

    #[test]
    fn test_cancel_outcomes() {
        let monitor = ScanMonitor::new();
        assert_eq!(monitor.request_cancel(), CancelOutcome::NotRunning);

        monitor.try_begin(1);
        assert_eq!(monitor.request_cancel(), CancelOutcome::Requested);
        assert_eq!(monitor.request_cancel(), CancelOutcome::AlreadyPending);
        assert!(monitor.cancellation().consume());
    }

    #[test]
    fn test_stale_request_does_not_leak() {
        let monitor = ScanMonitor::new();
        monitor.try_begin(1);
        monitor.request_cancel();
        monitor.finish(&ScanOutcome::Completed { processed: 3 });
        assert!(!monitor.cancellation().is_requested());

        monitor.try_begin(1);
        assert!(!monitor.cancellation().is_requested());
    }

    #[test]
    fn test_finish_completed() {
        let monitor = ScanMonitor::new();
        monitor.try_begin(4);
        monitor.update_progress(|p| p.folders_done = 3);
        monitor.finish(&ScanOutcome::Completed { processed: 42 });

        let (status, progress) = monitor.snapshot();
        assert!(!status.running);
        assert!(status.last_scan_timestamp.is_some());
        assert_eq!(status.last_email_count, 42);
        assert_eq!(status.last_error, None);
        assert_eq!(progress.folders_done, 4);
        assert_eq!(progress.percent_complete, 100);
        assert_eq!(progress.phase, ScanPhase::Completed);
    }

    #[test]
    fn test_finish_failed_keeps_previous_count() {
        let monitor = ScanMonitor::new();
        monitor.try_begin(1);
        monitor.finish(&ScanOutcome::Completed { processed: 7 });
        monitor.try_begin(1);
        monitor.finish(&ScanOutcome::Failed("connection refused".into()));

        let (status, progress) = monitor.snapshot();
        assert_eq!(status.last_email_count, 7);
        assert_eq!(status.last_error.as_deref(), Some("connection refused"));
        assert_eq!(progress.phase, ScanPhase::Error);
    }

    #[test]
    fn test_begin_clears_last_error() {
        let monitor = ScanMonitor::new();
        monitor.try_begin(1);
        monitor.finish(&ScanOutcome::Cancelled { processed: 1 });
        assert_eq!(
            monitor.status().last_error.as_deref(),
            Some("cancelled by user")
        );
        monitor.try_begin(1);
        assert_eq!(monitor.status().last_error, None);
    }

    #[test]
    fn test_folder_percent() {
        assert_eq!(folder_percent(0, 0), 0);
        assert_eq!(folder_percent(0, 3), 0);
        assert_eq!(folder_percent(1, 3), 33);
        assert_eq!(folder_percent(2, 3), 66);
        assert_eq!(folder_percent(3, 3), 100);
    }
}
