//! Mailbox scanning: the detached scan task, its shared status and the
//! cooperative cancellation signal.

mod cancel;
mod orchestrator;
mod state;

pub use cancel::CancellationSignal;
pub use orchestrator::{ScanAccepted, ScanError, ScanOrchestrator, ScanRequest, record_id};
pub use state::{CancelOutcome, ScanMonitor, ScanPhase, ScanProgress, ScanStatus};
