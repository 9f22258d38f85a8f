//! Cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A single-slot, non-blocking cancellation flag.
///
/// Clones share the same slot. Requesting is idempotent; the running scan
/// polls with [`consume`](Self::consume), which clears the slot.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    requested: Arc<AtomicBool>,
}

impl CancellationSignal {
    /// Creates a cleared signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Returns `false` if a request was already pending.
    pub fn request(&self) -> bool {
        !self.requested.swap(true, Ordering::SeqCst)
    }

    /// Returns whether a request is pending, without clearing it.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Takes a pending request. Returns `true` if one was pending.
    pub fn consume(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }

    /// Drops any pending request.
    pub fn clear(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}
