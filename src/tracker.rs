//! Dirty-flag change tracking.
//!
//! Bursts of change notifications collapse into a single pending resolve.
//! The host drains the flag once per event-loop iteration, so marking dirty
//! any number of times between drains fires exactly one resolve.

use tracing::trace;

/// Pending-resolve flag with a counter of fired resolves.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    pending: bool,
    resolves: u64,
}

impl ChangeTracker {
    /// Create a tracker with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a resolve. Returns true only for the call that scheduled it.
    pub fn mark_dirty(&mut self) -> bool {
        if self.pending {
            return false;
        }
        trace!("resolve scheduled");
        self.pending = true;
        true
    }

    /// Whether a resolve is scheduled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Consume the pending flag. Returns true if a resolve should run now.
    pub fn take_pending(&mut self) -> bool {
        if !std::mem::take(&mut self.pending) {
            return false;
        }
        self.resolves += 1;
        true
    }

    /// Drop a scheduled resolve without running it.
    pub fn cancel(&mut self) {
        if self.pending {
            trace!("pending resolve superseded");
        }
        self.pending = false;
    }

    /// Number of resolves fired through [`ChangeTracker::take_pending`].
    #[must_use]
    pub fn resolve_count(&self) -> u64 {
        self.resolves
    }
}
