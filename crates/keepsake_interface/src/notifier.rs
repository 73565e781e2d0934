//! Lifecycle event sink.

use keepsake_core::{LifecycleEvent, PassReport};

/// Receives lifecycle events.
///
/// Calls are fire-and-forget: implementations must not block, and the
/// orchestrator ignores any panic they raise.
pub trait Notifier: Send + Sync {
    /// A record was acquired, advanced, failed or quarantined.
    fn notify(&self, event: &LifecycleEvent);

    /// A pass finished.
    fn pass_completed(&self, _report: &PassReport) {}
}
