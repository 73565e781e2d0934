//! Built-in lifecycle event sinks.

use keepsake_core::{EventKind, LifecycleEvent, PassReport};
use keepsake_interface::Notifier;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{info, warn};

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, event: &LifecycleEvent) {
        match event.kind() {
            EventKind::Failed | EventKind::Quarantined => warn!(
                record_id = %event.record_id(),
                stage = %event.stage(),
                pipeline_stage = %event.pipeline_stage(),
                kind = %event.kind(),
                error = event.error().as_deref().unwrap_or(""),
                "Lifecycle event"
            ),
            EventKind::Acquired | EventKind::Advanced => info!(
                record_id = %event.record_id(),
                stage = %event.stage(),
                pipeline_stage = %event.pipeline_stage(),
                kind = %event.kind(),
                "Lifecycle event"
            ),
        }
    }

    fn pass_completed(&self, report: &PassReport) {
        info!(
            dry_run = report.dry_run,
            advanced = report.total_advanced(),
            failed = report.total_failed(),
            aborted = report.aborted.as_deref().unwrap_or(""),
            "Pass completed"
        );
    }
}

/// A message sent by [`ChannelNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// One record event
    Event(LifecycleEvent),
    /// A finished pass
    PassCompleted(PassReport),
}

/// Forwards events to an unbounded channel.
///
/// Sending never blocks. Events are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// A notifier and the receiving end of its channel.
    pub fn channel() -> (Self, UnboundedReceiver<Notification>) {
        let (sender, receiver) = unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: &LifecycleEvent) {
        let _ = self.sender.send(Notification::Event(event.clone()));
    }

    fn pass_completed(&self, report: &PassReport) {
        let _ = self.sender.send(Notification::PassCompleted(report.clone()));
    }
}
