//! # LogWriter: event renderer
//!
//! A minimal subscriber that renders incoming [`Event`]s as `tracing` records
//! under the `labelwarden::events` target. Install any `tracing` subscriber in
//! the host to see them.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO labelwarden::events: worker-quarantined worker="w1" tag="barfoo" reason="worker is assigned forbidden tag 'barfoo'"
//! INFO labelwarden::events: worker-restored worker="w1"
//! DEBUG labelwarden::events: refresh-completed generation=3 count=12
//! WARN labelwarden::events: lookup-failed worker="w7" tag="linux" reason="catalog offline"
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let label = e.kind.as_label();
        let worker = e.worker.as_deref().unwrap_or("-");
        let tag = e.tag.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::WorkerQuarantined
            | EventKind::WorkerDisconnected
            | EventKind::WorkerRestored
            | EventKind::EnforcementToggled
            | EventKind::ShutdownRequested => {
                info!(target: "labelwarden::events", seq = e.seq, worker, tag, reason, "{label}");
            }
            EventKind::LookupFailed
            | EventKind::EnforcementDeferred
            | EventKind::RegistryFailed
            | EventKind::SubscriberOverflow
            | EventKind::SubscriberPanicked => {
                warn!(target: "labelwarden::events", seq = e.seq, worker, tag, reason, "{label}");
            }
            EventKind::RefreshScheduled | EventKind::RefreshStarted | EventKind::RefreshCompleted => {
                debug!(
                    target: "labelwarden::events",
                    seq = e.seq,
                    generation = e.generation,
                    count = e.count,
                    "{label}"
                );
            }
            EventKind::VerdictComputed
            | EventKind::EnforcementSuspended
            | EventKind::AssignmentBlocked => {
                debug!(target: "labelwarden::events", seq = e.seq, worker, tag, "{label}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
