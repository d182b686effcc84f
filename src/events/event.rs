//! # Runtime events emitted by the warden components.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Evaluation events**: verdicts computed, lookups failed
//! - **Enforcement events**: quarantine, disconnect, restore, suspension, deferral
//! - **Admission events**: assignments vetoed by the gate
//! - **Runtime events**: refresh passes, toggle flips, registry failures, shutdown
//!
//! The [`Event`] struct carries additional metadata such as timestamps, worker
//! id, tag, reason and refresh generation.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use labelwarden::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::WorkerQuarantined)
//!     .with_worker("w1")
//!     .with_tag("barfoo")
//!     .with_reason("worker is assigned forbidden tag 'barfoo'");
//!
//! assert_eq!(ev.kind, EventKind::WorkerQuarantined);
//! assert_eq!(ev.worker.as_deref(), Some("w1"));
//! assert_eq!(ev.tag.as_deref(), Some("barfoo"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `worker`: subscriber name
    /// - `reason`: panic info
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `worker`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    // === Evaluation events ===
    /// A worker was evaluated and its verdict cached.
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `tag`: forbidden tag (absent when compliant)
    VerdictComputed,

    /// A catalog lookup failed during evaluation; the tag was treated as allowed.
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `tag`: tag whose lookup failed
    /// - `reason`: lookup error
    LookupFailed,

    // === Enforcement events ===
    /// A persistent worker was quarantined (or its quarantine cause refreshed).
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `tag`: offending tag
    /// - `reason`: cause text
    WorkerQuarantined,

    /// An ephemeral worker's disconnect request was accepted.
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `tag`: offending tag
    /// - `reason`: cause text
    WorkerDisconnected,

    /// A policy quarantine was cleared after a compliant verdict.
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `reason`: cause that was cleared
    WorkerRestored,

    /// A non-compliant verdict was not enforced because enforcement is suspended.
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `tag`: offending tag
    EnforcementSuspended,

    /// Enforcement could not be applied (registry error, disconnect timeout);
    /// it will be retried by the next pass.
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `tag`: offending tag (absent for failed restores)
    /// - `reason`: error text
    EnforcementDeferred,

    // === Admission events ===
    /// The admission gate vetoed an assignment.
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `tag`: offending tag
    AssignmentBlocked,

    // === Runtime events ===
    /// A fleet refresh was requested.
    ///
    /// Sets:
    /// - `generation`: request generation
    RefreshScheduled,

    /// A refresh pass started.
    ///
    /// Sets:
    /// - `generation`: highest request generation covered by this pass
    RefreshStarted,

    /// A refresh pass finished.
    ///
    /// Sets:
    /// - `generation`: highest request generation covered by this pass
    /// - `count`: number of workers in the pass
    RefreshCompleted,

    /// The worker registry failed outside of a per-worker operation
    /// (e.g. while enumerating workers).
    ///
    /// Sets:
    /// - `reason`: error text
    RegistryFailed,

    /// The enforcement toggle was flipped.
    ///
    /// Sets:
    /// - `reason`: "enabled" or "disabled"
    EnforcementToggled,

    /// Shutdown requested (OS signal or explicit call).
    ShutdownRequested,
}

impl EventKind {
    /// Short stable label (kebab-case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::SubscriberPanicked => "subscriber-panicked",
            EventKind::SubscriberOverflow => "subscriber-overflow",
            EventKind::VerdictComputed => "verdict-computed",
            EventKind::LookupFailed => "lookup-failed",
            EventKind::WorkerQuarantined => "worker-quarantined",
            EventKind::WorkerDisconnected => "worker-disconnected",
            EventKind::WorkerRestored => "worker-restored",
            EventKind::EnforcementSuspended => "enforcement-suspended",
            EventKind::EnforcementDeferred => "enforcement-deferred",
            EventKind::AssignmentBlocked => "assignment-blocked",
            EventKind::RefreshScheduled => "refresh-scheduled",
            EventKind::RefreshStarted => "refresh-started",
            EventKind::RefreshCompleted => "refresh-completed",
            EventKind::RegistryFailed => "registry-failed",
            EventKind::EnforcementToggled => "enforcement-toggled",
            EventKind::ShutdownRequested => "shutdown-requested",
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Worker id (or subscriber name for subscriber events).
    pub worker: Option<Arc<str>>,
    /// Tag involved, if any.
    pub tag: Option<Arc<str>>,
    /// Human-readable reason (cause text, error message, ...).
    pub reason: Option<Arc<str>>,
    /// Refresh request generation.
    pub generation: Option<u64>,
    /// Number of workers involved.
    pub count: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            tag: None,
            reason: None,
            generation: None,
            count: None,
        }
    }

    /// Attaches a worker id.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches a tag name.
    #[inline]
    pub fn with_tag(mut self, tag: impl Into<Arc<str>>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a refresh generation.
    #[inline]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Attaches a count (saturating at `u32::MAX`).
    #[inline]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(u32::try_from(count).unwrap_or(u32::MAX));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_worker(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_worker(subscriber)
            .with_reason(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::RefreshStarted);
        let b = Event::new(EventKind::RefreshCompleted).with_count(3);
        assert!(b.seq > a.seq);
        assert_eq!(b.count, Some(3));
    }
}
