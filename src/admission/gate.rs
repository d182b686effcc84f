//! # AdmissionGate.
//!
//! ## Decision table
//! ```text
//! toggle disabled            → Allow   (total suspension)
//! no verdict cached          → Allow   (fail-open)
//! cached verdict compliant   → Allow
//! cached forbidden tag       → Block(Blockage naming the tag)
//! ```
//! The gate never evaluates, never awaits and never touches the registry, so
//! it is safe to call from the scheduler's hot path.

use std::fmt;
use std::sync::Arc;

use crate::events::{Bus, Event, EventKind};
use crate::model::{Tag, WorkerId};
use crate::monitor::MonitorEngine;
use crate::toggle::EnforcementToggle;

/// Reason an assignment was refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blockage {
    tag: Tag,
}

impl Blockage {
    /// Blockage caused by `tag`.
    pub fn new(tag: Tag) -> Self {
        Self { tag }
    }

    /// The forbidden tag responsible for the block.
    pub fn tag(&self) -> &Tag {
        &self.tag
    }
}

impl fmt::Display for Blockage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blocked by forbidden tag '{}'", self.tag)
    }
}

/// Answer of [`AdmissionGate::can_assign`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    /// The worker may receive the task.
    Allow,
    /// The worker must not receive the task.
    Block(Blockage),
}

impl Admission {
    /// True for [`Admission::Allow`].
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allow)
    }
}

/// Cache-only veto on assigning work to a worker.
pub struct AdmissionGate {
    engine: Arc<MonitorEngine>,
    toggle: EnforcementToggle,
    bus: Bus,
}

impl AdmissionGate {
    /// Creates a gate reading `engine`'s verdict cache.
    pub fn new(engine: Arc<MonitorEngine>, toggle: EnforcementToggle, bus: Bus) -> Self {
        Self { engine, toggle, bus }
    }

    /// Decides whether `worker` may receive a task right now.
    pub fn can_assign(&self, worker: &WorkerId) -> Admission {
        if !self.toggle.is_enabled() {
            return Admission::Allow;
        }
        let Some(verdict) = self.engine.cached(worker) else {
            return Admission::Allow;
        };
        match verdict.forbidden_tag() {
            None => Admission::Allow,
            Some(tag) => {
                self.bus.publish(
                    Event::new(EventKind::AssignmentBlocked)
                        .with_worker(worker.as_str())
                        .with_tag(tag.name()),
                );
                Admission::Block(Blockage::new(tag.clone()))
            }
        }
    }
}
