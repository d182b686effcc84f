use crate::model::WorkerId;

/// Lifecycle transition reported by the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Worker finished connecting and is about to become schedulable.
    BecameReachable(WorkerId),
    /// Fleet configuration (tags, catalog, workers) changed.
    ConfigurationChanged,
    /// Worker lost its connection.
    WentOffline(WorkerId),
    /// Worker connection came back.
    CameOnline(WorkerId),
    /// Worker was marked temporarily ineligible.
    TemporarilyOffline(WorkerId),
    /// Worker eligibility was restored.
    TemporarilyOnline(WorkerId),
    /// Enforcement toggle changed to `enabled`.
    PolicyToggled {
        /// New toggle state.
        enabled: bool,
    },
}

impl LifecycleEvent {
    /// Returns a short stable label (kebab-case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LifecycleEvent::BecameReachable(_) => "became-reachable",
            LifecycleEvent::ConfigurationChanged => "configuration-changed",
            LifecycleEvent::WentOffline(_) => "went-offline",
            LifecycleEvent::CameOnline(_) => "came-online",
            LifecycleEvent::TemporarilyOffline(_) => "temporarily-offline",
            LifecycleEvent::TemporarilyOnline(_) => "temporarily-online",
            LifecycleEvent::PolicyToggled { .. } => "policy-toggled",
        }
    }

    /// Worker the transition concerns, if any.
    pub fn worker(&self) -> Option<&WorkerId> {
        match self {
            LifecycleEvent::BecameReachable(id)
            | LifecycleEvent::WentOffline(id)
            | LifecycleEvent::CameOnline(id)
            | LifecycleEvent::TemporarilyOffline(id)
            | LifecycleEvent::TemporarilyOnline(id) => Some(id),
            LifecycleEvent::ConfigurationChanged | LifecycleEvent::PolicyToggled { .. } => None,
        }
    }
}
