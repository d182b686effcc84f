use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Stable identifier of a worker in the registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(Arc<str>);

impl WorkerId {
    /// Creates a new id.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Borrowed string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for WorkerId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Borrow<str> for WorkerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// How a worker is remediated when it carries a forbidden tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    /// Long-lived node: quarantined (kept connected, ineligible for work).
    Persistent,
    /// Cloud-provisioned node: disconnected (torn down).
    Ephemeral,
}

impl WorkerKind {
    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerKind::Persistent => "persistent",
            WorkerKind::Ephemeral => "ephemeral",
        }
    }
}

/// Snapshot of a worker as read from the registry.
///
/// Tags are kept in a `BTreeSet` so evaluation order is deterministic
/// for a given tag set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerDescriptor {
    id: WorkerId,
    kind: WorkerKind,
    tags: BTreeSet<String>,
}

impl WorkerDescriptor {
    /// Creates a descriptor.
    pub fn new<I, S>(id: impl Into<WorkerId>, kind: WorkerKind, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            kind,
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    /// Assigned tags in evaluation order.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }
}

/// Who put a worker offline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CauseOrigin {
    /// This subsystem, because the worker carries a forbidden tag.
    ForbiddenTag,
    /// Anything else (operator action, host maintenance, crash, ...).
    Other,
}

/// Human-readable reason attached to an offline/quarantined/disconnected worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OfflineCause {
    origin: CauseOrigin,
    message: Arc<str>,
}

impl OfflineCause {
    /// Cause applied by forbidden-tag enforcement.
    pub fn forbidden_tag(message: impl Into<Arc<str>>) -> Self {
        Self {
            origin: CauseOrigin::ForbiddenTag,
            message: message.into(),
        }
    }

    /// Cause applied by anything else.
    pub fn other(message: impl Into<Arc<str>>) -> Self {
        Self {
            origin: CauseOrigin::Other,
            message: message.into(),
        }
    }

    pub fn origin(&self) -> CauseOrigin {
        self.origin
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// True if this subsystem owns the cause (and may therefore clear it).
    pub fn is_forbidden_tag(&self) -> bool {
        self.origin == CauseOrigin::ForbiddenTag
    }
}

impl fmt::Display for OfflineCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Operational state of a worker as seen by the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkerStatus {
    /// Reachable and eligible for work.
    Online,
    /// Not reachable, no particular cause recorded (not launched yet, lost connection).
    Offline,
    /// Marked temporarily ineligible for work.
    Quarantined(OfflineCause),
    /// Disconnect requested and accepted, teardown in progress.
    Disconnecting(OfflineCause),
    /// Torn down.
    Disconnected(OfflineCause),
}

impl WorkerStatus {
    /// Cause attached to the current state, if any.
    pub fn cause(&self) -> Option<&OfflineCause> {
        match self {
            WorkerStatus::Online | WorkerStatus::Offline => None,
            WorkerStatus::Quarantined(c)
            | WorkerStatus::Disconnecting(c)
            | WorkerStatus::Disconnected(c) => Some(c),
        }
    }

    /// True if quarantined by forbidden-tag enforcement.
    pub fn is_policy_quarantine(&self) -> bool {
        matches!(self, WorkerStatus::Quarantined(c) if c.is_forbidden_tag())
    }

    /// True if disconnecting/disconnected by forbidden-tag enforcement.
    pub fn is_policy_disconnect(&self) -> bool {
        matches!(
            self,
            WorkerStatus::Disconnecting(c) | WorkerStatus::Disconnected(c) if c.is_forbidden_tag()
        )
    }

    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerStatus::Online => "online",
            WorkerStatus::Offline => "offline",
            WorkerStatus::Quarantined(_) => "quarantined",
            WorkerStatus::Disconnecting(_) => "disconnecting",
            WorkerStatus::Disconnected(_) => "disconnected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_orders_tags() {
        let w = WorkerDescriptor::new("w1", WorkerKind::Persistent, ["zeta", "alpha", "mid"]);
        let tags: Vec<&str> = w.tags().iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn only_forbidden_tag_causes_are_policy_owned() {
        let policy = WorkerStatus::Quarantined(OfflineCause::forbidden_tag("x"));
        let operator = WorkerStatus::Quarantined(OfflineCause::other("maintenance"));
        assert!(policy.is_policy_quarantine());
        assert!(!operator.is_policy_quarantine());
        assert!(!operator.is_policy_disconnect());
        assert!(WorkerStatus::Disconnecting(OfflineCause::forbidden_tag("x")).is_policy_disconnect());
        assert_eq!(WorkerStatus::Online.cause(), None);
    }
}
