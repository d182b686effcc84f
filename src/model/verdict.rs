use std::time::SystemTime;

use super::Tag;

/// Cached compliance result for one worker.
///
/// Owned by the [`MonitorEngine`](crate::MonitorEngine) and always replaced
/// as a whole; there is no partial update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    forbidden_tag: Option<Tag>,
    computed_at: SystemTime,
}

impl Verdict {
    /// Verdict with the given (optional) forbidden tag, stamped now.
    pub fn new(forbidden_tag: Option<Tag>) -> Self {
        Self {
            forbidden_tag,
            computed_at: SystemTime::now(),
        }
    }

    /// Compliant verdict stamped now.
    pub fn compliant() -> Self {
        Self::new(None)
    }

    /// Non-compliant verdict stamped now.
    pub fn non_compliant(tag: Tag) -> Self {
        Self::new(Some(tag))
    }

    /// The forbidden tag that applies, if any.
    pub fn forbidden_tag(&self) -> Option<&Tag> {
        self.forbidden_tag.as_ref()
    }

    /// True when no forbidden tag applies.
    pub fn is_compliant(&self) -> bool {
        self.forbidden_tag.is_none()
    }

    /// Wall-clock time of the evaluation.
    pub fn computed_at(&self) -> SystemTime {
        self.computed_at
    }
}
