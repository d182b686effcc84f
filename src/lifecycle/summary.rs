use crate::model::WorkerId;

/// Fleet-wide view of workers currently quarantined by policy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolicySummary {
    /// Sorted ids of policy-quarantined workers.
    pub quarantined: Vec<WorkerId>,
}

impl PolicySummary {
    /// True if at least one worker is quarantined by policy.
    pub fn any(&self) -> bool {
        !self.quarantined.is_empty()
    }

    /// True if `id` is quarantined by policy.
    pub fn contains(&self, id: &WorkerId) -> bool {
        self.quarantined.binary_search(id).is_ok()
    }
}
