//! Cause texts attached to policy transitions.
//!
//! Both carry [`CauseOrigin::ForbiddenTag`](crate::CauseOrigin) so restoration
//! can tell them apart from operator quarantines.

use crate::model::{OfflineCause, Tag};

/// Cause attached when a persistent worker is quarantined.
pub fn quarantine_cause(tag: &Tag) -> OfflineCause {
    OfflineCause::forbidden_tag(format!("worker is assigned forbidden tag '{tag}'"))
}

/// Cause attached when an ephemeral worker is disconnected.
pub fn disconnect_cause(tag: &Tag) -> OfflineCause {
    OfflineCause::forbidden_tag(format!(
        "worker is assigned forbidden tag '{tag}'; disconnecting ephemeral worker"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn causes_name_the_tag() {
        let tag = Tag::forbidden("barfoo");
        let q = quarantine_cause(&tag);
        let d = disconnect_cause(&tag);
        assert!(q.is_forbidden_tag() && d.is_forbidden_tag());
        assert_eq!(q.message(), "worker is assigned forbidden tag 'barfoo'");
        assert!(d.message().contains("barfoo"));
        assert_ne!(q.message(), d.message());
    }
}
