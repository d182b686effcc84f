//! # Compliance evaluator.
//!
//! Pure decision function: given a worker's assigned tags and the catalog,
//! returns the (at most one) forbidden tag that applies.
//!
//! ## Rules
//! - Tags are checked in the descriptor's order (sorted by name), first forbidden match wins.
//! - The exempt worker (the controller node) and workers without tags are always compliant.
//! - A failed lookup skips that tag and is reported; it never turns into a forbidden verdict.
//! - No side effects: the catalog is only read, nothing is cached here.

use tracing::trace;

use crate::catalog::TagCatalog;
use crate::error::LookupError;
use crate::model::{Tag, WorkerDescriptor, WorkerId};

/// Outcome of evaluating one worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Evaluation {
    /// No assigned tag is forbidden.
    Compliant,
    /// The first forbidden tag found.
    Forbidden(Tag),
    /// No forbidden tag was found, but some lookups failed.
    LookupFailed(Vec<LookupError>),
}

impl Evaluation {
    /// Fail-open projection: the forbidden tag, if one was positively found.
    pub fn into_forbidden(self) -> Option<Tag> {
        match self {
            Evaluation::Forbidden(tag) => Some(tag),
            Evaluation::Compliant | Evaluation::LookupFailed(_) => None,
        }
    }
}

/// Evaluates workers against a tag catalog.
#[derive(Clone, Debug, Default)]
pub struct ComplianceEvaluator {
    exempt: Option<WorkerId>,
}

impl ComplianceEvaluator {
    /// Creates an evaluator; `exempt` names the worker that is never evaluated.
    #[must_use]
    pub fn new(exempt: Option<WorkerId>) -> Self {
        Self { exempt }
    }

    /// Returns the first forbidden tag assigned to `worker`, if any.
    pub fn evaluate(&self, worker: &WorkerDescriptor, catalog: &dyn TagCatalog) -> Evaluation {
        if self.exempt.as_ref() == Some(worker.id()) {
            trace!(worker = %worker.id(), "exempt worker, skipping evaluation");
            return Evaluation::Compliant;
        }

        let mut failures = Vec::new();
        for name in worker.tags() {
            match catalog.lookup(name) {
                Ok(Some(tag)) if tag.is_forbidden() => return Evaluation::Forbidden(tag),
                Ok(_) => {}
                Err(e) => failures.push(e),
            }
        }

        if failures.is_empty() {
            Evaluation::Compliant
        } else {
            Evaluation::LookupFailed(failures)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::model::WorkerKind;

    fn worker(id: &str, tags: &[&str]) -> WorkerDescriptor {
        WorkerDescriptor::new(id, WorkerKind::Persistent, tags.iter().copied())
    }

    #[test]
    fn allowed_tags_yield_compliant() {
        let catalog = MemoryCatalog::new();
        catalog.set_forbidden("linux", false);
        let eval = ComplianceEvaluator::default();

        assert_eq!(eval.evaluate(&worker("w", &["linux", "undefined"]), &catalog), Evaluation::Compliant);
        assert_eq!(eval.evaluate(&worker("w", &[]), &catalog), Evaluation::Compliant);
    }

    #[test]
    fn first_forbidden_tag_wins_and_is_stable() {
        let catalog = MemoryCatalog::new().with_forbidden(["zeta", "beta"]);
        let eval = ComplianceEvaluator::default();
        let w = worker("w", &["zeta", "alpha", "beta"]);

        let first = eval.evaluate(&w, &catalog);
        assert_eq!(first, Evaluation::Forbidden(Tag::forbidden("beta")));
        for _ in 0..10 {
            assert_eq!(eval.evaluate(&w, &catalog), first);
        }

        let tag = first.into_forbidden().unwrap();
        assert!(w.tags().contains(tag.name()));
    }

    #[test]
    fn exempt_worker_is_never_forbidden() {
        let catalog = MemoryCatalog::new().with_forbidden(["barfoo"]);
        let eval = ComplianceEvaluator::new(Some(WorkerId::from("controller")));

        assert_eq!(eval.evaluate(&worker("controller", &["barfoo"]), &catalog), Evaluation::Compliant);
        assert!(matches!(
            eval.evaluate(&worker("w1", &["barfoo"]), &catalog),
            Evaluation::Forbidden(_)
        ));
    }

    #[test]
    fn lookup_failure_is_distinct_and_fails_open() {
        let catalog = MemoryCatalog::new().with_forbidden(["barfoo"]);
        catalog.set_available(false);
        let eval = ComplianceEvaluator::default();

        let outcome = eval.evaluate(&worker("w", &["barfoo", "linux"]), &catalog);
        match &outcome {
            Evaluation::LookupFailed(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected lookup failure, got {other:?}"),
        }
        assert_eq!(outcome.into_forbidden(), None);
    }
}
