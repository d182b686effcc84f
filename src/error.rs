//! Error types used by the labelwarden runtime and its collaborators.
//!
//! This module defines four error enums:
//!
//! - [`LookupError`]: a tag catalog lookup could not be answered.
//! - [`RegistryError`]: the worker registry failed to read or act on a worker.
//! - [`WardenError`]: errors raised by the runtime itself (refresh loop, shutdown).
//! - [`SubmitError`]: a lifecycle event could not be queued.
//!
//! Every type provides `as_label` (stable snake_case for logs/metrics).
//! None of these errors is ever allowed to block the host scheduler: callers
//! log them and fall back to "allow work".

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by a [`TagCatalog`](crate::TagCatalog) lookup.
///
/// A lookup failure is distinct from "tag not found": the evaluator reports it
/// separately so the engine can fail open and log it.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The catalog backend could not be reached or returned an error.
    #[error("catalog unavailable while looking up tag '{tag}': {reason}")]
    Unavailable {
        /// Tag that was being looked up.
        tag: String,
        /// Backend-specific reason.
        reason: String,
    },
}

impl LookupError {
    /// Shorthand for [`LookupError::Unavailable`].
    pub fn unavailable(tag: impl Into<String>, reason: impl Into<String>) -> Self {
        LookupError::Unavailable {
            tag: tag.into(),
            reason: reason.into(),
        }
    }

    /// Returns the tag whose lookup failed.
    pub fn tag(&self) -> &str {
        match self {
            LookupError::Unavailable { tag, .. } => tag,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use labelwarden::LookupError;
    ///
    /// let err = LookupError::unavailable("linux", "timeout");
    /// assert_eq!(err.as_label(), "lookup_unavailable");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LookupError::Unavailable { .. } => "lookup_unavailable",
        }
    }
}

/// # Errors produced by a [`WorkerRegistry`](crate::WorkerRegistry).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The registry has no worker with this id.
    #[error("unknown worker '{worker}'")]
    UnknownWorker {
        /// Requested worker id.
        worker: String,
    },

    /// The registry could not be reached (I/O, remote API down, ...).
    #[error("worker registry unavailable: {reason}")]
    Unavailable {
        /// Backend-specific reason.
        reason: String,
    },

    /// The registry refused the requested state transition.
    #[error("registry rejected operation on '{worker}': {reason}")]
    Rejected {
        /// Worker the operation targeted.
        worker: String,
        /// Backend-specific reason.
        reason: String,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::UnknownWorker { .. } => "registry_unknown_worker",
            RegistryError::Unavailable { .. } => "registry_unavailable",
            RegistryError::Rejected { .. } => "registry_rejected",
        }
    }

    /// True if the error means the worker simply does not exist (anymore).
    pub fn is_unknown_worker(&self) -> bool {
        matches!(self, RegistryError::UnknownWorker { .. })
    }
}

/// # Errors produced by the labelwarden runtime.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WardenError {
    /// The refresh loop is not running (not started yet, or shut down) so a
    /// fleet-wide refresh cannot be awaited.
    #[error("refresh loop is not running")]
    RefreshStopped,

    /// Background loops did not stop within the configured grace period.
    #[error("shutdown timeout {grace:?} exceeded; {stuck} background loop(s) still running")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Number of loops that were aborted.
        stuck: usize,
    },
}

impl WardenError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use labelwarden::WardenError;
    ///
    /// assert_eq!(WardenError::RefreshStopped.as_label(), "refresh_stopped");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WardenError::RefreshStopped => "refresh_stopped",
            WardenError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// Error returned by [`LifecycleHandle`](crate::LifecycleHandle) when an event cannot be queued.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// Lifecycle queue is full (try again later or use async `send`).
    #[error("lifecycle queue full")]
    Full,

    /// Lifecycle loop is gone (runtime shut down).
    #[error("lifecycle channel closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(
            RegistryError::UnknownWorker { worker: "w1".into() }.as_label(),
            "registry_unknown_worker"
        );
        assert_eq!(
            WardenError::GraceExceeded {
                grace: Duration::from_secs(1),
                stuck: 2
            }
            .as_label(),
            "runtime_grace_exceeded"
        );
    }

    #[test]
    fn lookup_error_names_the_tag() {
        let err = LookupError::unavailable("barfoo", "connection reset");
        assert_eq!(err.tag(), "barfoo");
        assert!(err.to_string().contains("barfoo"));
    }
}
