//! # Enforcement of verdicts on workers.
//!
//! [`EnforcementController`] turns a cached [`Verdict`](crate::Verdict) into a
//! registry transition: quarantine for persistent workers, disconnect for
//! ephemeral ones, and clearing of quarantines this subsystem placed once the
//! worker is compliant again.

mod cause;
mod controller;

pub use cause::{disconnect_cause, quarantine_cause};
pub use controller::{Action, EnforcementController};
