//! # Compliance monitoring.
//!
//! - [`ComplianceEvaluator`]: pure "which forbidden tag applies" rule
//! - [`MonitorEngine`]: verdict cache, synchronous evaluation and refresh requests
//! - `Refresher` (crate-private): the debounced background pass driven by the runtime

mod engine;
mod evaluator;
mod refresh;

pub use engine::{Assessment, LockedAssessment, MonitorEngine};
pub use evaluator::{ComplianceEvaluator, Evaluation};
pub(crate) use refresh::Refresher;
