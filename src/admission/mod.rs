//! # Admission gate.
//!
//! Scheduler-side veto on task assignment, answered from the verdict cache only.

mod gate;

pub use gate::{Admission, AdmissionGate, Blockage};
