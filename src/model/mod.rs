//! # Data model shared by every component.
//!
//! - [`Tag`]: a capability label and its `forbidden` attribute
//! - [`WorkerId`], [`WorkerKind`], [`WorkerDescriptor`]: what the registry tells us about a worker
//! - [`WorkerStatus`], [`OfflineCause`], [`CauseOrigin`]: the worker's operational state
//! - [`Verdict`]: the cached result of the last evaluation

mod tag;
mod verdict;
mod worker;

pub use tag::Tag;
pub use verdict::Verdict;
pub use worker::{CauseOrigin, OfflineCause, WorkerDescriptor, WorkerId, WorkerKind, WorkerStatus};
