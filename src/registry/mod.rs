//! # Worker registry collaborator.
//!
//! The registry owns workers and their lifecycle. The engine reads worker
//! descriptors and statuses through it and requests three transitions:
//! quarantine, clear-quarantine, disconnect.
//!
//! ## Contract
//! - Transitions are asynchronous at the infrastructure level; a returned
//!   `Ok(())` means the request was **accepted**, not that it completed.
//! - `quarantine` on an already quarantined worker replaces the cause.
//! - `clear_quarantine` on a worker that is not quarantined is a no-op.
//! - Unknown ids yield [`RegistryError::UnknownWorker`].

mod memory;

pub use memory::MemoryRegistry;

use async_trait::async_trait;

use crate::error::RegistryError;
use crate::model::{OfflineCause, WorkerDescriptor, WorkerId, WorkerStatus};

/// Access to the fleet's worker registry.
#[async_trait]
pub trait WorkerRegistry: Send + Sync + 'static {
    /// Ids of every known worker.
    async fn workers(&self) -> Result<Vec<WorkerId>, RegistryError>;

    /// Kind and assigned tags of a worker.
    async fn describe(&self, id: &WorkerId) -> Result<WorkerDescriptor, RegistryError>;

    /// Current operational status of a worker.
    async fn status(&self, id: &WorkerId) -> Result<WorkerStatus, RegistryError>;

    /// Marks a worker temporarily ineligible for work with a visible cause.
    async fn quarantine(&self, id: &WorkerId, cause: OfflineCause) -> Result<(), RegistryError>;

    /// Clears a quarantine, returning the worker to normal eligibility.
    async fn clear_quarantine(&self, id: &WorkerId) -> Result<(), RegistryError>;

    /// Requests teardown of a worker's connection; resolves once accepted.
    async fn disconnect(&self, id: &WorkerId, cause: OfflineCause) -> Result<(), RegistryError>;
}
