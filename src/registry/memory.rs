//! In-memory [`WorkerRegistry`] used by tests and embedders without infrastructure.
//!
//! Besides the trait operations it exposes host-side controls (add/remove
//! workers, edit tags, drive status transitions) and failure injection
//! (registry outage, slow disconnect acceptance). Every transition request is
//! counted per worker so idempotence can be asserted.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use super::WorkerRegistry;
use crate::error::RegistryError;
use crate::model::{OfflineCause, WorkerDescriptor, WorkerId, WorkerKind, WorkerStatus};

struct Entry {
    kind: WorkerKind,
    tags: BTreeSet<String>,
    status: WorkerStatus,
    quarantine_calls: usize,
    disconnect_calls: usize,
}

/// Worker registry held in memory.
pub struct MemoryRegistry {
    workers: RwLock<HashMap<WorkerId, Entry>>,
    available: AtomicBool,
    disconnect_delay: RwLock<Option<Duration>>,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            workers: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            disconnect_delay: RwLock::new(None),
        }
    }

    /// Registers a worker in `Offline` state (launched but not reachable yet).
    pub fn add<I, S>(&self, id: impl Into<WorkerId>, kind: WorkerKind, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = Entry {
            kind,
            tags: tags.into_iter().map(Into::into).collect(),
            status: WorkerStatus::Offline,
            quarantine_calls: 0,
            disconnect_calls: 0,
        };
        self.write().insert(id.into(), entry);
    }

    /// Removes a worker. Returns true if it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.write().remove(id).is_some()
    }

    /// Replaces the tag set of a worker.
    pub fn set_tags<I, S>(&self, id: &str, tags: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut workers = self.write();
        let entry = workers.get_mut(id).ok_or_else(|| unknown(id))?;
        entry.tags = tags.into_iter().map(Into::into).collect();
        Ok(())
    }

    /// Host-side status transition (e.g. the worker connected or dropped).
    pub fn set_status(&self, id: &str, status: WorkerStatus) -> Result<(), RegistryError> {
        let mut workers = self.write();
        let entry = workers.get_mut(id).ok_or_else(|| unknown(id))?;
        entry.status = status;
        Ok(())
    }

    /// Current status without going through the async trait.
    #[must_use]
    pub fn status_of(&self, id: &str) -> Option<WorkerStatus> {
        self.read().get(id).map(|e| e.status.clone())
    }

    /// Number of quarantine requests the registry received for a worker.
    #[must_use]
    pub fn quarantine_calls(&self, id: &str) -> usize {
        self.read().get(id).map_or(0, |e| e.quarantine_calls)
    }

    /// Number of disconnect requests the registry received for a worker.
    #[must_use]
    pub fn disconnect_calls(&self, id: &str) -> usize {
        self.read().get(id).map_or(0, |e| e.disconnect_calls)
    }

    /// Switches the registry into (or out of) a failing state.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delays acceptance of every disconnect request by `delay`.
    pub fn set_disconnect_delay(&self, delay: Option<Duration>) {
        *self
            .disconnect_delay
            .write()
            .unwrap_or_else(PoisonError::into_inner) = delay;
    }

    fn ensure_available(&self) -> Result<(), RegistryError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RegistryError::Unavailable {
                reason: "registry offline".to_string(),
            })
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<WorkerId, Entry>> {
        self.workers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<WorkerId, Entry>> {
        self.workers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn unknown(id: &str) -> RegistryError {
    RegistryError::UnknownWorker {
        worker: id.to_string(),
    }
}

#[async_trait]
impl WorkerRegistry for MemoryRegistry {
    async fn workers(&self) -> Result<Vec<WorkerId>, RegistryError> {
        self.ensure_available()?;
        let mut ids: Vec<WorkerId> = self.read().keys().cloned().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn describe(&self, id: &WorkerId) -> Result<WorkerDescriptor, RegistryError> {
        self.ensure_available()?;
        let workers = self.read();
        let entry = workers.get(id).ok_or_else(|| unknown(id.as_str()))?;
        Ok(WorkerDescriptor::new(
            id.clone(),
            entry.kind,
            entry.tags.iter().cloned(),
        ))
    }

    async fn status(&self, id: &WorkerId) -> Result<WorkerStatus, RegistryError> {
        self.ensure_available()?;
        self.status_of(id.as_str())
            .ok_or_else(|| unknown(id.as_str()))
    }

    async fn quarantine(&self, id: &WorkerId, cause: OfflineCause) -> Result<(), RegistryError> {
        self.ensure_available()?;
        let mut workers = self.write();
        let entry = workers.get_mut(id).ok_or_else(|| unknown(id.as_str()))?;
        entry.quarantine_calls += 1;
        entry.status = WorkerStatus::Quarantined(cause);
        Ok(())
    }

    async fn clear_quarantine(&self, id: &WorkerId) -> Result<(), RegistryError> {
        self.ensure_available()?;
        let mut workers = self.write();
        let entry = workers.get_mut(id).ok_or_else(|| unknown(id.as_str()))?;
        if matches!(entry.status, WorkerStatus::Quarantined(_)) {
            entry.status = WorkerStatus::Online;
        }
        Ok(())
    }

    async fn disconnect(&self, id: &WorkerId, cause: OfflineCause) -> Result<(), RegistryError> {
        self.ensure_available()?;
        let delay = *self
            .disconnect_delay
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut workers = self.write();
        let entry = workers.get_mut(id).ok_or_else(|| unknown(id.as_str()))?;
        entry.disconnect_calls += 1;
        entry.status = WorkerStatus::Disconnected(cause);
        Ok(())
    }
}
