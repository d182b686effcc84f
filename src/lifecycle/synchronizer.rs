use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{LifecycleEvent, LifecycleHandle, PolicySummary};
use crate::enforcement::{Action, EnforcementController};
use crate::model::{Verdict, WorkerId};
use crate::monitor::MonitorEngine;
use crate::registry::WorkerRegistry;

/// Reacts to worker lifecycle transitions by evaluating and enforcing.
///
/// Every `on_*` method can be called directly; the same transitions can be
/// queued through [`handle`](Self::handle) and are then dispatched by the
/// synchronizer loop the runtime spawns.
pub struct LifecycleSynchronizer {
    engine: Arc<MonitorEngine>,
    controller: Arc<EnforcementController>,
    registry: Arc<dyn WorkerRegistry>,
    summary: RwLock<PolicySummary>,

    tx: mpsc::Sender<LifecycleEvent>,
    rx: Mutex<Option<mpsc::Receiver<LifecycleEvent>>>,
}

impl LifecycleSynchronizer {
    /// Creates a synchronizer with a lifecycle queue of `queue_capacity` (min 1).
    pub fn new(
        engine: Arc<MonitorEngine>,
        controller: Arc<EnforcementController>,
        registry: Arc<dyn WorkerRegistry>,
        queue_capacity: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        Self {
            engine,
            controller,
            registry,
            summary: RwLock::new(PolicySummary::default()),
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Returns a handle for queueing lifecycle events.
    pub fn handle(&self) -> LifecycleHandle {
        LifecycleHandle {
            tx: self.tx.clone(),
        }
    }

    /// Worker is about to become schedulable.
    ///
    /// Joins the fleet refresh (if the refresh loop is unavailable the worker is
    /// evaluated alone), evaluates the worker and reconciles it before
    /// returning, so the worker is never admitted with a stale verdict.
    /// Returns `None` when the worker could not be evaluated.
    pub async fn on_pre_admission(&self, id: &WorkerId) -> Option<Verdict> {
        if let Err(e) = self.engine.wait_for_refresh().await {
            debug!(worker = %id, error = %e, "fleet refresh unavailable, evaluating worker alone");
        }
        let held = self.engine.evaluate_locked(id).await?;
        self.controller.reconcile(&held.worker, &held.verdict).await;
        Some(held.into_assessment().verdict)
    }

    /// Worker became reachable: enforce if it is non-compliant.
    ///
    /// A compliant worker still sitting in a policy quarantine is restored;
    /// any other compliant worker is left alone.
    pub async fn on_reachable(&self, id: &WorkerId) -> Action {
        let Some(held) = self.engine.evaluate_locked(id).await else {
            return Action::None;
        };
        self.controller.reconcile(&held.worker, &held.verdict).await
    }

    /// Fleet configuration changed. Returns the refresh generation.
    pub fn on_configuration_changed(&self) -> u64 {
        self.engine.schedule_refresh_all()
    }

    /// Worker lost its connection.
    pub fn on_went_offline(&self, id: &WorkerId) -> u64 {
        debug!(worker = %id, "worker went offline");
        self.engine.schedule_refresh_all()
    }

    /// Worker connection came back.
    pub fn on_came_online(&self, id: &WorkerId) -> u64 {
        debug!(worker = %id, "worker came online");
        self.engine.schedule_refresh_all()
    }

    /// Worker marked temporarily ineligible.
    pub fn on_temporarily_offline(&self, id: &WorkerId) -> u64 {
        debug!(worker = %id, "worker temporarily offline");
        self.engine.schedule_refresh_all()
    }

    /// Worker eligibility restored; also re-derives the policy summary.
    pub async fn on_temporarily_online(&self, id: &WorkerId) -> PolicySummary {
        debug!(worker = %id, "worker temporarily online");
        self.engine.schedule_refresh_all();
        self.refresh_policy_summary().await
    }

    /// Enforcement toggle changed.
    pub fn on_policy_toggled(&self, enabled: bool) -> u64 {
        debug!(enabled, "enforcement toggled");
        self.engine.schedule_refresh_all()
    }

    /// Last derived policy summary.
    pub fn policy_summary(&self) -> PolicySummary {
        self.summary
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-derives the policy summary from registry statuses.
    ///
    /// On registry failure the previous summary is kept and returned.
    pub async fn refresh_policy_summary(&self) -> PolicySummary {
        let ids = match self.registry.workers().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "cannot enumerate workers, keeping previous policy summary");
                return self.policy_summary();
            }
        };

        let mut quarantined = Vec::new();
        for id in ids {
            match self.registry.status(&id).await {
                Ok(status) if status.is_policy_quarantine() => quarantined.push(id),
                Ok(_) => {}
                Err(e) if e.is_unknown_worker() => {}
                Err(e) => {
                    warn!(worker = %id, error = %e, "cannot read worker status, keeping previous policy summary");
                    return self.policy_summary();
                }
            }
        }
        quarantined.sort_unstable();

        let summary = PolicySummary { quarantined };
        *self.summary.write().unwrap_or_else(PoisonError::into_inner) = summary.clone();
        summary
    }

    /// Dispatches one lifecycle event to the matching `on_*` method.
    pub async fn dispatch(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::BecameReachable(id) => {
                self.on_reachable(&id).await;
            }
            LifecycleEvent::ConfigurationChanged => {
                self.on_configuration_changed();
            }
            LifecycleEvent::WentOffline(id) => {
                self.on_went_offline(&id);
            }
            LifecycleEvent::CameOnline(id) => {
                self.on_came_online(&id);
            }
            LifecycleEvent::TemporarilyOffline(id) => {
                self.on_temporarily_offline(&id);
            }
            LifecycleEvent::TemporarilyOnline(id) => {
                self.on_temporarily_online(&id).await;
            }
            LifecycleEvent::PolicyToggled { enabled } => {
                self.on_policy_toggled(enabled);
            }
        }
    }

    /// Processes queued events in arrival order until `token` is cancelled.
    pub(crate) async fn run(&self, token: CancellationToken) {
        let Some(mut rx) = self.rx.lock().await.take() else {
            warn!("lifecycle loop already running");
            return;
        };

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                next = rx.recv() => match next {
                    Some(event) => {
                        debug!(event = event.as_label(), "lifecycle event");
                        self.dispatch(event).await;
                    }
                    None => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::admission::AdmissionGate;
    use crate::catalog::MemoryCatalog;
    use crate::error::RegistryError;
    use crate::events::Bus;
    use crate::model::{OfflineCause, WorkerDescriptor, WorkerKind, WorkerStatus};
    use crate::monitor::ComplianceEvaluator;
    use crate::registry::MemoryRegistry;
    use crate::toggle::EnforcementToggle;

    fn synchronizer(registry: Arc<MemoryRegistry>) -> LifecycleSynchronizer {
        parts(registry).0
    }

    /// Builds a synchronizer over `registry` plus a gate sharing its engine.
    fn parts(registry: Arc<dyn WorkerRegistry>) -> (LifecycleSynchronizer, AdmissionGate) {
        let catalog = Arc::new(MemoryCatalog::new().with_forbidden(["barfoo"]));
        let bus = Bus::new(64);
        let engine = Arc::new(MonitorEngine::new(
            catalog,
            registry.clone(),
            ComplianceEvaluator::default(),
            bus.clone(),
            CancellationToken::new(),
        ));
        let toggle = EnforcementToggle::default();
        let controller = Arc::new(EnforcementController::new(
            registry.clone(),
            toggle.clone(),
            bus.clone(),
            Some(Duration::from_secs(1)),
        ));
        let gate = AdmissionGate::new(engine.clone(), toggle, bus);
        (LifecycleSynchronizer::new(engine, controller, registry, 8), gate)
    }

    /// Registry whose first status read stalls, signalling when it starts.
    struct StallFirstStatus {
        inner: Arc<MemoryRegistry>,
        stalled: AtomicBool,
        entered: Notify,
    }

    #[async_trait]
    impl WorkerRegistry for StallFirstStatus {
        async fn workers(&self) -> Result<Vec<WorkerId>, RegistryError> {
            self.inner.workers().await
        }

        async fn describe(&self, id: &WorkerId) -> Result<WorkerDescriptor, RegistryError> {
            self.inner.describe(id).await
        }

        async fn status(&self, id: &WorkerId) -> Result<WorkerStatus, RegistryError> {
            if !self.stalled.swap(true, Ordering::SeqCst) {
                self.entered.notify_one();
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            self.inner.status(id).await
        }

        async fn quarantine(&self, id: &WorkerId, cause: OfflineCause) -> Result<(), RegistryError> {
            self.inner.quarantine(id, cause).await
        }

        async fn clear_quarantine(&self, id: &WorkerId) -> Result<(), RegistryError> {
            self.inner.clear_quarantine(id).await
        }

        async fn disconnect(&self, id: &WorkerId, cause: OfflineCause) -> Result<(), RegistryError> {
            self.inner.disconnect(id, cause).await
        }
    }

    #[tokio::test]
    async fn pre_admission_enforces_before_returning() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.add("w2", WorkerKind::Ephemeral, ["barfoo"]);
        let sync = synchronizer(registry.clone());

        let verdict = sync.on_pre_admission(&WorkerId::from("w2")).await.unwrap();
        assert!(!verdict.is_compliant());
        assert!(registry.status_of("w2").unwrap().is_policy_disconnect());
    }

    #[tokio::test]
    async fn reachable_compliant_worker_is_left_alone() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.add("w1", WorkerKind::Persistent, ["linux"]);
        registry.set_status("w1", WorkerStatus::Online).unwrap();
        let sync = synchronizer(registry.clone());

        assert_eq!(sync.on_reachable(&WorkerId::from("w1")).await, Action::None);
        assert_eq!(registry.status_of("w1"), Some(WorkerStatus::Online));
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_reachable_calls_end_consistent() {
        let memory = Arc::new(MemoryRegistry::new());
        memory.add("w1", WorkerKind::Persistent, ["barfoo"]);
        memory.set_status("w1", WorkerStatus::Online).unwrap();
        let stalling = Arc::new(StallFirstStatus {
            inner: memory.clone(),
            stalled: AtomicBool::new(false),
            entered: Notify::new(),
        });
        let (sync, gate) = parts(stalling.clone());
        let sync = Arc::new(sync);
        let w1 = WorkerId::from("w1");

        let first = {
            let sync = sync.clone();
            let w1 = w1.clone();
            tokio::spawn(async move { sync.on_reachable(&w1).await })
        };
        stalling.entered.notified().await;

        memory.set_tags("w1", ["linux"]).unwrap();
        let second = sync.on_reachable(&w1).await;
        let first = first.await.unwrap();

        assert_eq!(first, Action::Quarantined);
        assert_eq!(second, Action::Restored);
        assert!(sync.engine.cached(&w1).unwrap().is_compliant());
        assert!(!memory.status_of("w1").unwrap().is_policy_quarantine());
        assert!(gate.can_assign(&w1).is_allowed());
    }

    #[tokio::test]
    async fn summary_lists_only_policy_quarantines() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.add("w1", WorkerKind::Persistent, ["barfoo"]);
        registry.add("w2", WorkerKind::Persistent, ["linux"]);
        registry
            .set_status("w2", WorkerStatus::Quarantined(OfflineCause::other("maintenance")))
            .unwrap();
        let sync = synchronizer(registry.clone());
        assert!(!sync.policy_summary().any());

        sync.on_reachable(&WorkerId::from("w1")).await;
        let summary = sync.on_temporarily_online(&WorkerId::from("w2")).await;

        assert_eq!(summary.quarantined, vec![WorkerId::from("w1")]);
        assert!(summary.contains(&WorkerId::from("w1")));
        assert_eq!(sync.policy_summary(), summary);
    }

    #[tokio::test]
    async fn queued_events_are_dispatched() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.add("w1", WorkerKind::Persistent, ["barfoo"]);
        let sync = Arc::new(synchronizer(registry.clone()));
        let token = CancellationToken::new();

        let looped = {
            let sync = sync.clone();
            let token = token.clone();
            tokio::spawn(async move { sync.run(token).await })
        };
        sync.handle()
            .send(LifecycleEvent::BecameReachable(WorkerId::from("w1")))
            .await
            .unwrap();

        for _ in 0..100 {
            if registry.quarantine_calls("w1") == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(registry.status_of("w1").unwrap().is_policy_quarantine());

        token.cancel();
        looped.await.unwrap();
    }
}
