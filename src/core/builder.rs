use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::warden::{Parts, Warden};
use crate::{
    admission::AdmissionGate,
    catalog::TagCatalog,
    config::Config,
    enforcement::EnforcementController,
    events::Bus,
    lifecycle::LifecycleSynchronizer,
    model::WorkerId,
    monitor::{ComplianceEvaluator, MonitorEngine},
    registry::WorkerRegistry,
    subscribers::{Subscribe, SubscriberSet},
    toggle::EnforcementToggle,
};

/// Builder for constructing a [`Warden`] with optional features.
pub struct WardenBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    toggle: Option<EnforcementToggle>,
}

impl WardenBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            toggle: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (verdicts, enforcement, blocked
    /// assignments, refresh passes) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Shares an existing enforcement toggle (default: a fresh, enabled one).
    pub fn with_toggle(mut self, toggle: EnforcementToggle) -> Self {
        self.toggle = Some(toggle);
        self
    }

    /// Builds the runtime around the given collaborators.
    ///
    /// Must be called inside a tokio runtime (subscriber workers are spawned
    /// here). Background loops start with [`Warden::start`].
    pub fn build(
        self,
        catalog: Arc<dyn TagCatalog>,
        registry: Arc<dyn WorkerRegistry>,
    ) -> Arc<Warden> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let runtime_token = CancellationToken::new();
        let toggle = self.toggle.unwrap_or_default();

        let evaluator =
            ComplianceEvaluator::new(self.cfg.exempt_worker.as_deref().map(WorkerId::from));
        let engine = Arc::new(MonitorEngine::new(
            catalog,
            Arc::clone(&registry),
            evaluator,
            bus.clone(),
            runtime_token.clone(),
        ));
        let controller = Arc::new(EnforcementController::new(
            Arc::clone(&registry),
            toggle.clone(),
            bus.clone(),
            self.cfg.disconnect_wait(),
        ));
        let gate = AdmissionGate::new(Arc::clone(&engine), toggle.clone(), bus.clone());
        let synchronizer = Arc::new(LifecycleSynchronizer::new(
            Arc::clone(&engine),
            Arc::clone(&controller),
            Arc::clone(&registry),
            self.cfg.lifecycle_capacity_clamped(),
        ));

        Arc::new(Warden::from_parts(Parts {
            cfg: self.cfg,
            bus,
            subs,
            toggle,
            registry,
            engine,
            controller,
            gate,
            synchronizer,
            runtime_token,
        }))
    }
}
