//! # Warden: owns the policy components, drives background loops, shuts down gracefully.
//!
//! The [`Warden`] owns the event bus, a [`SubscriberSet`], the
//! [`MonitorEngine`], [`EnforcementController`], [`AdmissionGate`] and
//! [`LifecycleSynchronizer`], the shared [`EnforcementToggle`] and the runtime
//! cancellation token.
//!
//! ## High-level architecture
//! ```text
//! start():
//!   subscriber_listener : Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   refresher           : triggers/scan ─► debounce ─► pass (evaluate + reconcile every worker)
//!   lifecycle loop      : LifecycleHandle ─► LifecycleSynchronizer::dispatch
//!   initial refresh     : schedule_refresh_all()
//!         (each loop runs on runtime_token.child_token(), all in one JoinSet)
//!
//! Host calls:
//!   can_assign(id)      ─► AdmissionGate (cache only)
//!   pre_admission(id)   ─► LifecycleSynchronizer::on_pre_admission (awaited)
//!   set_enforcement(b)  ─► toggle + EnforcementToggled + refresh
//!
//! Shutdown path:
//!   run(): signal::wait_for_termination() ─► shutdown()
//!   shutdown():
//!     └─► Bus.publish(ShutdownRequested)
//!     └─► runtime_token.cancel()  → pending wait_for_refresh() return RefreshStopped
//!     └─► join loops within cfg.grace, else abort + WardenError::GraceExceeded
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use labelwarden::{Admission, Config, MemoryCatalog, MemoryRegistry, Warden, WorkerId, WorkerKind};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = Arc::new(MemoryCatalog::new().with_forbidden(["barfoo"]));
//!     let registry = Arc::new(MemoryRegistry::new());
//!     registry.add("w1", WorkerKind::Persistent, ["barfoo"]);
//!
//!     let warden = Warden::builder(Config::default()).build(catalog, registry.clone());
//!     warden.start();
//!
//!     let w1 = WorkerId::from("w1");
//!     warden.pre_admission(&w1).await;
//!     assert!(matches!(warden.can_assign(&w1), Admission::Block(_)));
//!     assert!(registry.status_of("w1").unwrap().is_policy_quarantine());
//!
//!     warden.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{builder::WardenBuilder, signal};
use crate::{
    admission::{Admission, AdmissionGate},
    config::Config,
    enforcement::EnforcementController,
    error::WardenError,
    events::{Bus, Event, EventKind},
    lifecycle::{LifecycleHandle, LifecycleSynchronizer, PolicySummary},
    model::{Verdict, WorkerId},
    monitor::{MonitorEngine, Refresher},
    registry::WorkerRegistry,
    subscribers::SubscriberSet,
    toggle::EnforcementToggle,
};

/// Components handed over by the builder.
pub(super) struct Parts {
    pub(super) cfg: Config,
    pub(super) bus: Bus,
    pub(super) subs: Arc<SubscriberSet>,
    pub(super) toggle: EnforcementToggle,
    pub(super) registry: Arc<dyn WorkerRegistry>,
    pub(super) engine: Arc<MonitorEngine>,
    pub(super) controller: Arc<EnforcementController>,
    pub(super) gate: AdmissionGate,
    pub(super) synchronizer: Arc<LifecycleSynchronizer>,
    pub(super) runtime_token: CancellationToken,
}

/// Forbidden-tag policy runtime for a worker fleet.
pub struct Warden {
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    toggle: EnforcementToggle,
    registry: Arc<dyn WorkerRegistry>,
    engine: Arc<MonitorEngine>,
    controller: Arc<EnforcementController>,
    gate: AdmissionGate,
    synchronizer: Arc<LifecycleSynchronizer>,
    runtime_token: CancellationToken,
    loops: Mutex<Option<JoinSet<()>>>,
}

impl Warden {
    /// Creates a builder for a `Warden`.
    pub fn builder(cfg: Config) -> WardenBuilder {
        WardenBuilder::new(cfg)
    }

    pub(super) fn from_parts(parts: Parts) -> Self {
        Self {
            cfg: parts.cfg,
            bus: parts.bus,
            subs: parts.subs,
            toggle: parts.toggle,
            registry: parts.registry,
            engine: parts.engine,
            controller: parts.controller,
            gate: parts.gate,
            synchronizer: parts.synchronizer,
            runtime_token: parts.runtime_token,
            loops: Mutex::new(None),
        }
    }

    /// Spawns the background loops and schedules the initial fleet refresh.
    ///
    /// Must be called inside a tokio runtime. Calling it again is a no-op.
    pub fn start(&self) {
        let mut loops = self.loops.lock().unwrap_or_else(PoisonError::into_inner);
        if loops.is_some() || self.runtime_token.is_cancelled() {
            warn!("warden already started");
            return;
        }

        let mut set = JoinSet::new();
        self.subscriber_listener(&mut set);

        self.engine.refresh_state().set_running(true);
        let refresher = Refresher::new(
            &self.cfg,
            Arc::clone(&self.engine),
            Arc::clone(&self.controller),
            Arc::clone(&self.registry),
            self.bus.clone(),
        );
        set.spawn(refresher.run(self.runtime_token.child_token()));

        let synchronizer = Arc::clone(&self.synchronizer);
        let token = self.runtime_token.child_token();
        set.spawn(async move { synchronizer.run(token).await });

        *loops = Some(set);
        drop(loops);

        self.engine.schedule_refresh_all();
        info!(
            enforcement = self.toggle.is_enabled(),
            subscribers = self.subs.len(),
            "warden started"
        );
    }

    /// Starts (if needed), waits for a termination signal, then shuts down.
    pub async fn run(&self) -> Result<(), WardenError> {
        self.start();
        match signal::wait_for_termination().await {
            Ok(received) => info!(signal = %received, "termination requested"),
            Err(e) => warn!(error = %e, "cannot listen for termination signals, shutting down"),
        }
        self.shutdown().await
    }

    /// Cancels every background loop and waits up to [`Config::grace`].
    ///
    /// Loops still running after the grace period are aborted and reported as
    /// [`WardenError::GraceExceeded`].
    pub async fn shutdown(&self) -> Result<(), WardenError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.runtime_token.cancel();

        let taken = self
            .loops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut set) = taken else {
            return Ok(());
        };

        let grace = self.cfg.grace;
        let done = async { while set.join_next().await.is_some() {} };
        match tokio::time::timeout(grace, done).await {
            Ok(()) => {
                info!("warden stopped");
                Ok(())
            }
            Err(_) => {
                let stuck = set.len();
                set.abort_all();
                warn!(?grace, stuck, "background loops did not stop in time");
                Err(WardenError::GraceExceeded { grace, stuck })
            }
        }
    }

    /// Scheduler hook: may `worker` receive a task right now?
    pub fn can_assign(&self, worker: &WorkerId) -> Admission {
        self.gate.can_assign(worker)
    }

    /// Host hook called before a worker becomes schedulable.
    ///
    /// See [`LifecycleSynchronizer::on_pre_admission`].
    pub async fn pre_admission(&self, worker: &WorkerId) -> Option<Verdict> {
        self.synchronizer.on_pre_admission(worker).await
    }

    /// Enables or disables enforcement and schedules a fleet refresh.
    ///
    /// Returns the previous state.
    pub fn set_enforcement(&self, enabled: bool) -> bool {
        let previous = self.toggle.set(enabled);
        if previous != enabled {
            let state = if enabled { "enabled" } else { "disabled" };
            info!(state, "enforcement toggled");
            self.bus
                .publish(Event::new(EventKind::EnforcementToggled).with_reason(state));
            self.synchronizer.on_policy_toggled(enabled);
        }
        previous
    }

    /// True if enforcement is currently enabled.
    pub fn enforcement_enabled(&self) -> bool {
        self.toggle.is_enabled()
    }

    /// Handle for queueing lifecycle events.
    pub fn lifecycle(&self) -> LifecycleHandle {
        self.synchronizer.handle()
    }

    /// Last derived fleet policy summary.
    pub fn policy_summary(&self) -> PolicySummary {
        self.synchronizer.policy_summary()
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Event bus (subscribe for raw events).
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Shared enforcement toggle.
    pub fn toggle(&self) -> &EnforcementToggle {
        &self.toggle
    }

    /// Verdict cache and refresh requests.
    pub fn engine(&self) -> &Arc<MonitorEngine> {
        &self.engine
    }

    /// Enforcement controller.
    pub fn controller(&self) -> &Arc<EnforcementController> {
        &self.controller
    }

    /// Admission gate.
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Lifecycle synchronizer.
    pub fn synchronizer(&self) -> &Arc<LifecycleSynchronizer> {
        &self.synchronizer
    }

    /// Forwards bus events to the subscriber set until shutdown.
    fn subscriber_listener(&self, set: &mut JoinSet<()>) {
        if self.subs.is_empty() {
            return;
        }
        let mut rx = self.bus.subscribe();
        let subs = Arc::clone(&self.subs);
        let token = self.runtime_token.child_token();
        set.spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(ev) => subs.emit(&ev),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "subscriber listener lagged, events dropped");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        });
    }
}
