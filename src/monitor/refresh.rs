//! # Debounced fleet refresh.
//!
//! [`RefreshState`] records refresh requests as monotonically increasing
//! generations and publishes the highest generation covered by a completed
//! pass on a `watch` channel. [`Refresher`] is the background loop that turns
//! requests into passes.
//!
//! ## Ordering guarantee
//! ```text
//! request()  : requested += 1 (generation g), wake refresher
//! refresher  : settle (debounce) ─► target = requested ─► pass ─► completed = max(completed, target)
//! waiter(g)  : wait until completed >= g
//! ```
//! `target` is read right before a pass starts, so a pass covering `g` always
//! started after request `g` was recorded: a burst of triggers is never
//! satisfied by a pass that began before the burst.
//!
//! ## Debounce
//! A pass starts once no trigger arrived for `debounce`, or once `max_debounce`
//! elapsed since the first trigger, or immediately when a waiter (pre-admission)
//! or the periodic scan marked the request urgent.
//!
//! ## Pass
//! ```text
//! registry.workers() ──► engine.retain(ids)
//!      │
//!      └─► for each id (bounded by semaphore, JoinSet):
//!              engine.evaluate_locked(id) ──► controller.reconcile(worker, verdict) ──► unlock
//! ```
//! A slow remediation on one worker only holds its own permit; other workers proceed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Notify, Semaphore, watch};
use tokio::task::JoinSet;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::engine::MonitorEngine;
use crate::config::Config;
use crate::enforcement::EnforcementController;
use crate::events::{Bus, Event, EventKind};
use crate::registry::WorkerRegistry;

/// Shared bookkeeping between refresh requesters and the refresh loop.
pub(crate) struct RefreshState {
    requested: AtomicU64,
    completed: watch::Sender<u64>,
    wake: Notify,
    urgent: AtomicBool,
    running: AtomicBool,
}

impl RefreshState {
    pub(crate) fn new() -> Self {
        let (completed, _rx) = watch::channel(0);
        Self {
            requested: AtomicU64::new(0),
            completed,
            wake: Notify::new(),
            urgent: AtomicBool::new(false),
            running: AtomicBool::new(false),
        }
    }

    /// Records a request and wakes the loop. Returns its generation.
    pub(crate) fn request(&self) -> u64 {
        let generation = self.bump();
        self.wake.notify_one();
        generation
    }

    /// Records a request that must not wait for the debounce window.
    pub(crate) fn request_urgent(&self) -> u64 {
        self.urgent.store(true, Ordering::SeqCst);
        self.request()
    }

    /// Cuts the debounce of the pending request short.
    pub(crate) fn expedite(&self) {
        self.urgent.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    pub(crate) fn requested(&self) -> u64 {
        self.requested.load(Ordering::SeqCst)
    }

    pub(crate) fn completed(&self) -> u64 {
        *self.completed.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<u64> {
        self.completed.subscribe()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    fn bump(&self) -> u64 {
        self.requested.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn take_urgent(&self) -> bool {
        self.urgent.swap(false, Ordering::SeqCst)
    }

    fn complete(&self, generation: u64) {
        self.completed.send_modify(|done| {
            if generation > *done {
                *done = generation;
            }
        });
    }
}

/// Background loop executing debounced and periodic refresh passes.
pub(crate) struct Refresher {
    engine: Arc<MonitorEngine>,
    controller: Arc<EnforcementController>,
    registry: Arc<dyn WorkerRegistry>,
    bus: Bus,
    debounce: Duration,
    debounce_cap: Option<Duration>,
    scan_period: Option<Duration>,
    semaphore: Option<Arc<Semaphore>>,
}

impl Refresher {
    pub(crate) fn new(
        cfg: &Config,
        engine: Arc<MonitorEngine>,
        controller: Arc<EnforcementController>,
        registry: Arc<dyn WorkerRegistry>,
        bus: Bus,
    ) -> Self {
        Self {
            engine,
            controller,
            registry,
            bus,
            debounce: cfg.debounce,
            debounce_cap: cfg.debounce_cap(),
            scan_period: cfg.scan_period(),
            semaphore: cfg
                .concurrency_limit()
                .map(Semaphore::new)
                .map(Arc::new),
        }
    }

    /// Runs until `token` is cancelled.
    ///
    /// The caller marks the state running before spawning this future so that
    /// waiters arriving right after start are not rejected.
    pub(crate) async fn run(self, token: CancellationToken) {
        let engine = Arc::clone(&self.engine);
        let state = engine.refresh_state();
        state.set_running(true);

        let mut ticker = self.scan_period.map(|period| {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = state.wake.notified() => {}
                _ = next_tick(&mut ticker) => {
                    state.urgent.store(true, Ordering::SeqCst);
                    state.bump();
                }
            }

            if !self.settle(state, &token).await {
                break;
            }

            let target = state.requested();
            if target <= state.completed() {
                continue;
            }
            if !self.run_pass(target, &token).await {
                break;
            }
            state.complete(target);
        }

        state.set_running(false);
        debug!("refresh loop stopped");
    }

    /// Waits for the debounce window to close. Returns false on cancellation.
    async fn settle(&self, state: &RefreshState, token: &CancellationToken) -> bool {
        let started = Instant::now();
        loop {
            if state.take_urgent() {
                return true;
            }
            let mut quiet = self.debounce;
            if let Some(cap) = self.debounce_cap {
                let left = cap.saturating_sub(started.elapsed());
                if left.is_zero() {
                    return true;
                }
                quiet = quiet.min(left);
            }

            let seen = state.requested();
            tokio::select! {
                _ = token.cancelled() => return false,
                _ = time::sleep(quiet) => {
                    if state.requested() == seen {
                        return true;
                    }
                }
                _ = state.wake.notified() => {}
            }
        }
    }

    /// Evaluates and reconciles every known worker. Returns false on cancellation.
    async fn run_pass(&self, target: u64, token: &CancellationToken) -> bool {
        self.bus
            .publish(Event::new(EventKind::RefreshStarted).with_generation(target));

        let ids = match self.registry.workers().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, generation = target, "cannot enumerate workers, skipping pass");
                self.bus
                    .publish(Event::new(EventKind::RegistryFailed).with_reason(e.to_string()));
                return true;
            }
        };
        self.engine.retain(&ids);

        let total = ids.len();
        let mut set = JoinSet::new();
        for id in ids {
            let permit = match &self.semaphore {
                Some(sem) => {
                    tokio::select! {
                        res = Arc::clone(sem).acquire_owned() => match res {
                            Ok(permit) => Some(permit),
                            Err(_closed) => break,
                        },
                        _ = token.cancelled() => {
                            set.abort_all();
                            info!(generation = target, "refresh pass interrupted by shutdown");
                            return false;
                        }
                    }
                }
                None => None,
            };

            let engine = Arc::clone(&self.engine);
            let controller = Arc::clone(&self.controller);
            set.spawn(async move {
                let _permit = permit;
                if let Some(held) = engine.evaluate_locked(&id).await {
                    controller.reconcile(&held.worker, &held.verdict).await;
                }
            });
        }

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    let pending = set.len();
                    set.abort_all();
                    info!(generation = target, pending, "refresh pass interrupted by shutdown");
                    return false;
                }
                next = set.join_next() => match next {
                    None => break,
                    Some(Err(e)) if e.is_panic() => {
                        warn!(generation = target, "worker evaluation panicked");
                    }
                    Some(_) => {}
                }
            }
        }

        self.bus.publish(
            Event::new(EventKind::RefreshCompleted)
                .with_generation(target)
                .with_count(total),
        );
        true
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
