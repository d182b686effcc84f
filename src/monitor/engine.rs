//! # MonitorEngine: verdict cache and evaluation entry points.
//!
//! The engine evaluates workers through the [`ComplianceEvaluator`] and owns
//! the per-worker [`Verdict`] cache read by the admission gate.
//!
//! ## Architecture
//! ```text
//! evaluate_sync(id)   ──► per-worker lock ──► registry.describe(id)
//! evaluate_locked(id) ──┘ (lock handed back to the caller for enforcement)
//!                                              │
//!                                              ▼
//!                               ComplianceEvaluator::evaluate(worker, catalog)
//!                                              │
//!                                              ▼
//!                        verdicts[id] = Verdict (whole overwrite) ──► VerdictComputed
//!
//! schedule_refresh_all() ──► RefreshState.request() ──► Refresher (debounce) ──► pass
//! wait_for_refresh()     ──► join pending/in-flight pass, or request an urgent one
//! cached(id)             ──► read lock only (no I/O, no await)
//! ```
//!
//! ## Rules
//! - Evaluations of the same worker are mutually exclusive; distinct workers run in parallel.
//! - Callers that enforce a verdict use `evaluate_locked` and keep the returned
//!   [`LockedAssessment`] alive until the registry transition is done, so a newer
//!   evaluation of the same worker cannot slip in between.
//! - A verdict is written only after the evaluation completed: dropping an
//!   `evaluate_sync` future (caller interruption) leaves the previous verdict intact.
//! - Registry failures keep the previous verdict (fail-open); unknown workers are
//!   logged, dropped from the cache and skipped.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::evaluator::{ComplianceEvaluator, Evaluation};
use super::refresh::RefreshState;
use crate::catalog::TagCatalog;
use crate::error::WardenError;
use crate::events::{Bus, Event, EventKind};
use crate::model::{Verdict, WorkerDescriptor, WorkerId};
use crate::registry::WorkerRegistry;

/// Result of a synchronous evaluation: the worker as read and its fresh verdict.
#[derive(Clone, Debug)]
pub struct Assessment {
    /// Worker snapshot the verdict was computed from.
    pub worker: WorkerDescriptor,
    /// Freshly cached verdict.
    pub verdict: Verdict,
}

/// An [`Assessment`] whose worker stays locked against re-evaluation until dropped.
pub struct LockedAssessment {
    assessment: Assessment,
    _guard: OwnedMutexGuard<()>,
}

impl LockedAssessment {
    /// Releases the worker lock and returns the assessment.
    pub fn into_assessment(self) -> Assessment {
        self.assessment
    }
}

impl std::ops::Deref for LockedAssessment {
    type Target = Assessment;

    fn deref(&self) -> &Assessment {
        &self.assessment
    }
}

/// Fleet-wide evaluator holding the last verdict of every known worker.
pub struct MonitorEngine {
    catalog: Arc<dyn TagCatalog>,
    registry: Arc<dyn WorkerRegistry>,
    evaluator: ComplianceEvaluator,
    verdicts: RwLock<HashMap<WorkerId, Verdict>>,
    locks: Mutex<HashMap<WorkerId, Arc<tokio::sync::Mutex<()>>>>,
    refresh: RefreshState,
    bus: Bus,
    token: CancellationToken,
}

impl MonitorEngine {
    /// Creates an engine. `token` is the runtime token: once cancelled, pending
    /// [`wait_for_refresh`](Self::wait_for_refresh) calls return
    /// [`WardenError::RefreshStopped`].
    pub fn new(
        catalog: Arc<dyn TagCatalog>,
        registry: Arc<dyn WorkerRegistry>,
        evaluator: ComplianceEvaluator,
        bus: Bus,
        token: CancellationToken,
    ) -> Self {
        Self {
            catalog,
            registry,
            evaluator,
            verdicts: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
            refresh: RefreshState::new(),
            bus,
            token,
        }
    }

    /// Evaluates one worker now, caches and returns its verdict.
    ///
    /// Returns `None` when the worker is unknown or the registry failed; in the
    /// latter case the previously cached verdict (if any) is left untouched.
    pub async fn evaluate_sync(&self, id: &WorkerId) -> Option<Assessment> {
        self.evaluate_locked(id)
            .await
            .map(LockedAssessment::into_assessment)
    }

    /// Like [`evaluate_sync`](Self::evaluate_sync), but keeps the worker locked
    /// until the returned value is dropped.
    ///
    /// Enforcement must run while the lock is held: the verdict it acts on is
    /// then still the cached one when the registry transition lands.
    pub async fn evaluate_locked(&self, id: &WorkerId) -> Option<LockedAssessment> {
        let guard = self.worker_lock(id).lock_owned().await;
        let assessment = self.assess(id).await?;
        Some(LockedAssessment {
            assessment,
            _guard: guard,
        })
    }

    async fn assess(&self, id: &WorkerId) -> Option<Assessment> {
        let worker = match self.registry.describe(id).await {
            Ok(worker) => worker,
            Err(e) if e.is_unknown_worker() => {
                debug!(worker = %id, "evaluation requested for unknown worker, skipping");
                self.write_verdicts().remove(id);
                return None;
            }
            Err(e) => {
                warn!(worker = %id, error = %e, "cannot read worker, keeping previous verdict");
                return None;
            }
        };

        let evaluation = self.evaluator.evaluate(&worker, self.catalog.as_ref());
        if let Evaluation::LookupFailed(errors) = &evaluation {
            for e in errors {
                warn!(worker = %id, tag = e.tag(), error = %e, "tag lookup failed, treating tag as allowed");
                self.bus.publish(
                    Event::new(EventKind::LookupFailed)
                        .with_worker(id.as_str())
                        .with_tag(e.tag())
                        .with_reason(e.to_string()),
                );
            }
        }

        let verdict = Verdict::new(evaluation.into_forbidden());
        self.write_verdicts().insert(id.clone(), verdict.clone());

        let mut ev = Event::new(EventKind::VerdictComputed).with_worker(id.as_str());
        if let Some(tag) = verdict.forbidden_tag() {
            debug!(worker = %id, tag = %tag, "worker carries a forbidden tag");
            ev = ev.with_tag(tag.name());
        }
        self.bus.publish(ev);

        Some(Assessment { worker, verdict })
    }

    /// Last cached verdict of a worker. Never blocks on evaluation, never does I/O.
    pub fn cached(&self, id: &WorkerId) -> Option<Verdict> {
        self.verdicts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Sorted snapshot of every cached verdict.
    pub fn snapshot(&self) -> Vec<(WorkerId, Verdict)> {
        let verdicts = self.verdicts.read().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<(WorkerId, Verdict)> = verdicts
            .iter()
            .map(|(id, v)| (id.clone(), v.clone()))
            .collect();
        all.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Drops cached state of workers that are no longer in `known`.
    pub fn retain(&self, known: &[WorkerId]) {
        let known: HashSet<&WorkerId> = known.iter().collect();
        self.write_verdicts().retain(|id, _| known.contains(id));
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|id, lock| known.contains(id) || Arc::strong_count(lock) > 1);
    }

    /// Requests an asynchronous re-evaluation of the whole fleet.
    ///
    /// Calls within the debounce window coalesce into one pass. Returns the
    /// request generation, to be used with [`wait_for_generation`](Self::wait_for_generation).
    pub fn schedule_refresh_all(&self) -> u64 {
        let generation = self.refresh.request();
        self.bus
            .publish(Event::new(EventKind::RefreshScheduled).with_generation(generation));
        generation
    }

    /// Waits until the whole fleet has a fresh verdict.
    ///
    /// Joins the pending or in-flight pass if there is one (cutting its debounce
    /// short); otherwise requests an immediate pass. Never starts a redundant pass.
    pub async fn wait_for_refresh(&self) -> Result<u64, WardenError> {
        if !self.refresh.is_running() || self.token.is_cancelled() {
            return Err(WardenError::RefreshStopped);
        }
        let requested = self.refresh.requested();
        let target = if requested > self.refresh.completed() {
            self.refresh.expedite();
            requested
        } else {
            let generation = self.refresh.request_urgent();
            self.bus
                .publish(Event::new(EventKind::RefreshScheduled).with_generation(generation));
            generation
        };
        self.wait_for_generation(target).await
    }

    /// Waits until a pass covering request `generation` has completed.
    pub async fn wait_for_generation(&self, generation: u64) -> Result<u64, WardenError> {
        let mut rx = self.refresh.subscribe();
        tokio::select! {
            res = rx.wait_for(|done| *done >= generation) => {
                if res.is_ok() {
                    Ok(generation)
                } else {
                    Err(WardenError::RefreshStopped)
                }
            }
            _ = self.token.cancelled() => Err(WardenError::RefreshStopped),
        }
    }

    pub(crate) fn refresh_state(&self) -> &RefreshState {
        &self.refresh
    }

    fn worker_lock(&self, id: &WorkerId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id.clone()).or_default())
    }

    fn write_verdicts(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<WorkerId, Verdict>> {
        self.verdicts.write().unwrap_or_else(PoisonError::into_inner)
    }
}
