use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tracing::{debug, info, warn};

use super::cause::{disconnect_cause, quarantine_cause};
use crate::events::{Bus, Event, EventKind};
use crate::model::{Tag, Verdict, WorkerDescriptor, WorkerId, WorkerKind, WorkerStatus};
use crate::registry::WorkerRegistry;
use crate::toggle::EnforcementToggle;

/// What a call to the controller did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Nothing to do (compliant, already enforced, or an unrelated quarantine).
    None,
    /// Persistent worker quarantined.
    Quarantined,
    /// Persistent worker was already quarantined by policy; only the cause text changed.
    CauseRefreshed,
    /// Disconnect of an ephemeral worker was accepted.
    Disconnected,
    /// A policy quarantine was cleared.
    Restored,
    /// Enforcement is disabled; the verdict stays cached, nothing is changed.
    Suspended,
    /// The registry failed or did not accept in time; the next pass retries.
    Deferred,
}

impl Action {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Action::None => "none",
            Action::Quarantined => "quarantined",
            Action::CauseRefreshed => "cause_refreshed",
            Action::Disconnected => "disconnected",
            Action::Restored => "restored",
            Action::Suspended => "suspended",
            Action::Deferred => "deferred",
        }
    }
}

/// Applies verdicts to workers through the registry.
///
/// Branches on [`WorkerKind`]: persistent workers are quarantined (and later
/// restored), ephemeral workers are disconnected. The [`EnforcementToggle`] is
/// read at the moment an action would be taken.
pub struct EnforcementController {
    registry: Arc<dyn WorkerRegistry>,
    toggle: EnforcementToggle,
    bus: Bus,
    disconnect_wait: Option<Duration>,
}

impl EnforcementController {
    /// Creates a controller. `disconnect_wait = None` waits indefinitely for a
    /// disconnect to be accepted.
    pub fn new(
        registry: Arc<dyn WorkerRegistry>,
        toggle: EnforcementToggle,
        bus: Bus,
        disconnect_wait: Option<Duration>,
    ) -> Self {
        Self {
            registry,
            toggle,
            bus,
            disconnect_wait,
        }
    }

    /// Enforces a non-compliant verdict. Compliant verdicts are a no-op.
    ///
    /// Idempotent: a worker already quarantined or disconnecting for policy
    /// reasons is not transitioned again.
    pub async fn apply_verdict(&self, worker: &WorkerDescriptor, verdict: &Verdict) -> Action {
        let Some(tag) = verdict.forbidden_tag() else {
            return Action::None;
        };
        let id = worker.id();

        if !self.toggle.is_enabled() {
            debug!(worker = %id, tag = %tag, "enforcement disabled, leaving worker as is");
            self.bus.publish(
                Event::new(EventKind::EnforcementSuspended)
                    .with_worker(id.as_str())
                    .with_tag(tag.name()),
            );
            return Action::Suspended;
        }

        let status = match self.registry.status(id).await {
            Ok(status) => status,
            Err(e) if e.is_unknown_worker() => {
                debug!(worker = %id, "worker vanished before enforcement");
                return Action::None;
            }
            Err(e) => return self.defer(id, Some(tag), e.to_string()),
        };

        match worker.kind() {
            WorkerKind::Persistent => self.quarantine(id, tag, &status).await,
            WorkerKind::Ephemeral => self.disconnect(id, tag, &status).await,
        }
    }

    /// Clears a quarantine placed by this subsystem once `verdict` is compliant.
    ///
    /// Quarantines with any other cause are never touched. Runs regardless of
    /// the toggle: disabling enforcement keeps existing quarantines in place but
    /// does not prevent lifting them.
    pub async fn restore_if_eligible(&self, worker: &WorkerDescriptor, verdict: &Verdict) -> Action {
        if !verdict.is_compliant() {
            return Action::None;
        }
        let id = worker.id();

        let status = match self.registry.status(id).await {
            Ok(status) => status,
            Err(e) if e.is_unknown_worker() => return Action::None,
            Err(e) => return self.defer(id, None, e.to_string()),
        };
        let cleared = match status.cause() {
            Some(cause) if status.is_policy_quarantine() => cause.message().to_string(),
            _ => return Action::None,
        };

        match self.registry.clear_quarantine(id).await {
            Ok(()) => {
                info!(worker = %id, cause = %cleared, "worker compliant again, quarantine cleared");
                self.bus.publish(
                    Event::new(EventKind::WorkerRestored)
                        .with_worker(id.as_str())
                        .with_reason(cleared),
                );
                Action::Restored
            }
            Err(e) => self.defer(id, None, e.to_string()),
        }
    }

    /// Enforces or restores depending on the verdict.
    pub async fn reconcile(&self, worker: &WorkerDescriptor, verdict: &Verdict) -> Action {
        if verdict.is_compliant() {
            self.restore_if_eligible(worker, verdict).await
        } else {
            self.apply_verdict(worker, verdict).await
        }
    }

    async fn quarantine(&self, id: &WorkerId, tag: &Tag, status: &WorkerStatus) -> Action {
        let cause = quarantine_cause(tag);
        let action = match status {
            WorkerStatus::Quarantined(current) if current.is_forbidden_tag() => {
                if current.message() == cause.message() {
                    return Action::None;
                }
                Action::CauseRefreshed
            }
            WorkerStatus::Quarantined(current) => {
                debug!(worker = %id, cause = %current, "worker quarantined for another reason, not touching it");
                return Action::None;
            }
            _ => Action::Quarantined,
        };

        let message = cause.message().to_string();
        match self.registry.quarantine(id, cause).await {
            Ok(()) => {
                info!(worker = %id, tag = %tag, "quarantined worker");
                self.bus.publish(
                    Event::new(EventKind::WorkerQuarantined)
                        .with_worker(id.as_str())
                        .with_tag(tag.name())
                        .with_reason(message),
                );
                action
            }
            Err(e) => self.defer(id, Some(tag), e.to_string()),
        }
    }

    async fn disconnect(&self, id: &WorkerId, tag: &Tag, status: &WorkerStatus) -> Action {
        if status.is_policy_disconnect() {
            return Action::None;
        }

        let cause = disconnect_cause(tag);
        let message = cause.message().to_string();
        let request = self.registry.disconnect(id, cause);
        let accepted = match self.disconnect_wait {
            Some(wait) => match time::timeout(wait, request).await {
                Ok(res) => res.map_err(|e| e.to_string()),
                Err(_elapsed) => Err(format!("disconnect not accepted within {wait:?}")),
            },
            None => request.await.map_err(|e| e.to_string()),
        };

        match accepted {
            Ok(()) => {
                info!(worker = %id, tag = %tag, "disconnected ephemeral worker");
                self.bus.publish(
                    Event::new(EventKind::WorkerDisconnected)
                        .with_worker(id.as_str())
                        .with_tag(tag.name())
                        .with_reason(message),
                );
                Action::Disconnected
            }
            Err(reason) => self.defer(id, Some(tag), reason),
        }
    }

    /// Reports an enforcement or restore that could not be applied now.
    /// `tag` is `None` for restores.
    fn defer(&self, id: &WorkerId, tag: Option<&Tag>, reason: String) -> Action {
        let mut ev = Event::new(EventKind::EnforcementDeferred).with_worker(id.as_str());
        match tag {
            Some(tag) => {
                warn!(worker = %id, tag = %tag, reason = %reason, "enforcement deferred to next pass");
                ev = ev.with_tag(tag.name());
            }
            None => warn!(worker = %id, reason = %reason, "restore deferred to next pass"),
        }
        self.bus.publish(ev.with_reason(reason));
        Action::Deferred
    }
}
