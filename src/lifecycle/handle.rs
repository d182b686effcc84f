use tokio::sync::mpsc;

use super::LifecycleEvent;
use crate::error::SubmitError;

/// Handle for delivering lifecycle events to the synchronizer loop.
#[derive(Clone)]
pub struct LifecycleHandle {
    pub(super) tx: mpsc::Sender<LifecycleEvent>,
}

impl LifecycleHandle {
    /// Deliver an event (async, waits if the queue is full).
    pub async fn send(&self, event: LifecycleEvent) -> Result<(), SubmitError> {
        self.tx.send(event).await.map_err(|_| SubmitError::Closed)
    }

    /// Try to deliver without waiting (fails if the queue is full).
    pub fn try_send(&self, event: LifecycleEvent) -> Result<(), SubmitError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SubmitError::Full,
            mpsc::error::TrySendError::Closed(_) => SubmitError::Closed,
        })
    }
}
