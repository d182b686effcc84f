//! # Worker lifecycle synchronization.
//!
//! Maps worker lifecycle transitions onto engine calls:
//!
//! ```text
//! pre-admission        ──► wait_for_refresh ─► evaluate_locked ─► reconcile (awaited by caller)
//! became reachable     ──► evaluate_locked ─► reconcile (worker lock held throughout)
//! configuration change ──► schedule_refresh_all
//! offline / online     ──► schedule_refresh_all
//! temporarily online   ──► schedule_refresh_all + policy summary recompute
//! policy toggled       ──► schedule_refresh_all
//! ```
//!
//! Pre-admission is a direct call; every other transition can be delivered
//! through a [`LifecycleHandle`] and is processed in arrival order by the
//! synchronizer loop.

mod event;
mod handle;
mod summary;
mod synchronizer;

pub use event::LifecycleEvent;
pub use handle::LifecycleHandle;
pub use summary::PolicySummary;
pub use synchronizer::LifecycleSynchronizer;
