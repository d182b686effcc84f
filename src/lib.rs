//! # labelwarden
//!
//! **labelwarden** keeps workers carrying forbidden tags away from work.
//!
//! Every worker of a fleet carries a set of capability tags; an administrator
//! may mark a tag *forbidden*. The runtime evaluates workers against the tag
//! catalog, caches one verdict per worker, quarantines non-compliant
//! persistent workers, disconnects non-compliant ephemeral workers, vetoes task
//! assignment to non-compliant workers and restores workers once they are
//! compliant again. Every failure degrades toward "allow work".
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   TagCatalog (read-only)          WorkerRegistry (describe / status / transitions)
//!          │                                   │
//!          ▼                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Warden (runtime)                                                 │
//! │  - MonitorEngine       (evaluate, verdict cache, refresh)         │
//! │  - EnforcementController (quarantine / disconnect / restore)      │
//! │  - AdmissionGate       (cache-only veto)                          │
//! │  - LifecycleSynchronizer (host lifecycle transitions)             │
//! │  - EnforcementToggle   (operator on/off, read at use)             │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        │ publishes        │ publishes        │ publishes
//!        ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                          subscriber_listener
//!                                   ▼
//!                            SubscriberSet (per-sub queues)
//! ```
//!
//! ### Worker lifecycle
//! ```text
//! unknown ─► pre-admission ─► evaluated ─┬─ compliant ───────────────► schedulable
//!                                        └─ non-compliant ─► quarantined | disconnected
//!                                                                  │
//!                               tag removed / catalog edited ─► re-evaluated ─► restored
//! ```
//! There is no terminal state: quarantine and restore may cycle indefinitely.
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                              |
//! |-------------------|----------------------------------------------------------|-------------------------------------------------|
//! | **Evaluation**    | First forbidden tag wins, deterministic order.           | [`ComplianceEvaluator`], [`MonitorEngine`]      |
//! | **Enforcement**   | Kind-specific remediation and restoration.               | [`EnforcementController`], [`Action`]           |
//! | **Admission**     | Cache-only assignment veto.                              | [`AdmissionGate`], [`Admission`], [`Blockage`]  |
//! | **Lifecycle**     | Host transitions mapped onto engine calls.               | [`LifecycleSynchronizer`], [`LifecycleEvent`]   |
//! | **Collaborators** | Catalog and registry seams with in-memory versions.      | [`TagCatalog`], [`WorkerRegistry`]              |
//! | **Subscriber API**| Hook into policy events (audit, metrics).                | [`Subscribe`], [`Event`]                        |
//! | **Configuration** | Centralize runtime settings.                             | [`Config`]                                      |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] subscriber rendering events via `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use labelwarden::{Config, MemoryCatalog, MemoryRegistry, Warden, WorkerId, WorkerKind};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.debounce = Duration::from_millis(100);
//!
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn labelwarden::Subscribe>> = {
//!         use labelwarden::LogWriter;
//!         vec![Arc::new(LogWriter::default())]
//!     };
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn labelwarden::Subscribe>> = Vec::new();
//!
//!     let catalog = Arc::new(MemoryCatalog::new());
//!     let registry = Arc::new(MemoryRegistry::new());
//!     registry.add("w1", WorkerKind::Persistent, ["linux"]);
//!
//!     let warden = Warden::builder(cfg)
//!         .with_subscribers(subs)
//!         .build(catalog.clone(), registry.clone());
//!     warden.start();
//!
//!     // An administrator forbids "linux"; the fleet is refreshed.
//!     catalog.set_forbidden("linux", true);
//!     let generation = warden.engine().schedule_refresh_all();
//!     warden.engine().wait_for_generation(generation).await?;
//!
//!     assert!(!warden.can_assign(&WorkerId::from("w1")).is_allowed());
//!     warden.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod admission;
mod catalog;
mod config;
mod core;
mod enforcement;
mod error;
mod events;
mod lifecycle;
mod model;
mod monitor;
mod registry;
mod subscribers;
mod toggle;

// ---- Public re-exports ----

pub use admission::{Admission, AdmissionGate, Blockage};
pub use catalog::{MemoryCatalog, TagCatalog};
pub use config::Config;
pub use core::{Warden, WardenBuilder};
pub use enforcement::{Action, EnforcementController, disconnect_cause, quarantine_cause};
pub use error::{LookupError, RegistryError, SubmitError, WardenError};
pub use events::{Bus, Event, EventKind};
pub use lifecycle::{LifecycleEvent, LifecycleHandle, LifecycleSynchronizer, PolicySummary};
pub use model::{
    CauseOrigin, OfflineCause, Tag, Verdict, WorkerDescriptor, WorkerId, WorkerKind, WorkerStatus,
};
pub use monitor::{Assessment, ComplianceEvaluator, Evaluation, LockedAssessment, MonitorEngine};
pub use registry::{MemoryRegistry, WorkerRegistry};
pub use subscribers::{Subscribe, SubscriberSet};
pub use toggle::EnforcementToggle;

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
