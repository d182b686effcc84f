//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the monitor engine, the enforcement
//! controller, the admission gate, the lifecycle synchronizer and the runtime.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `MonitorEngine`, `Refresher`, `EnforcementController`,
//!   `AdmissionGate`, `LifecycleSynchronizer`, `Warden`.
//! - **Consumers**: `Warden::subscriber_listener()` (fans out to `SubscriberSet`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
