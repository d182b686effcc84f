//! # Event subscribers for the warden runtime.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`]
//! fan-out used by the runtime to deliver [`Event`](crate::Event)s to
//! user-provided handlers (audit trails, metrics, dashboards).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   MonitorEngine / EnforcementController / AdmissionGate ...
//!        │
//!        └── publish(Event) ──► Bus ──► Warden listener ──► SubscriberSet::emit(&Event)
//!                                                              │
//!                                                ┌─────────────┼─────────────┐
//!                                                ▼             ▼             ▼
//!                                            LogWriter       Audit        Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use labelwarden::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct QuarantineCounter;
//!
//! #[async_trait]
//! impl Subscribe for QuarantineCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::WorkerQuarantined {
//!             // increment counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "quarantine-counter"
//!     }
//! }
//! ```

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod embedded;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
