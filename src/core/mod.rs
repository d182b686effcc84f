//! Runtime core: wiring and lifecycle.
//!
//! The public API of this module is [`Warden`] and its [`WardenBuilder`].
//!
//! Internal modules:
//! - [`warden`]: owns the components, spawns the background loops, handles shutdown;
//! - [`builder`]: wires bus, subscribers, engine, controller, gate and synchronizer;
//! - [`signal`]: cross-platform termination signal handling.

mod builder;
mod signal;
mod warden;

pub use builder::WardenBuilder;
pub use warden::Warden;
