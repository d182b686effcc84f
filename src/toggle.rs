//! # Enforcement toggle.
//!
//! A process-wide switch that lets an operator suspend enforcement (quarantine,
//! disconnect, and the admission veto) while evaluation and verdict caching keep
//! running. It is an explicit value handed to the components that read it, not
//! a hidden global: clones share the same flag.
//!
//! The flag is read at the moment an action is taken, never cached.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared on/off switch for enforcement.
#[derive(Clone, Debug)]
pub struct EnforcementToggle {
    enabled: Arc<AtomicBool>,
}

impl EnforcementToggle {
    /// Creates a toggle in the given state.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    /// True if enforcement is currently active.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Sets the state and returns the previous one.
    pub fn set(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::AcqRel)
    }
}

impl Default for EnforcementToggle {
    /// Enforcement is enabled by default.
    fn default() -> Self {
        Self::new(true)
    }
}
