//! # Global runtime configuration.
//!
//! Provides [`Config`], centralized settings for the warden runtime.
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unlimited (no evaluation semaphore created)
//! - `scan_interval = 0s` → no periodic scan (refreshes only on triggers)
//! - `max_debounce = 0s` → no cap on how long a burst may defer a pass
//! - `disconnect_timeout = 0s` → wait indefinitely for a disconnect to be accepted

use std::time::Duration;

/// Global configuration for the warden runtime.
///
/// ## Field semantics
/// - `debounce`: quiet period that coalesces refresh triggers into one pass
/// - `max_debounce`: upper bound on debouncing under a continuous trigger stream (`0s` = none)
/// - `scan_interval`: period of the background fleet scan (`0s` = disabled)
/// - `max_concurrent`: evaluation/enforcement pool size (`0` = unlimited)
/// - `disconnect_timeout`: how long to wait for a disconnect request to be accepted
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `lifecycle_queue_capacity`: lifecycle event queue size (min 1)
/// - `grace`: maximum wait for background loops on shutdown
/// - `exempt_worker`: id of the worker representing the controller itself
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Quiet period of the refresh debouncer.
    ///
    /// A pass starts once no new trigger arrived for `debounce`.
    pub debounce: Duration,

    /// Maximum time a stream of triggers may keep deferring a pass.
    pub max_debounce: Duration,

    /// Interval of the periodic fleet scan.
    pub scan_interval: Duration,

    /// Maximum number of workers evaluated/enforced concurrently during a pass.
    pub max_concurrent: usize,

    /// Maximum wait for the registry to accept a disconnect request.
    ///
    /// On expiry the disconnect is logged and treated as "not yet enforced";
    /// the next pass retries it.
    pub disconnect_timeout: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Capacity of the lifecycle event queue.
    pub lifecycle_queue_capacity: usize,

    /// Maximum time to wait for background loops on shutdown.
    pub grace: Duration,

    /// Worker id that is never evaluated (the controller node itself).
    pub exempt_worker: Option<String>,
}

impl Config {
    /// Returns the evaluation concurrency limit as an `Option`.
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }

    /// Returns the periodic scan interval as an `Option`.
    #[inline]
    pub fn scan_period(&self) -> Option<Duration> {
        if self.scan_interval == Duration::ZERO {
            None
        } else {
            Some(self.scan_interval)
        }
    }

    /// Returns the debounce cap as an `Option`.
    #[inline]
    pub fn debounce_cap(&self) -> Option<Duration> {
        if self.max_debounce == Duration::ZERO {
            None
        } else {
            Some(self.max_debounce)
        }
    }

    /// Returns the disconnect acceptance timeout as an `Option`.
    #[inline]
    pub fn disconnect_wait(&self) -> Option<Duration> {
        if self.disconnect_timeout == Duration::ZERO {
            None
        } else {
            Some(self.disconnect_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a lifecycle queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn lifecycle_capacity_clamped(&self) -> usize {
        self.lifecycle_queue_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `debounce = 5s` (absorbs reconnect storms and bulk catalog edits)
    /// - `max_debounce = 30s`
    /// - `scan_interval = 60s`
    /// - `max_concurrent = 8`
    /// - `disconnect_timeout = 30s`
    /// - `bus_capacity = 1024`
    /// - `lifecycle_queue_capacity = 1024`
    /// - `grace = 10s`
    /// - `exempt_worker = Some("controller")`
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(5),
            max_debounce: Duration::from_secs(30),
            scan_interval: Duration::from_secs(60),
            max_concurrent: 8,
            disconnect_timeout: Duration::from_secs(30),
            bus_capacity: 1024,
            lifecycle_queue_capacity: 1024,
            grace: Duration::from_secs(10),
            exempt_worker: Some("controller".to_string()),
        }
    }
}
