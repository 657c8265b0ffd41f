//! # Global coordinator configuration.
//!
//! Provides [`Config`] centralized settings for a [`Coordinator`](crate::Coordinator).
//!
//! Config is used in two ways:
//! 1. **Coordinator creation**: `Coordinator::builder(config, source)`
//! 2. **ScheduleSpec defaults**: `ScheduleSpec::with_defaults(tick, interval, resume, &config)`

use crate::policies::{MissedTickPolicy, OverlapPolicy};

/// Global configuration for the coordinator.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `overlap`: Default overlap policy for schedules built with `with_defaults`
/// - `missed_ticks`: Default missed-tick policy for schedules built with `with_defaults`
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Default overlap policy.
    pub overlap: OverlapPolicy,

    /// Default missed-tick policy.
    pub missed_ticks: MissedTickPolicy,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `overlap = OverlapPolicy::Allow`
    /// - `missed_ticks = MissedTickPolicy::Skip`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            overlap: OverlapPolicy::default(),
            missed_ticks: MissedTickPolicy::default(),
        }
    }
}
