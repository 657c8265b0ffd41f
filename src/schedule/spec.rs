//! # Schedule specification.
//!
//! Defines [`ScheduleSpec`] a configuration bundle that describes how a tick
//! should run under a liveness-aware schedule (interval, resume behavior,
//! overlap and missed-tick policies).
//!
//! A spec can be created:
//! - **Explicitly** with [`ScheduleSpec::new`] (policy defaults)
//! - **From config** with [`ScheduleSpec::with_defaults`] (inherit policies)
//!
//! `fire_immediately_on_resume` has no default on purpose: every call site
//! states whether a resume fires at once or waits a full interval.

use std::time::Duration;

use crate::core::Config;
use crate::policies::{MissedTickPolicy, OverlapPolicy};
use crate::schedule::TickRef;

/// Specification for running a tick while the liveness signal is active.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use tickvisor::{OverlapPolicy, ScheduleSpec, TickError, TickFn, TickRef};
///
/// let poll: TickRef = TickFn::arc("poll", |_ctx: CancellationToken| async move {
///     Ok::<(), TickError>(())
/// });
///
/// let spec = ScheduleSpec::new(poll, Duration::from_secs(30), true).skip_if_in_flight();
/// assert_eq!(spec.overlap(), OverlapPolicy::SkipIfInFlight);
/// assert!(spec.fire_immediately_on_resume());
/// ```
#[derive(Clone)]
pub struct ScheduleSpec {
    tick: TickRef,
    interval: Duration,
    fire_immediately_on_resume: bool,
    overlap: OverlapPolicy,
    missed_ticks: MissedTickPolicy,
}

impl ScheduleSpec {
    /// Creates a spec with default overlap (`Allow`) and missed-tick (`Skip`) policies.
    ///
    /// ### Parameters
    /// - `tick`: work to run on every tick
    /// - `interval`: period between ticks (must be non-zero)
    /// - `fire_immediately_on_resume`: fire once right away when the signal returns to active
    pub fn new(tick: TickRef, interval: Duration, fire_immediately_on_resume: bool) -> Self {
        Self {
            tick,
            interval,
            fire_immediately_on_resume,
            overlap: OverlapPolicy::default(),
            missed_ticks: MissedTickPolicy::default(),
        }
    }

    /// Creates a spec inheriting overlap and missed-tick policies from `cfg`.
    pub fn with_defaults(
        tick: TickRef,
        interval: Duration,
        fire_immediately_on_resume: bool,
        cfg: &Config,
    ) -> Self {
        Self {
            tick,
            interval,
            fire_immediately_on_resume,
            overlap: cfg.overlap,
            missed_ticks: cfg.missed_ticks,
        }
    }

    /// Returns reference to the tick.
    pub fn tick(&self) -> &TickRef {
        &self.tick
    }

    /// Convenience: returns the tick name.
    pub fn name(&self) -> &str {
        self.tick.name()
    }

    /// Returns the interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns whether a resume fires immediately.
    pub fn fire_immediately_on_resume(&self) -> bool {
        self.fire_immediately_on_resume
    }

    /// Returns the overlap policy.
    pub fn overlap(&self) -> OverlapPolicy {
        self.overlap
    }

    /// Returns the missed-tick policy.
    pub fn missed_ticks(&self) -> MissedTickPolicy {
        self.missed_ticks
    }

    /// Returns a new spec with updated overlap policy.
    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    /// Shorthand for `with_overlap(OverlapPolicy::SkipIfInFlight)`.
    pub fn skip_if_in_flight(self) -> Self {
        self.with_overlap(OverlapPolicy::SkipIfInFlight)
    }

    /// Returns a new spec with updated missed-tick policy.
    pub fn with_missed_ticks(mut self, missed_ticks: MissedTickPolicy) -> Self {
        self.missed_ticks = missed_ticks;
        self
    }
}
