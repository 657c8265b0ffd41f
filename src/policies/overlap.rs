//! # Overlap policies for scheduled ticks.
//!
//! [`OverlapPolicy`] decides what happens when a tick comes due while the
//! previous invocation of the same schedule has not finished yet.
//!
//! - [`OverlapPolicy::Allow`] every tick fires independently (default).
//! - [`OverlapPolicy::SkipIfInFlight`] the tick is dropped and a
//!   `TickSkipped` event is published.
//!
//! ```text
//! interval:   |----T1----|----T2----|----T3----|
//! callback:   [=====slow=====]
//! Allow:      T1 fires, T2 fires (overlaps T1), T3 fires
//! SkipIfInFl: T1 fires, T2 skipped,             T3 fires
//! ```
//!
//! Use `SkipIfInFlight` for non-idempotent network calls where overlapping
//! requests would be wasteful or harmful.

/// Policy for ticks that come due while a previous invocation is running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Fire regardless of in-flight invocations (default).
    #[default]
    Allow,
    /// Skip the tick while the previous invocation has not completed.
    SkipIfInFlight,
}

impl OverlapPolicy {
    /// Returns `true` if a tick should be skipped given the in-flight count.
    #[inline]
    pub fn should_skip(self, in_flight: usize) -> bool {
        matches!(self, OverlapPolicy::SkipIfInFlight) && in_flight > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_never_skips() {
        assert!(!OverlapPolicy::Allow.should_skip(3));
    }

    #[test]
    fn skip_only_while_in_flight() {
        assert!(!OverlapPolicy::SkipIfInFlight.should_skip(0));
        assert!(OverlapPolicy::SkipIfInFlight.should_skip(1));
    }
}
