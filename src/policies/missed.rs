//! # Missed-tick policies.
//!
//! Ticks are spawned, never awaited by the timer loop, so the loop only falls
//! behind when the runtime itself stalls. [`MissedTickPolicy`] decides what
//! happens then:
//!
//! - [`MissedTickPolicy::Skip`] drop missed ticks, stay aligned to the original schedule (default).
//! - [`MissedTickPolicy::Delay`] fire once now, shift the schedule to start from now.
//! - [`MissedTickPolicy::Burst`] fire every missed tick back to back.

use tokio::time::MissedTickBehavior;

/// Behavior of a schedule whose timer fell behind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissedTickPolicy {
    /// Keep the original cadence, dropping ticks that were missed.
    #[default]
    Skip,
    /// Restart the cadence from the late tick.
    Delay,
    /// Catch up by firing all missed ticks immediately.
    Burst,
}

impl From<MissedTickPolicy> for MissedTickBehavior {
    fn from(p: MissedTickPolicy) -> Self {
        match p {
            MissedTickPolicy::Skip => MissedTickBehavior::Skip,
            MissedTickPolicy::Delay => MissedTickBehavior::Delay,
            MissedTickPolicy::Burst => MissedTickBehavior::Burst,
        }
    }
}
