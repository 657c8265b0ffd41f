//! Tick policies.
//!
//! This module groups the knobs that control **whether** a due tick fires and
//! **how** a late timer catches up.
//!
//! ## Contents
//! - [`OverlapPolicy`] fire or skip while the previous tick is still running
//! - [`MissedTickPolicy`] skip / delay / burst after the runtime stalled
//!
//! ## Quick wiring
//! ```text
//! ScheduleSpec { interval, fire_immediately_on_resume, overlap, missed_ticks }
//!      └─► core::ticker uses:
//!           - overlap.should_skip(in_flight) before every tick
//!           - missed_ticks as the interval's MissedTickBehavior
//! ```
//!
//! ## Defaults
//! - `OverlapPolicy::Allow`
//! - `MissedTickPolicy::Skip`

mod missed;
mod overlap;

pub use missed::MissedTickPolicy;
pub use overlap::OverlapPolicy;
