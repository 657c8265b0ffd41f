//! # Tick abstractions and schedule specifications.
//!
//! This module provides the schedule-related types:
//! - [`Tick`] - trait for periodic, cancelable work
//! - [`TickFn`] - closure-backed tick implementation
//! - [`TickRef`] - shared reference to a tick (`Arc<dyn Tick>`)
//! - [`ScheduleSpec`] - specification bundling a tick with its interval and policies

mod spec;
mod tick;
mod tick_fn;

pub use spec::ScheduleSpec;
pub use tick::{BoxTickFuture, Tick};
pub use tick_fn::{TickFn, TickRef};
