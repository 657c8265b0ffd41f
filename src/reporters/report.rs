//! # Core reporter trait
//!
//! `Report` is the injectable error handler for background failures. Cleanups,
//! liveness notifications and ticks run after their caller has returned, so
//! their failures are handed to every configured reporter instead of being
//! thrown.
//!
//! ## Contract
//! - `report` is called synchronously on the thread where the failure was
//!   caught. Keep it cheap; forward to a channel if heavy work is needed.
//! - A panicking reporter is isolated by [`ReporterSet`](crate::ReporterSet)
//!   and does not affect other reporters.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use tickvisor::{Fault, Report};
//!
//! #[derive(Default)]
//! struct Counter(AtomicUsize);
//!
//! impl Report for Counter {
//!     fn report(&self, _fault: &Fault) {
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!     }
//!     fn name(&self) -> &'static str { "counter" }
//! }
//! ```

use crate::error::Fault;

/// Contract for fault reporters.
pub trait Report: Send + Sync + 'static {
    /// Handle a single fault.
    fn report(&self, fault: &Fault);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
