//! # Fault fan-out to multiple reporters.
//!
//! Provides [`ReporterSet`] - delivers each fault to every reporter and
//! publishes it on the [`Bus`] as [`EventKind::FaultReported`](crate::EventKind::FaultReported).
//!
//! ## Architecture
//! ```text
//! report(fault)
//!     │
//!     ├──► Bus.publish(FaultReported)
//!     ├──► reporter 1.report() ──► panic → caught, logged
//!     ├──► reporter 2.report()
//!     └──► reporter N.report()
//! ```
//!
//! ## Rules
//! - **Ordering**: reporters are called in configuration order.
//! - **Isolation**: a panicking reporter doesn't affect the others.
//! - **Synchronous**: `report()` returns once every reporter returned.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::error::{Fault, panic_message};
use crate::events::{Bus, Event};
use crate::reporters::Report;

/// Fan-out coordinator for fault reporters.
#[derive(Clone)]
pub struct ReporterSet {
    reporters: Arc<[Arc<dyn Report>]>,
    bus: Bus,
}

impl ReporterSet {
    /// Creates a set delivering to `reporters` and publishing on `bus`.
    #[must_use]
    pub fn new(reporters: Vec<Arc<dyn Report>>, bus: Bus) -> Self {
        Self {
            reporters: reporters.into(),
            bus,
        }
    }

    /// Routes a fault to every reporter.
    pub fn report(&self, fault: Fault) {
        self.bus.publish(Event::fault_reported(&fault));

        for reporter in self.reporters.iter() {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| reporter.report(&fault))) {
                tracing::error!(
                    target: "tickvisor",
                    reporter = reporter.name(),
                    panic = %panic_message(payload.as_ref()),
                    "reporter panicked"
                );
            }
        }
    }

    /// Number of configured reporters.
    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    /// Returns `true` if no reporter is configured (faults still reach the bus).
    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    /// The bus faults are published on.
    pub(crate) fn bus(&self) -> &Bus {
        &self.bus
    }
}
