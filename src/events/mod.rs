//! Coordinator events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! observe what the coordinator does without hooking into it.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Owner`, `DisposableRegistry`, `Broadcaster`,
//!   `VisibilityScheduler`, ticker tasks, `ReporterSet` (faults).
//! - **Consumers**: anything holding a receiver from `Coordinator::events()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
