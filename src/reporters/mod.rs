//! # Fault reporters.
//!
//! Background failures ([`Fault`](crate::Fault)) are routed through a
//! [`ReporterSet`] to user-supplied [`Report`] implementations.
//!
//! ## Architecture
//! ```text
//! Fault flow:
//!   Registry / Broadcaster / Ticker ── catch ──► ReporterSet::report(Fault)
//!                                                   │
//!                                                   ├──► Bus (FaultReported event)
//!                                                   │
//!                                              ┌────┴──────┬─────────┐
//!                                              ▼           ▼         ▼
//!                                          LogReporter   Custom     ...
//! ```
//!
//! ## Reporter types
//! - [`LogReporter`] - structured `tracing` output (default)
//! - custom - implement [`Report`] for metrics, alerting or test collection

mod log;
mod report;
mod set;

pub use log::LogReporter;
pub use report::Report;
pub use set::ReporterSet;
