//! # Logging reporter.
//!
//! [`LogReporter`] writes each fault as a structured `tracing` event. It is the
//! reporter a [`Coordinator`](crate::Coordinator) uses when none is configured.
//!
//! ## Output fields
//! ```text
//! WARN tickvisor: background fault label=fault_callback owner=dash key=refresh error="timeout"
//! WARN tickvisor: background fault label=fault_notify subscriber=3 error="boom"
//! ```

use crate::error::Fault;
use crate::reporters::Report;

/// Reporter forwarding faults to `tracing` at WARN level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Report for LogReporter {
    fn report(&self, fault: &Fault) {
        match fault {
            Fault::Cleanup { owner, key, error } | Fault::Callback { owner, key, error } => {
                tracing::warn!(
                    target: "tickvisor",
                    label = fault.as_label(),
                    %owner,
                    %key,
                    %error,
                    "background fault"
                );
            }
            Fault::Notify { subscriber, error } => {
                tracing::warn!(
                    target: "tickvisor",
                    label = fault.as_label(),
                    subscriber,
                    %error,
                    "background fault"
                );
            }
            Fault::Attach { error } | Fault::Detach { error } => {
                tracing::warn!(
                    target: "tickvisor",
                    label = fault.as_label(),
                    %error,
                    "background fault"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
