//! Error types used by the coordinator, its reporters and scheduled ticks.
//!
//! This module defines three enums:
//!
//! - [`CoordError`] - errors surfaced synchronously to the caller (registration time).
//! - [`Fault`] - background failures that are caught and routed to a reporter, never returned.
//! - [`TickError`] - errors returned by an individual tick future.
//!
//! All of them provide `as_label` / `as_message` helpers for logs and metrics.

use std::any::Any;

use thiserror::Error;

/// Boxed error accepted from user setup functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors surfaced to calling code.
///
/// Only registration-time problems are returned; everything that happens later
/// (cleanups, fan-out, ticks) is reported as a [`Fault`] instead.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CoordError {
    /// A setup function passed to `add` returned an error; no entry was stored.
    #[error("setup for `{key}` failed: {source}")]
    Setup {
        /// Key the setup was registered under.
        key: String,
        /// Error returned by the setup function.
        #[source]
        source: BoxError,
    },

    /// Keys must be non-empty.
    #[error("disposable key must not be empty")]
    EmptyKey,

    /// The key belongs to a live schedule or uses the reserved `#liveness` suffix.
    #[error("key `{key}` is reserved by a schedule")]
    ReservedKey {
        /// The rejected key.
        key: String,
    },

    /// A schedule was started with a zero interval.
    #[error("interval for `{key}` must be greater than zero")]
    InvalidInterval {
        /// Key of the rejected schedule.
        key: String,
    },

    /// The owner was already unmounted; it no longer accepts resources.
    #[error("owner `{owner}` is unmounted")]
    Unmounted {
        /// Name of the owner.
        owner: String,
    },

    /// A timer was requested outside of a tokio runtime.
    #[error("no tokio runtime available to drive timers")]
    NoRuntime,
}

impl CoordError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tickvisor::CoordError;
    ///
    /// assert_eq!(CoordError::EmptyKey.as_label(), "coord_empty_key");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CoordError::Setup { .. } => "coord_setup_failed",
            CoordError::EmptyKey => "coord_empty_key",
            CoordError::ReservedKey { .. } => "coord_reserved_key",
            CoordError::InvalidInterval { .. } => "coord_invalid_interval",
            CoordError::Unmounted { .. } => "coord_unmounted",
            CoordError::NoRuntime => "coord_no_runtime",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            CoordError::Setup { key, source } => format!("setup key={key}: {source}"),
            CoordError::EmptyKey => "empty key".to_string(),
            CoordError::ReservedKey { key } => format!("reserved key={key}"),
            CoordError::InvalidInterval { key } => format!("zero interval key={key}"),
            CoordError::Unmounted { owner } => format!("owner={owner} unmounted"),
            CoordError::NoRuntime => "no tokio runtime".to_string(),
        }
    }
}

/// # Background failures.
///
/// A `Fault` is never returned to a caller: by the time it happens there is no
/// synchronous caller left. It is handed to every configured
/// [`Report`](crate::Report) implementation and published on the event bus.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// A cleanup closure failed during `dispose`/`dispose_all`. The entry was removed anyway.
    #[error("cleanup of `{key}` on owner `{owner}` failed: {error}")]
    Cleanup {
        /// Owner name.
        owner: String,
        /// Key of the disposed entry.
        key: String,
        /// Failure message.
        error: String,
    },

    /// A broadcaster subscriber failed while being notified.
    #[error("subscriber #{subscriber} failed on liveness notify: {error}")]
    Notify {
        /// Subscriber id assigned by the broadcaster.
        subscriber: u64,
        /// Failure message.
        error: String,
    },

    /// A scheduled tick failed (error result or panic). The cadence is unaffected.
    #[error("tick `{key}` on owner `{owner}` failed: {error}")]
    Callback {
        /// Owner name.
        owner: String,
        /// Schedule key.
        key: String,
        /// Failure message.
        error: String,
    },

    /// Attaching the listener to the liveness source failed; the next subscribe retries.
    #[error("attaching liveness listener failed: {error}")]
    Attach {
        /// Failure message.
        error: String,
    },

    /// Detaching the listener from the liveness source failed.
    #[error("detaching liveness listener failed: {error}")]
    Detach {
        /// Failure message.
        error: String,
    },
}

impl Fault {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tickvisor::Fault;
    ///
    /// let f = Fault::Notify { subscriber: 3, error: "boom".into() };
    /// assert_eq!(f.as_label(), "fault_notify");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            Fault::Cleanup { .. } => "fault_cleanup",
            Fault::Notify { .. } => "fault_notify",
            Fault::Callback { .. } => "fault_callback",
            Fault::Attach { .. } => "fault_attach",
            Fault::Detach { .. } => "fault_detach",
        }
    }

    /// Returns the failure message without the surrounding context.
    pub fn as_message(&self) -> &str {
        match self {
            Fault::Cleanup { error, .. }
            | Fault::Notify { error, .. }
            | Fault::Callback { error, .. }
            | Fault::Attach { error }
            | Fault::Detach { error } => error,
        }
    }
}

/// # Errors produced by a tick.
///
/// Returned from the future created by [`Tick::fire`](crate::Tick::fire).
/// Neither variant stops the schedule. `Fail` is reported as [`Fault::Callback`];
/// `Canceled` is the expected outcome after a suspend and is only traced.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TickError {
    /// The tick failed; the next one still fires on time.
    #[error("tick failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The tick observed its cancellation token and gave up.
    #[error("tick cancelled")]
    Canceled,
}

impl TickError {
    /// Shorthand for [`TickError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TickError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TickError::Fail { .. } => "tick_failed",
            TickError::Canceled => "tick_canceled",
        }
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_readable() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");

        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");

        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }

    #[test]
    fn setup_error_keeps_source() {
        let err = CoordError::Setup {
            key: "poll".into(),
            source: "db down".into(),
        };
        assert_eq!(err.as_label(), "coord_setup_failed");
        assert_eq!(err.to_string(), "setup for `poll` failed: db down");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn fault_message_strips_context() {
        let f = Fault::Callback {
            owner: "dash".into(),
            key: "refresh".into(),
            error: "timeout".into(),
        };
        assert_eq!(f.as_message(), "timeout");
        assert_eq!(f.as_label(), "fault_callback");
    }
}
