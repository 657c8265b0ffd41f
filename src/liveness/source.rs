//! # Liveness source contract.
//!
//! ## Rules
//! - `current()` is synchronous and returns the latest known value.
//! - `on_change()` registers a listener invoked on every true transition.
//!   Redundant notifications (same state twice) are allowed; the broadcaster
//!   absorbs them.
//! - Listeners must observe states in the order they occurred.

use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;

/// State of the external liveness signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Liveness {
    /// The context is observed (foregrounded); background work may run.
    Active,
    /// The context is not observed; background work should be suspended.
    Inactive,
}

impl Liveness {
    /// Returns `true` for [`Liveness::Active`].
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, Liveness::Active)
    }

    /// Maps a boolean "visible" flag onto a state.
    #[inline]
    pub fn from_visible(visible: bool) -> Self {
        if visible {
            Liveness::Active
        } else {
            Liveness::Inactive
        }
    }

    /// Short stable label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Liveness::Active => "active",
            Liveness::Inactive => "inactive",
        }
    }
}

impl fmt::Display for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listener registered on a source.
pub type Listener = Arc<dyn Fn(Liveness) + Send + Sync + 'static>;

/// Detaches a previously registered listener. Consumed on use.
pub struct Detach(Box<dyn FnOnce() + Send + 'static>);

impl Detach {
    /// Wraps a detach closure.
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    /// Detach handle that does nothing (for sources that never notify).
    pub fn noop() -> Self {
        Self(Box::new(|| {}))
    }

    /// Runs the detach closure.
    pub fn detach(self) {
        (self.0)()
    }
}

impl fmt::Debug for Detach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Detach")
    }
}

/// External collaborator providing the liveness signal.
///
/// # Example
/// ```
/// use tickvisor::{BoxError, Detach, Liveness, LivenessSource, Listener};
///
/// /// A source that is always visible and never changes.
/// struct AlwaysOn;
///
/// impl LivenessSource for AlwaysOn {
///     fn current(&self) -> Liveness { Liveness::Active }
///     fn on_change(&self, _listener: Listener) -> Result<Detach, BoxError> {
///         Ok(Detach::noop())
///     }
/// }
///
/// assert!(AlwaysOn.current().is_active());
/// ```
pub trait LivenessSource: Send + Sync + 'static {
    /// Latest known state.
    fn current(&self) -> Liveness;

    /// Registers a listener; the returned [`Detach`] removes it.
    ///
    /// An `Err` means nothing was registered. The broadcaster reports it as
    /// [`Fault::Attach`](crate::Fault::Attach) and retries on the next subscribe.
    fn on_change(&self, listener: Listener) -> Result<Detach, BoxError>;

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_flag_maps_to_state() {
        assert_eq!(Liveness::from_visible(true), Liveness::Active);
        assert_eq!(Liveness::from_visible(false), Liveness::Inactive);
        assert!(!Liveness::Inactive.is_active());
        assert_eq!(Liveness::Active.to_string(), "active");
    }
}
