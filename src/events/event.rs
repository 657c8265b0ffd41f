//! # Coordinator events.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Owner events**: mount/unmount boundaries
//! - **Registry events**: disposable entries added and disposed
//! - **Liveness events**: listener attach/detach and deduplicated transitions
//! - **Schedule events**: start, resume, suspend, stop, skipped ticks
//!
//! Every reported [`Fault`](crate::Fault) is also published as
//! [`EventKind::FaultReported`].
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use tickvisor::{Event, EventKind, Liveness};
//!
//! let ev = Event::new(EventKind::ScheduleSuspended)
//!     .with_owner("dashboard")
//!     .with_key("refresh")
//!     .with_state(Liveness::Inactive);
//!
//! assert_eq!(ev.kind, EventKind::ScheduleSuspended);
//! assert_eq!(ev.key.as_deref(), Some("refresh"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::error::Fault;
use crate::liveness::Liveness;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of coordinator events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Owner events ===
    /// Owner mounted and ready to accept resources.
    ///
    /// Sets: `owner`
    OwnerMounted,

    /// Owner unmounted; all of its entries were disposed.
    ///
    /// Sets: `owner`
    OwnerUnmounted,

    // === Registry events ===
    /// Entry stored in an owner's registry.
    ///
    /// Sets: `owner`, `key`
    EntryAdded,

    /// Entry removed and its cleanup invoked.
    ///
    /// Sets: `owner`, `key`
    EntryDisposed,

    // === Liveness events ===
    /// The single underlying listener was attached to the liveness source.
    ///
    /// Sets: `state` (value read at attach time)
    ListenerAttached,

    /// The underlying listener was detached (last subscriber left).
    ListenerDetached,

    /// A genuine transition was fanned out to subscribers.
    ///
    /// Sets: `state`
    LivenessChanged,

    // === Schedule events ===
    /// Schedule started.
    ///
    /// Sets: `owner`, `key`, `state` (initial), `interval_ms`
    ScheduleStarted,

    /// Schedule moved Waiting → Running.
    ///
    /// Sets: `owner`, `key`
    ScheduleResumed,

    /// Schedule moved Running → Waiting; its timer was cancelled.
    ///
    /// Sets: `owner`, `key`
    ScheduleSuspended,

    /// Schedule stopped (explicitly or by owner teardown).
    ///
    /// Sets: `owner`, `key`
    ScheduleStopped,

    /// Tick skipped because the previous invocation was still in flight.
    ///
    /// Sets: `owner`, `key`
    TickSkipped,

    // === Failures ===
    /// A background failure was reported.
    ///
    /// Sets: `reason` (fault label), `fault`, and `owner`/`key` when known.
    FaultReported,
}

/// Coordinator event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Owner name, if applicable.
    pub owner: Option<Arc<str>>,
    /// Entry or schedule key, if applicable.
    pub key: Option<Arc<str>>,
    /// Liveness state carried by the event.
    pub state: Option<Liveness>,
    /// Schedule interval in milliseconds (compact).
    pub interval_ms: Option<u32>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
    /// The reported fault (only for `FaultReported`).
    pub fault: Option<Fault>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            owner: None,
            key: None,
            state: None,
            interval_ms: None,
            reason: None,
            fault: None,
        }
    }

    /// Attaches an owner name.
    #[inline]
    pub fn with_owner(mut self, owner: impl Into<Arc<str>>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Attaches an entry/schedule key.
    #[inline]
    pub fn with_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attaches a liveness state.
    #[inline]
    pub fn with_state(mut self, state: Liveness) -> Self {
        self.state = Some(state);
        self
    }

    /// Attaches an interval (stored as milliseconds).
    #[inline]
    pub fn with_interval(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.interval_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a `FaultReported` event carrying the fault and its context.
    pub fn fault_reported(fault: &Fault) -> Self {
        let mut ev = Event::new(EventKind::FaultReported).with_reason(fault.as_label());
        match fault {
            Fault::Cleanup { owner, key, .. } | Fault::Callback { owner, key, .. } => {
                ev = ev.with_owner(owner.as_str()).with_key(key.as_str());
            }
            Fault::Notify { .. } | Fault::Attach { .. } | Fault::Detach { .. } => {}
        }
        ev.fault = Some(fault.clone());
        ev
    }

    #[inline]
    pub fn is_fault(&self) -> bool {
        matches!(self.kind, EventKind::FaultReported)
    }
}
