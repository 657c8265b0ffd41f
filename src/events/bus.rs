//! # Event bus for broadcasting coordinator events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from every part of the coordinator (owners,
//! registries, the broadcaster, schedules, tickers).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                 Receivers (any number):
//!   Owner       ──┐
//!   Registry    ──┤
//!   Broadcaster ──┼──────► Bus ───────► Coordinator::events() ──► user code
//!   Schedule    ──┤  (broadcast chan)
//!   Ticker      ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active receivers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for coordinator events.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
/// - **Runtime-free**: publishing works without a tokio runtime.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity.
    ///
    /// The minimum capacity is 1 (clamped).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn publish_without_receivers_is_silent() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::ListenerDetached));
        assert_eq!(bus.receiver_count(), 0);
    }

    #[test]
    fn receivers_see_later_events() {
        let bus = Bus::new(4);
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::OwnerMounted).with_owner("a"));
        let ev = rx.try_recv().expect("event");
        assert_eq!(ev.kind, EventKind::OwnerMounted);
        assert_eq!(ev.owner.as_deref(), Some("a"));
    }
}
