//! # Manually driven liveness source.
//!
//! [`ManualSource`] holds the state in memory and notifies every attached
//! listener synchronously from [`ManualSource::set`]. Embedders that already
//! receive focus/visibility events on their own loop push them here; tests use
//! it to drive transitions deterministically.
//!
//! ## Rules
//! - `set` notifies even when the state did not change (at-least-once delivery).
//! - Listeners are invoked outside the internal lock, in attach order.
//! - Attach/detach totals are counted so callers can verify that only one
//!   listener is ever attached by the broadcaster.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::source::{Detach, Liveness, LivenessSource, Listener};
use crate::error::BoxError;

struct State {
    current: Liveness,
    listeners: Vec<(u64, Listener)>,
    next_id: u64,
}

struct Shared {
    state: Mutex<State>,
    attached_total: AtomicU64,
    detached_total: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory liveness source. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ManualSource {
    shared: Arc<Shared>,
}

impl ManualSource {
    /// Creates a source with the given initial state.
    pub fn new(initial: Liveness) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    current: initial,
                    listeners: Vec::new(),
                    next_id: 0,
                }),
                attached_total: AtomicU64::new(0),
                detached_total: AtomicU64::new(0),
            }),
        }
    }

    /// Updates the state and notifies every listener.
    pub fn set(&self, next: Liveness) {
        let listeners: Vec<Listener> = {
            let mut st = self.shared.lock();
            st.current = next;
            st.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in listeners {
            listener(next);
        }
    }

    /// Number of listeners currently attached.
    pub fn listener_count(&self) -> usize {
        self.shared.lock().listeners.len()
    }

    /// Total number of `on_change` calls so far.
    pub fn attached_total(&self) -> u64 {
        self.shared.attached_total.load(Ordering::Relaxed)
    }

    /// Total number of detaches so far.
    pub fn detached_total(&self) -> u64 {
        self.shared.detached_total.load(Ordering::Relaxed)
    }
}

impl Default for ManualSource {
    fn default() -> Self {
        Self::new(Liveness::Active)
    }
}

impl LivenessSource for ManualSource {
    fn current(&self) -> Liveness {
        self.shared.lock().current
    }

    fn on_change(&self, listener: Listener) -> Result<Detach, BoxError> {
        let id = {
            let mut st = self.shared.lock();
            let id = st.next_id;
            st.next_id += 1;
            st.listeners.push((id, listener));
            id
        };
        self.shared.attached_total.fetch_add(1, Ordering::Relaxed);

        let shared = Arc::downgrade(&self.shared);
        Ok(Detach::new(move || {
            if let Some(shared) = shared.upgrade() {
                let removed = {
                    let mut st = shared.lock();
                    let before = st.listeners.len();
                    st.listeners.retain(|(lid, _)| *lid != id);
                    before != st.listeners.len()
                };
                if removed {
                    shared.detached_total.fetch_add(1, Ordering::Relaxed);
                }
            }
        }))
    }

    fn name(&self) -> &'static str {
        "manual"
    }
}
