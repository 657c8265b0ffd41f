//! # Live resource gauges.
//!
//! Counts what a coordinator currently holds so teardown can be verified from
//! the outside (no timer or subscription may outlive its owner).
//!
//! ## Architecture
//! ```text
//! Coordinator::mount ──► owners += 1        Owner::unmount ──► owners -= 1
//! timer entry setup  ──► timers += 1        timer cleanup  ──► timers -= 1
//! schedule subscribe ──► subscriptions += 1 unsubscribe    ──► subscriptions -= 1
//! ```
//!
//! ## Rules
//! - Increments happen after the resource exists, decrements after it is gone.
//! - Reads are point-in-time snapshots.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct Counters {
    owners: AtomicUsize,
    timers: AtomicUsize,
    subscriptions: AtomicUsize,
}

/// Point-in-time copy of the gauges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GaugeSnapshot {
    /// Owners mounted and not yet unmounted.
    pub owners: usize,
    /// Ticker tasks currently armed.
    pub timers: usize,
    /// Schedule subscriptions currently held on the broadcaster.
    pub subscriptions: usize,
}

/// Shared live-resource counters. Cheap to clone; clones share counters.
#[derive(Clone, Default)]
pub struct Gauges {
    inner: Arc<Counters>,
}

impl Gauges {
    /// Creates zeroed gauges.
    pub fn new() -> Self {
        Self::default()
    }

    /// Owners mounted and not yet unmounted.
    pub fn owners(&self) -> usize {
        self.inner.owners.load(Ordering::SeqCst)
    }

    /// Armed ticker tasks.
    pub fn timers(&self) -> usize {
        self.inner.timers.load(Ordering::SeqCst)
    }

    /// Live schedule subscriptions.
    pub fn subscriptions(&self) -> usize {
        self.inner.subscriptions.load(Ordering::SeqCst)
    }

    /// Returns all counters at once.
    pub fn snapshot(&self) -> GaugeSnapshot {
        GaugeSnapshot {
            owners: self.owners(),
            timers: self.timers(),
            subscriptions: self.subscriptions(),
        }
    }

    pub(crate) fn owner_mounted(&self) {
        self.inner.owners.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn owner_unmounted(&self) {
        self.inner.owners.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn timer_armed(&self) {
        self.inner.timers.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn timer_disarmed(&self) {
        self.inner.timers.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn subscribed(&self) {
        self.inner.subscriptions.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn unsubscribed(&self) {
        self.inner.subscriptions.fetch_sub(1, Ordering::SeqCst);
    }
}
