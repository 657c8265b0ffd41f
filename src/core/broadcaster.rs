//! # Liveness broadcaster - one physical listener, many logical subscribers.
//!
//! [`Broadcaster`] presents every subscriber with a single consistent view of
//! one [`LivenessSource`] while attaching exactly one listener to it.
//!
//! ## Architecture
//! ```text
//! LivenessSource ──(one listener)──► Broadcaster::on_source_change(state)
//!                                          │ state == current? → dropped (dedup)
//!                                          │ current = state
//!                                          ├──► subscriber #0 (catch → Fault::Notify)
//!                                          ├──► subscriber #1
//!                                          └──► subscriber #N   (subscription order)
//! ```
//!
//! ## Rules
//! - **Reference counting**: the listener is attached on the 0→1 subscriber
//!   transition and detached on 1→0.
//! - **No missed initial value**: `subscribe` calls the new subscriber with the
//!   current state before returning.
//! - **Dedup**: redundant source notifications are not re-delivered, and no
//!   subscriber is ever handed the state it was last given.
//! - **Isolation**: a failing subscriber is reported; the others are still
//!   notified and `current` is updated regardless.
//! - **Freshness**: if a newer transition is fanned out while an older fan-out
//!   is still running (re-entrant change), the older fan-out stops, so no
//!   subscriber observes an older state after a newer one.
//! - **Attach failure**: a source that cannot register the listener is
//!   reported as [`Fault::Attach`]; subscribers still get the current state and
//!   the next subscribe retries.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::error::{Fault, panic_message};
use crate::events::{Event, EventKind};
use crate::liveness::{Detach, Liveness, LivenessSource, Listener};
use crate::reporters::ReporterSet;

/// Callback stored for each subscriber.
type Callback = Arc<dyn Fn(Liveness) + Send + Sync + 'static>;

struct Subscriber {
    id: u64,
    cb: Callback,
    /// Last state handed to `cb`.
    last: Option<Liveness>,
}

struct State {
    subscribers: Vec<Subscriber>,
    current: Liveness,
    /// `Some` while the underlying listener is attached.
    detach: Option<Detach>,
    /// Set while `on_change` is being called outside the lock.
    attaching: bool,
    /// Bumped on every genuine transition.
    epoch: u64,
    next_id: u64,
}

impl State {
    /// Marks `state` as delivered to subscriber `id`. Returns false if the
    /// subscriber is gone or was already given `state`.
    fn claim(&mut self, id: u64, state: Liveness) -> bool {
        match self.subscribers.iter_mut().find(|sub| sub.id == id) {
            Some(sub) if sub.last != Some(state) => {
                sub.last = Some(state);
                true
            }
            _ => false,
        }
    }
}

struct Shared {
    source: Arc<dyn LivenessSource>,
    state: Mutex<State>,
    reporters: ReporterSet,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Entry point of the single listener attached to the source.
    fn on_source_change(&self, next: Liveness) {
        let (epoch, targets) = {
            let mut st = self.lock();
            if st.detach.is_none() && !st.attaching {
                return;
            }
            if st.current == next {
                return;
            }
            st.current = next;
            st.epoch += 1;
            let targets: Vec<(u64, Callback)> = st
                .subscribers
                .iter()
                .map(|sub| (sub.id, Arc::clone(&sub.cb)))
                .collect();
            (st.epoch, targets)
        };

        tracing::debug!(target: "tickvisor", state = %next, subscribers = targets.len(), "liveness changed");
        self.reporters
            .bus()
            .publish(Event::new(EventKind::LivenessChanged).with_state(next));

        for (id, cb) in targets {
            {
                let mut st = self.lock();
                if st.epoch != epoch {
                    return;
                }
                if !st.claim(id, next) {
                    continue;
                }
            }
            self.deliver(id, &cb, next);
        }
    }

    fn deliver(&self, id: u64, cb: &Callback, state: Liveness) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| cb(state))) {
            self.reporters.report(Fault::Notify {
                subscriber: id,
                error: panic_message(payload.as_ref()),
            });
        }
    }

    fn unsubscribe(&self, id: u64) {
        let detach = {
            let mut st = self.lock();
            let before = st.subscribers.len();
            st.subscribers.retain(|sub| sub.id != id);
            if st.subscribers.len() == before {
                return;
            }
            if st.subscribers.is_empty() {
                st.detach.take()
            } else {
                None
            }
        };
        if let Some(detach) = detach {
            self.detach(detach);
        }
    }

    fn detach(&self, detach: Detach) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| detach.detach())) {
            self.reporters.report(Fault::Detach {
                error: panic_message(payload.as_ref()),
            });
        }
        tracing::debug!(target: "tickvisor", source = self.source.name(), "liveness listener detached");
        self.reporters
            .bus()
            .publish(Event::new(EventKind::ListenerDetached));
    }

    /// Attaches the single listener; called with the lock released.
    fn attach(self: &Arc<Self>) {
        let weak: Weak<Shared> = Arc::downgrade(self);
        let listener: Listener = Arc::new(move |next| {
            if let Some(shared) = weak.upgrade() {
                shared.on_source_change(next);
            }
        });

        let detach = match self.source.on_change(listener) {
            Ok(detach) => detach,
            Err(e) => {
                let current = self.source.current();
                {
                    let mut st = self.lock();
                    st.attaching = false;
                    st.current = current;
                }
                tracing::warn!(target: "tickvisor", source = self.source.name(), error = %e, "liveness listener not attached");
                self.reporters.report(Fault::Attach {
                    error: e.to_string(),
                });
                return;
            }
        };
        let current = self.source.current();

        let orphaned = {
            let mut st = self.lock();
            st.attaching = false;
            st.current = current;
            if st.subscribers.is_empty() {
                Some(detach)
            } else {
                st.detach = Some(detach);
                None
            }
        };

        tracing::debug!(target: "tickvisor", source = self.source.name(), state = %current, "liveness listener attached");
        self.reporters
            .bus()
            .publish(Event::new(EventKind::ListenerAttached).with_state(current));

        if let Some(detach) = orphaned {
            self.detach(detach);
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let st = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(detach) = st.detach.take() {
            detach.detach();
        }
    }
}

/// Reference-counted fan-out of one liveness source.
///
/// Cheap to clone; clones share subscribers and the attached listener. Create
/// one per source and hand clones to everything that needs the signal.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use tickvisor::{Broadcaster, Bus, Liveness, ManualSource, ReporterSet};
///
/// let source = ManualSource::new(Liveness::Active);
/// let b = Broadcaster::new(Arc::new(source.clone()), ReporterSet::new(vec![], Bus::new(16)));
///
/// let sub = b.subscribe(|state| println!("now {state}"));
/// assert_eq!(source.listener_count(), 1);
/// sub.unsubscribe();
/// assert_eq!(source.listener_count(), 0);
/// ```
#[derive(Clone)]
pub struct Broadcaster {
    shared: Arc<Shared>,
}

impl Broadcaster {
    /// Creates a broadcaster over `source`. Nothing is attached until the first subscriber.
    pub fn new(source: Arc<dyn LivenessSource>, reporters: ReporterSet) -> Self {
        let current = source.current();
        Self {
            shared: Arc::new(Shared {
                source,
                state: Mutex::new(State {
                    subscribers: Vec::new(),
                    current,
                    detach: None,
                    attaching: false,
                    epoch: 0,
                    next_id: 0,
                }),
                reporters,
            }),
        }
    }

    /// Subscribes `cb` to liveness transitions.
    ///
    /// `cb` is invoked with the current state before this returns, and then
    /// once per genuine transition. The returned [`Subscription`] unsubscribes
    /// when [`Subscription::unsubscribe`] is called or when it is dropped.
    pub fn subscribe<F>(&self, cb: F) -> Subscription
    where
        F: Fn(Liveness) + Send + Sync + 'static,
    {
        let cb: Callback = Arc::new(cb);
        let (id, needs_attach) = {
            let mut st = self.shared.lock();
            let id = st.next_id;
            st.next_id += 1;
            st.subscribers.push(Subscriber {
                id,
                cb: Arc::clone(&cb),
                last: None,
            });
            let needs_attach = st.detach.is_none() && !st.attaching;
            if needs_attach {
                st.attaching = true;
            }
            (id, needs_attach)
        };

        if needs_attach {
            self.shared.attach();
        }

        let initial = {
            let mut st = self.shared.lock();
            let current = st.current;
            st.claim(id, current).then_some(current)
        };
        if let Some(state) = initial {
            self.shared.deliver(id, &cb, state);
        }

        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
            done: AtomicBool::new(false),
        }
    }

    /// Last known state of the source.
    pub fn current(&self) -> Liveness {
        let st = self.shared.lock();
        if st.detach.is_some() {
            st.current
        } else {
            drop(st);
            self.shared.source.current()
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().subscribers.len()
    }

    /// Returns true while the underlying listener is attached.
    pub fn is_attached(&self) -> bool {
        self.shared.lock().detach.is_some()
    }
}

impl fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.shared.lock();
        f.debug_struct("Broadcaster")
            .field("source", &self.shared.source.name())
            .field("subscribers", &st.subscribers.len())
            .field("current", &st.current)
            .field("attached", &st.detach.is_some())
            .finish()
    }
}

/// Unsubscribe capability returned by [`Broadcaster::subscribe`].
///
/// Holds only a weak reference to the broadcaster. Unsubscribing more than
/// once is a no-op; dropping the guard unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
    done: AtomicBool,
}

impl Subscription {
    /// Subscriber id (as used in [`Fault::Notify`]).
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Removes the subscriber; detaches the source listener if it was the last one.
    pub fn unsubscribe(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            shared.unsubscribe(self.id);
        }
    }

    /// Returns true once `unsubscribe` ran.
    pub fn is_unsubscribed(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("done", &self.is_unsubscribed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Bus;
    use crate::liveness::ManualSource;
    use crate::reporters::Report;

    #[derive(Default)]
    struct Collect(Mutex<Vec<Fault>>);
    impl Report for Collect {
        fn report(&self, fault: &Fault) {
            self.0.lock().unwrap().push(fault.clone());
        }
    }

    fn setup(initial: Liveness) -> (ManualSource, Broadcaster, Arc<Collect>) {
        let source = ManualSource::new(initial);
        let collect = Arc::new(Collect::default());
        let b = Broadcaster::new(
            Arc::new(source.clone()),
            ReporterSet::new(vec![collect.clone()], Bus::new(64)),
        );
        (source, b, collect)
    }

    fn recording() -> (Arc<Mutex<Vec<Liveness>>>, impl Fn(Liveness) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        (seen, move |l| s.lock().unwrap().push(l))
    }

    #[test]
    fn initial_state_is_delivered_synchronously() {
        let (_src, b, _) = setup(Liveness::Inactive);
        let (seen, cb) = recording();
        let _sub = b.subscribe(cb);
        assert_eq!(*seen.lock().unwrap(), vec![Liveness::Inactive]);
    }

    #[test]
    fn single_listener_is_reference_counted() {
        let (src, b, _) = setup(Liveness::Active);
        assert_eq!(src.listener_count(), 0);

        let s1 = b.subscribe(|_| {});
        let s2 = b.subscribe(|_| {});
        assert_eq!(src.listener_count(), 1);
        assert_eq!(b.subscriber_count(), 2);

        s1.unsubscribe();
        s1.unsubscribe();
        assert_eq!(src.listener_count(), 1);

        drop(s2);
        assert_eq!(src.listener_count(), 0);
        assert!(!b.is_attached());

        let _s3 = b.subscribe(|_| {});
        assert_eq!(src.attached_total(), 2);
        assert_eq!(src.detached_total(), 1);
    }

    #[test]
    fn redundant_notifications_are_deduplicated() {
        let (src, b, _) = setup(Liveness::Active);
        let (seen, cb) = recording();
        let _sub = b.subscribe(cb);

        src.set(Liveness::Active);
        src.set(Liveness::Inactive);
        src.set(Liveness::Inactive);
        src.set(Liveness::Active);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Liveness::Active, Liveness::Inactive, Liveness::Active]
        );
    }

    #[test]
    fn failing_subscriber_does_not_block_others() {
        let (src, b, collect) = setup(Liveness::Active);
        let _bad = b.subscribe(|l| {
            if l == Liveness::Inactive {
                panic!("subscriber exploded");
            }
        });
        let (seen, cb) = recording();
        let _good = b.subscribe(cb);

        src.set(Liveness::Inactive);

        assert_eq!(b.current(), Liveness::Inactive);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Liveness::Active, Liveness::Inactive]
        );
        let faults = collect.0.lock().unwrap();
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].as_label(), "fault_notify");
    }

    #[test]
    fn subscribers_are_notified_in_order() {
        let (src, b, _) = setup(Liveness::Active);
        let order = Arc::new(Mutex::new(Vec::new()));
        let subs: Vec<Subscription> = (0..3)
            .map(|i| {
                let o = order.clone();
                b.subscribe(move |l| {
                    if l == Liveness::Inactive {
                        o.lock().unwrap().push(i);
                    }
                })
            })
            .collect();

        src.set(Liveness::Inactive);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        drop(subs);
        assert_eq!(src.listener_count(), 0);
    }

    #[test]
    fn subscriber_removed_mid_fanout_is_skipped() {
        let (src, b, _) = setup(Liveness::Active);
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let v = victim.clone();
        let _killer = b.subscribe(move |l| {
            if l == Liveness::Inactive {
                if let Some(sub) = v.lock().unwrap().take() {
                    sub.unsubscribe();
                }
            }
        });
        let (seen, cb) = recording();
        *victim.lock().unwrap() = Some(b.subscribe(cb));

        src.set(Liveness::Inactive);
        assert_eq!(*seen.lock().unwrap(), vec![Liveness::Active]);
    }

    #[test]
    fn reentrant_transition_wins() {
        let (src, b, _) = setup(Liveness::Active);
        let s = src.clone();
        let _flipper = b.subscribe(move |l| {
            if l == Liveness::Inactive {
                s.set(Liveness::Active);
            }
        });
        let (seen, cb) = recording();
        let _watcher = b.subscribe(cb);

        src.set(Liveness::Inactive);

        // the watcher never sees the stale `Inactive`, nor `Active` twice.
        assert_eq!(*seen.lock().unwrap(), vec![Liveness::Active]);
        assert_eq!(b.current(), Liveness::Active);
    }

    #[test]
    fn superseded_fanout_resumes_with_only_new_states() {
        let (src, b, _) = setup(Liveness::Active);
        let (first, cb) = recording();
        let _first = b.subscribe(cb);
        let s = src.clone();
        let _flipper = b.subscribe(move |l| {
            if l == Liveness::Inactive {
                s.set(Liveness::Active);
            }
        });
        let (last, cb) = recording();
        let _last = b.subscribe(cb);

        src.set(Liveness::Inactive);

        assert_eq!(
            *first.lock().unwrap(),
            vec![Liveness::Active, Liveness::Inactive, Liveness::Active]
        );
        assert_eq!(*last.lock().unwrap(), vec![Liveness::Active]);
    }

    #[test]
    fn failed_attach_is_reported_and_retried() {
        use crate::liveness::WatchSource;

        let (_tx, source) = WatchSource::channel(Liveness::Inactive);
        let collect = Arc::new(Collect::default());
        let b = Broadcaster::new(
            Arc::new(source),
            ReporterSet::new(vec![collect.clone()], Bus::new(16)),
        );

        let (seen, cb) = recording();
        let _sub = b.subscribe(cb);

        assert_eq!(*seen.lock().unwrap(), vec![Liveness::Inactive]);
        assert!(!b.is_attached());
        assert_eq!(b.subscriber_count(), 1);

        let _again = b.subscribe(|_| {});
        let faults = collect.0.lock().unwrap();
        assert_eq!(faults.len(), 2);
        assert!(faults.iter().all(|f| f.as_label() == "fault_attach"));
    }
}
