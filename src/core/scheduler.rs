//! # Visibility-aware scheduler.
//!
//! Runs a periodic tick only while the liveness signal is active, using two
//! entries in the owner's [`DisposableRegistry`]:
//!
//! - `"{key}#liveness"` - the broadcaster subscription (lives from start to stop)
//! - `"{key}"` - the armed timer (lives only while Running)
//!
//! ## State machine
//! ```text
//!              start()                     Active
//!   Stopped ──────────► [initial state] ───────────► Running ◄──┐
//!      ▲                      │ Inactive                 │      │ Active
//!      │                      ▼                 Inactive │      │ (fire now if
//!      │                   Waiting ◄─────────────────────┘      │  resume flag)
//!      │                      └─────────────────────────────────┘
//!      └──── stop() / owner unmount (from any state, idempotent)
//! ```
//!
//! ## Rules
//! - Entering Running registers the timer under `key`; registry replace
//!   semantics guarantee at most one live timer per `(owner, key)`.
//! - Leaving Running disposes the timer entry synchronously; no tick fires
//!   after that point until the next resume.
//! - The initial Active delivery never fires immediately; only a
//!   Waiting → Running resume honors `fire_immediately_on_resume`.
//! - A failing tick never changes the phase.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::runtime::Handle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::broadcaster::Broadcaster;
use crate::core::gauge::Gauges;
use crate::core::owner::{Owner, ScheduleMap};
use crate::core::registry::{DisposableRegistry, Disposer};
use crate::core::ticker::{TickStats, Ticker};
use crate::error::{CoordError, Fault};
use crate::events::{Event, EventKind};
use crate::liveness::Liveness;
use crate::schedule::ScheduleSpec;

/// Suffix of the registry key holding a schedule's liveness subscription.
pub(crate) const SUBSCRIPTION_SUFFIX: &str = "#liveness";

/// Registry key of the subscription entry for schedule `key`.
pub(crate) fn subscription_key(key: &str) -> String {
    format!("{key}{SUBSCRIPTION_SUFFIX}")
}

/// Observable phase of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No timer and no subscription.
    Stopped,
    /// Subscribed, signal inactive, no timer.
    Waiting,
    /// Subscribed, signal active, timer armed.
    Running,
}

impl Phase {
    /// Short stable label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Stopped => "stopped",
            Phase::Waiting => "waiting",
            Phase::Running => "running",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Subscribed, initial state not delivered yet.
    Pending,
    Waiting,
    Running,
    /// Terminal.
    Stopped,
}

enum Transition {
    Arm { resume: bool },
    Disarm,
}

struct HandleState {
    owner: Arc<str>,
    key: Arc<str>,
    spec: ScheduleSpec,
    stage: Mutex<Stage>,
    stats: Arc<TickStats>,
    registry: Weak<DisposableRegistry>,
    gauges: Gauges,
    rt: Handle,
}

impl HandleState {
    fn lock(&self) -> MutexGuard<'_, Stage> {
        self.stage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Broadcaster callback: drives the state machine.
    fn on_liveness(&self, state: Liveness) {
        let transition = {
            let mut stage = self.lock();
            match (*stage, state) {
                (Stage::Pending, Liveness::Active) => {
                    *stage = Stage::Running;
                    Some(Transition::Arm { resume: false })
                }
                (Stage::Pending, Liveness::Inactive) => {
                    *stage = Stage::Waiting;
                    None
                }
                (Stage::Waiting, Liveness::Active) => {
                    *stage = Stage::Running;
                    Some(Transition::Arm { resume: true })
                }
                (Stage::Running, Liveness::Inactive) => {
                    *stage = Stage::Waiting;
                    Some(Transition::Disarm)
                }
                _ => None,
            }
        };

        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        match transition {
            Some(Transition::Arm { resume }) => self.arm(&registry, resume),
            Some(Transition::Disarm) => {
                registry.dispose(&self.key);
                tracing::debug!(target: "tickvisor", owner = %self.owner, key = %self.key, "schedule suspended");
                self.publish(&registry, EventKind::ScheduleSuspended);
            }
            None => {}
        }
    }

    /// Registers the timer entry under `key`.
    fn arm(&self, registry: &DisposableRegistry, resume: bool) {
        let immediate = resume && self.spec.fire_immediately_on_resume();
        let armed = registry.add(self.key.to_string(), || {
            let token = CancellationToken::new();
            let ticker = Ticker {
                owner: self.owner.clone(),
                key: self.key.clone(),
                tick: self.spec.tick().clone(),
                period: self.spec.interval(),
                overlap: self.spec.overlap(),
                missed_ticks: self.spec.missed_ticks(),
                stats: Arc::clone(&self.stats),
                reporters: registry.reporters().clone(),
                token: token.clone(),
                rt: self.rt.clone(),
            };

            let start = Instant::now();
            if immediate {
                ticker.fire();
            }
            let join = self.rt.spawn(ticker.run(start));
            self.gauges.timer_armed();

            let gauges = self.gauges.clone();
            Ok::<_, CoordError>(Disposer::new(move || {
                token.cancel();
                join.abort();
                gauges.timer_disarmed();
            }))
        });

        match armed {
            Ok(()) => {
                // an immediate tick may have stopped or suspended the schedule during setup.
                if *self.lock() != Stage::Running {
                    registry.dispose(&self.key);
                    return;
                }
                if resume {
                    tracing::debug!(target: "tickvisor", owner = %self.owner, key = %self.key, immediate, "schedule resumed");
                    self.publish(registry, EventKind::ScheduleResumed);
                }
            }
            Err(e) => {
                {
                    let mut stage = self.lock();
                    if *stage == Stage::Running {
                        *stage = Stage::Waiting;
                    }
                }
                registry.reporters().report(Fault::Callback {
                    owner: self.owner.to_string(),
                    key: self.key.to_string(),
                    error: format!("arming timer failed: {e}"),
                });
            }
        }
    }

    /// Moves to the terminal stage. Returns the previous stage.
    fn halt(&self) -> Stage {
        std::mem::replace(&mut *self.lock(), Stage::Stopped)
    }

    fn phase(&self) -> Phase {
        match *self.lock() {
            Stage::Pending | Stage::Stopped => Phase::Stopped,
            Stage::Waiting => Phase::Waiting,
            Stage::Running => Phase::Running,
        }
    }

    fn publish(&self, registry: &DisposableRegistry, kind: EventKind) {
        registry.reporters().bus().publish(
            Event::new(kind)
                .with_owner(self.owner.clone())
                .with_key(self.key.clone()),
        );
    }
}

/// Handle to a started schedule.
///
/// Cheap to clone. Stays valid after the schedule stops (then reports
/// [`Phase::Stopped`]).
#[derive(Clone)]
pub struct ScheduleHandle {
    inner: Arc<HandleState>,
}

impl ScheduleHandle {
    /// Schedule key.
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Name of the owning owner.
    pub fn owner(&self) -> &str {
        &self.inner.owner
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.inner.phase()
    }

    /// The spec the schedule was started with.
    pub fn spec(&self) -> &ScheduleSpec {
        &self.inner.spec
    }

    /// Ticks fired so far (including immediate resume fires).
    pub fn fired(&self) -> u64 {
        self.inner.stats.fired()
    }

    /// Ticks skipped by [`OverlapPolicy::SkipIfInFlight`](crate::OverlapPolicy::SkipIfInFlight).
    pub fn skipped(&self) -> u64 {
        self.inner.stats.skipped()
    }

    /// Tick futures that have not completed yet.
    pub fn in_flight(&self) -> usize {
        self.inner.stats.in_flight()
    }

    /// Stops this schedule and removes it from its owner. Idempotent;
    /// returns true if it was live.
    pub fn stop(&self) -> bool {
        // a stopped handle must not touch a newer schedule under the same key.
        if *self.inner.lock() == Stage::Stopped {
            return false;
        }
        match self.inner.registry.upgrade() {
            Some(registry) => registry.dispose(&subscription_key(&self.inner.key)),
            None => false,
        }
    }
}

impl fmt::Debug for ScheduleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleHandle")
            .field("owner", &self.inner.owner)
            .field("key", &self.inner.key)
            .field("phase", &self.phase())
            .field("fired", &self.fired())
            .finish()
    }
}

/// Starts and stops liveness-aware schedules on owners.
///
/// Usually reached through [`Owner::schedule`] / [`Owner::stop`].
#[derive(Clone)]
pub struct VisibilityScheduler {
    broadcaster: Broadcaster,
    gauges: Gauges,
}

impl VisibilityScheduler {
    pub(crate) fn new(broadcaster: Broadcaster, gauges: Gauges) -> Self {
        Self {
            broadcaster,
            gauges,
        }
    }

    /// Starts `spec` on `owner` under `key`.
    ///
    /// Any schedule already running under `key` is stopped first. Keys ending
    /// with `#liveness` are rejected with [`CoordError::ReservedKey`]. Must be
    /// called from within a tokio runtime; the runtime is captured and used
    /// for every timer this schedule arms.
    pub fn start(
        &self,
        owner: &Owner,
        key: impl Into<String>,
        spec: ScheduleSpec,
    ) -> Result<ScheduleHandle, CoordError> {
        let key = key.into();
        owner.ensure_mounted()?;
        if key.is_empty() {
            return Err(CoordError::EmptyKey);
        }
        if key.ends_with(SUBSCRIPTION_SUFFIX) {
            return Err(CoordError::ReservedKey { key });
        }
        if spec.interval().is_zero() {
            return Err(CoordError::InvalidInterval { key });
        }
        let rt = Handle::try_current().map_err(|_| CoordError::NoRuntime)?;

        self.stop(owner, &key);

        let registry = owner.registry();
        let interval = spec.interval();
        let handle = ScheduleHandle {
            inner: Arc::new(HandleState {
                owner: Arc::from(owner.name()),
                key: Arc::from(key.as_str()),
                spec,
                stage: Mutex::new(Stage::Pending),
                stats: Arc::new(TickStats::default()),
                registry: Arc::downgrade(registry),
                gauges: self.gauges.clone(),
                rt,
            }),
        };

        let weak_registry = Arc::downgrade(registry);
        let schedules = owner.schedules();
        let gauges = self.gauges.clone();
        let state = Arc::clone(&handle.inner);
        registry.add(subscription_key(&key), || {
            let on_change = Arc::clone(&state);
            let subscription = self
                .broadcaster
                .subscribe(move |liveness| on_change.on_liveness(liveness));
            gauges.subscribed();

            Ok::<_, CoordError>(Disposer::new(move || {
                let was = state.halt();
                subscription.unsubscribe();
                gauges.unsubscribed();
                forget(&schedules, &state);
                if let Some(registry) = weak_registry.upgrade() {
                    if was == Stage::Running {
                        registry.dispose(&state.key);
                    }
                    state.publish(&registry, EventKind::ScheduleStopped);
                }
                tracing::debug!(target: "tickvisor", owner = %state.owner, key = %state.key, "schedule stopped");
            }))
        })?;

        owner.track(key.clone(), handle.clone());
        if *handle.inner.lock() == Stage::Stopped {
            // stopped from another thread before it was tracked.
            forget(&owner.schedules(), &handle.inner);
        }

        let initial = handle.phase();
        tracing::debug!(target: "tickvisor", owner = %owner.name(), %key, phase = %initial, "schedule started");
        registry.reporters().bus().publish(
            Event::new(EventKind::ScheduleStarted)
                .with_owner(owner.name())
                .with_key(key)
                .with_state(if initial == Phase::Running {
                    Liveness::Active
                } else {
                    Liveness::Inactive
                })
                .with_interval(interval),
        );
        Ok(handle)
    }

    /// Stops the schedule under `key` on `owner`.
    ///
    /// Disposes the timer (if armed) and the subscription. Idempotent;
    /// returns true if a schedule was live.
    pub fn stop(&self, owner: &Owner, key: &str) -> bool {
        let handle = owner.untrack(key);
        let stopped = owner.registry().dispose(&subscription_key(key));
        if let Some(handle) = handle {
            // the entry may already be gone (e.g. disposed by hand); make sure it is inert.
            if handle.inner.halt() == Stage::Running {
                owner.registry().dispose(key);
            }
        }
        stopped
    }

    /// Phase of the schedule under `key` on `owner`.
    pub fn phase(&self, owner: &Owner, key: &str) -> Phase {
        owner
            .schedule_handle(key)
            .map(|h| h.phase())
            .unwrap_or(Phase::Stopped)
    }
}

/// Removes `state` from its owner's schedule map, unless a newer schedule
/// has taken its key.
fn forget(schedules: &Weak<ScheduleMap>, state: &Arc<HandleState>) {
    let Some(schedules) = schedules.upgrade() else {
        return;
    };
    let mut schedules = schedules.lock().unwrap_or_else(PoisonError::into_inner);
    if schedules
        .get(&*state.key)
        .is_some_and(|tracked| Arc::ptr_eq(&tracked.inner, state))
    {
        schedules.remove(&*state.key);
    }
}
