//! # Owner: the mount/unmount boundary of one feature instance.
//!
//! An [`Owner`] is created by [`Coordinator::mount`](crate::Coordinator::mount)
//! and owns exactly one [`DisposableRegistry`]. Everything the feature
//! registers (plain disposables and schedules) lives in that registry and is
//! released by [`Owner::unmount`].
//!
//! ## Lifecycle
//! ```text
//! Coordinator::mount(name) ──► Owner (Mounted) ──► OwnerMounted
//!        add / dispose / schedule / stop ...
//! Owner::unmount() or drop ──► registry.dispose_all() ──► Unmounted ──► OwnerUnmounted
//!        add / schedule ──► Err(CoordError::Unmounted)
//!        dispose / stop / unmount ──► no-op
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::core::gauge::Gauges;
use crate::core::registry::{DisposableRegistry, Disposer};
use crate::core::scheduler::{Phase, SUBSCRIPTION_SUFFIX, ScheduleHandle, VisibilityScheduler};
use crate::error::{BoxError, CoordError};
use crate::events::{Event, EventKind};
use crate::schedule::ScheduleSpec;

/// Lifecycle state of an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerState {
    /// Accepting resources.
    Mounted,
    /// Torn down; inert.
    Unmounted,
}

/// Live schedules of one owner, by schedule key.
pub(crate) type ScheduleMap = Mutex<HashMap<String, ScheduleHandle>>;

/// A logical feature instance with its own registry.
///
/// Dropping an owner unmounts it.
pub struct Owner {
    id: u64,
    name: Arc<str>,
    registry: Arc<DisposableRegistry>,
    scheduler: VisibilityScheduler,
    schedules: Arc<ScheduleMap>,
    mounted: AtomicBool,
    gauges: Gauges,
}

impl Owner {
    pub(crate) fn mount(
        id: u64,
        name: Arc<str>,
        registry: DisposableRegistry,
        scheduler: VisibilityScheduler,
        gauges: Gauges,
    ) -> Self {
        gauges.owner_mounted();
        tracing::debug!(target: "tickvisor", owner = %name, id, "owner mounted");
        registry
            .reporters()
            .bus()
            .publish(Event::new(EventKind::OwnerMounted).with_owner(name.clone()));

        Self {
            id,
            name,
            registry: Arc::new(registry),
            scheduler,
            schedules: Arc::new(Mutex::new(HashMap::new())),
            mounted: AtomicBool::new(true),
            gauges,
        }
    }

    /// Unique id assigned by the coordinator.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Owner name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lifecycle state.
    pub fn state(&self) -> OwnerState {
        if self.is_mounted() {
            OwnerState::Mounted
        } else {
            OwnerState::Unmounted
        }
    }

    /// Returns true until [`unmount`](Self::unmount) runs.
    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// Registers a resource under `key` (see [`DisposableRegistry::add`]).
    ///
    /// Fails with [`CoordError::Unmounted`] after unmount, and with
    /// [`CoordError::ReservedKey`] if `key` is the key of a live schedule or
    /// ends with `#liveness`.
    pub fn add<F, E>(&self, key: impl Into<String>, setup: F) -> Result<(), CoordError>
    where
        F: FnOnce() -> Result<Disposer, E>,
        E: Into<BoxError>,
    {
        self.ensure_mounted()?;
        let key = key.into();
        if key.ends_with(SUBSCRIPTION_SUFFIX) || self.lock_schedules().contains_key(&key) {
            return Err(CoordError::ReservedKey { key });
        }
        self.registry.add(key, setup)
    }

    /// Disposes the entry under `key`. Returns false if there was none.
    ///
    /// Either key of a live schedule (`key` or `key#liveness`) stops the
    /// whole schedule, as [`stop`](Self::stop) does.
    pub fn dispose(&self, key: &str) -> bool {
        match self.schedule_key_of(key) {
            Some(schedule) => self.stop(&schedule),
            None => self.registry.dispose(key),
        }
    }

    /// Disposes every entry, keeping the owner mounted.
    pub fn dispose_all(&self) -> usize {
        let disposed = self.registry.dispose_all();
        self.lock_schedules().clear();
        disposed
    }

    /// Starts a liveness-aware schedule under `key`.
    pub fn schedule(
        &self,
        key: impl Into<String>,
        spec: ScheduleSpec,
    ) -> Result<ScheduleHandle, CoordError> {
        self.scheduler.start(self, key, spec)
    }

    /// Stops the schedule under `key`. Idempotent.
    pub fn stop(&self, key: &str) -> bool {
        self.scheduler.stop(self, key)
    }

    /// Phase of the schedule under `key` ([`Phase::Stopped`] if unknown).
    pub fn phase(&self, key: &str) -> Phase {
        self.scheduler.phase(self, key)
    }

    /// Handle of the schedule under `key`, if one was started.
    pub fn schedule_handle(&self, key: &str) -> Option<ScheduleHandle> {
        self.lock_schedules().get(key).cloned()
    }

    /// Returns true if an entry exists under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.registry.contains(key)
    }

    /// Entry keys in insertion order (schedules show up as `key` and `key#liveness`).
    pub fn keys(&self) -> Vec<String> {
        self.registry.keys()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns true if the owner holds no entries.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Tears the owner down: disposes every entry exactly once.
    ///
    /// Returns false if the owner was already unmounted.
    pub fn unmount(&self) -> bool {
        if !self.mounted.swap(false, Ordering::SeqCst) {
            return false;
        }

        let disposed = self.registry.dispose_all();
        self.lock_schedules().clear();
        self.gauges.owner_unmounted();

        tracing::debug!(target: "tickvisor", owner = %self.name, id = self.id, disposed, "owner unmounted");
        self.registry
            .reporters()
            .bus()
            .publish(Event::new(EventKind::OwnerUnmounted).with_owner(self.name.clone()));
        true
    }

    // ---------------------------
    // Crate-internal (scheduler)
    // ---------------------------

    pub(crate) fn ensure_mounted(&self) -> Result<(), CoordError> {
        if self.is_mounted() {
            Ok(())
        } else {
            Err(CoordError::Unmounted {
                owner: self.name.to_string(),
            })
        }
    }

    pub(crate) fn registry(&self) -> &Arc<DisposableRegistry> {
        &self.registry
    }

    pub(crate) fn track(&self, key: String, handle: ScheduleHandle) {
        self.lock_schedules().insert(key, handle);
    }

    pub(crate) fn untrack(&self, key: &str) -> Option<ScheduleHandle> {
        self.lock_schedules().remove(key)
    }

    pub(crate) fn schedules(&self) -> Weak<ScheduleMap> {
        Arc::downgrade(&self.schedules)
    }

    /// Schedule key that `key` belongs to, if it names a live schedule entry.
    fn schedule_key_of(&self, key: &str) -> Option<String> {
        let schedules = self.lock_schedules();
        if schedules.contains_key(key) {
            return Some(key.to_string());
        }
        key.strip_suffix(SUBSCRIPTION_SUFFIX)
            .filter(|schedule| schedules.contains_key(*schedule))
            .map(str::to_string)
    }

    fn lock_schedules(&self) -> MutexGuard<'_, HashMap<String, ScheduleHandle>> {
        self.schedules.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Owner {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owner")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state())
            .field("keys", &self.keys())
            .finish()
    }
}
