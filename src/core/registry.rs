//! # Disposable registry - keyed, exactly-once cleanup of owner resources.
//!
//! Every resource an owner holds (timer, liveness subscription, socket, ...)
//! is registered under a key together with the closure that releases it.
//!
//! ## Architecture
//! ```text
//! add(key, setup)
//!   ├─► dispose(key)            (replace: old cleanup runs before new setup)
//!   ├─► setup() ──► Err ──► CoordError::Setup, nothing stored
//!   │           └─► Ok(Disposer) ──► stored under key, EntryAdded
//!   │
//! dispose(key) ──► remove entry ──► run cleanup ──► fail? → Fault::Cleanup
//! dispose_all() ──► drain in insertion order ──► same as dispose(key)
//! ```
//!
//! ## Rules
//! - At most one live entry per key.
//! - Cleanup failure (error or panic) never blocks removal; it is reported.
//! - No internal lock is held while user code (setup or cleanup) runs, so a
//!   cleanup may call back into the registry.
//! - `dispose_all` is idempotent and the registry stays usable afterwards.

use std::fmt;
use std::mem;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{BoxError, CoordError, Fault, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::reporters::ReporterSet;

enum Release {
    Nothing,
    Infallible(Box<dyn FnOnce() + Send + 'static>),
    Fallible(Box<dyn FnOnce() -> Result<(), BoxError> + Send + 'static>),
}

/// Cleanup returned by a setup function.
///
/// ## Example
/// ```rust
/// use tickvisor::Disposer;
///
/// let nothing = Disposer::none();
/// let close = Disposer::new(|| { /* close socket */ });
/// let flush = Disposer::try_new(|| std::fs::remove_file("/tmp/tickvisor.lock"));
/// # let _ = (nothing, close, flush);
/// ```
pub struct Disposer(Release);

impl Disposer {
    /// No cleanup needed.
    pub fn none() -> Self {
        Self(Release::Nothing)
    }

    /// Cleanup that cannot fail (a panic is still caught and reported).
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Release::Infallible(Box::new(f)))
    }

    /// Cleanup that may fail; an `Err` is reported as [`Fault::Cleanup`].
    pub fn try_new<E>(f: impl FnOnce() -> Result<(), E> + Send + 'static) -> Self
    where
        E: Into<BoxError>,
    {
        Self(Release::Fallible(Box::new(move || f().map_err(Into::into))))
    }

    /// Runs the cleanup, converting errors and panics into a message.
    fn run(self) -> Result<(), String> {
        match self.0 {
            Release::Nothing => Ok(()),
            Release::Infallible(f) => {
                catch_unwind(AssertUnwindSafe(f)).map_err(|p| panic_message(p.as_ref()))
            }
            Release::Fallible(f) => match catch_unwind(AssertUnwindSafe(f)) {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.to_string()),
                Err(p) => Err(panic_message(p.as_ref())),
            },
        }
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.0 {
            Release::Nothing => "none",
            Release::Infallible(_) => "infallible",
            Release::Fallible(_) => "fallible",
        };
        f.debug_tuple("Disposer").field(&kind).finish()
    }
}

struct Entry {
    key: String,
    disposer: Disposer,
}

/// Per-owner keyed store of cleanup callbacks.
pub struct DisposableRegistry {
    owner: Arc<str>,
    entries: Mutex<Vec<Entry>>,
    reporters: ReporterSet,
}

impl DisposableRegistry {
    /// Creates an empty registry for `owner`; faults go to `reporters`.
    pub fn new(owner: impl Into<Arc<str>>, reporters: ReporterSet) -> Self {
        Self {
            owner: owner.into(),
            entries: Mutex::new(Vec::new()),
            reporters,
        }
    }

    /// Name of the owning owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Registers a resource under `key`.
    ///
    /// Any entry already stored under `key` is disposed **before** `setup`
    /// runs. `setup` runs synchronously, exactly once. If it returns `Err`,
    /// the error is returned as [`CoordError::Setup`] and nothing is stored;
    /// a panic in `setup` propagates to the caller.
    pub fn add<F, E>(&self, key: impl Into<String>, setup: F) -> Result<(), CoordError>
    where
        F: FnOnce() -> Result<Disposer, E>,
        E: Into<BoxError>,
    {
        let key = key.into();
        if key.is_empty() {
            return Err(CoordError::EmptyKey);
        }

        self.dispose(&key);

        let disposer = setup().map_err(|e| CoordError::Setup {
            key: key.clone(),
            source: e.into(),
        })?;

        // setup may have re-registered the same key; the newest entry wins.
        let displaced = {
            let mut entries = self.lock();
            let displaced = entries
                .iter()
                .position(|e| e.key == key)
                .map(|pos| entries.remove(pos));
            entries.push(Entry {
                key: key.clone(),
                disposer,
            });
            displaced
        };
        if let Some(entry) = displaced {
            self.release(entry);
        }

        tracing::trace!(target: "tickvisor", owner = %self.owner, %key, "entry added");
        self.bus()
            .publish(Event::new(EventKind::EntryAdded).with_owner(self.owner.clone()).with_key(key));
        Ok(())
    }

    /// Removes the entry under `key` and runs its cleanup.
    ///
    /// Returns `false` (and does nothing) if no entry exists.
    pub fn dispose(&self, key: &str) -> bool {
        let entry = {
            let mut entries = self.lock();
            match entries.iter().position(|e| e.key == key) {
                Some(pos) => entries.remove(pos),
                None => return false,
            }
        };
        self.release(entry);
        true
    }

    /// Disposes every entry in insertion order. Returns how many were disposed.
    ///
    /// Entries registered by a cleanup while this runs are disposed too, so
    /// the registry is empty on return.
    pub fn dispose_all(&self) -> usize {
        let mut disposed = 0;
        loop {
            let drained = mem::take(&mut *self.lock());
            if drained.is_empty() {
                return disposed;
            }
            disposed += drained.len();
            for entry in drained {
                self.release(entry);
            }
        }
    }

    /// Returns true if an entry exists under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().iter().any(|e| e.key == key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.key.clone()).collect()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub(crate) fn reporters(&self) -> &ReporterSet {
        &self.reporters
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bus(&self) -> &Bus {
        self.reporters.bus()
    }

    /// Runs a removed entry's cleanup, reporting failures.
    fn release(&self, entry: Entry) {
        let Entry { key, disposer } = entry;
        if let Err(error) = disposer.run() {
            self.reporters.report(Fault::Cleanup {
                owner: self.owner.to_string(),
                key: key.clone(),
                error,
            });
        }
        tracing::trace!(target: "tickvisor", owner = %self.owner, %key, "entry disposed");
        self.bus().publish(
            Event::new(EventKind::EntryDisposed)
                .with_owner(self.owner.clone())
                .with_key(key),
        );
    }
}

impl Drop for DisposableRegistry {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

impl fmt::Debug for DisposableRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposableRegistry")
            .field("owner", &self.owner)
            .field("keys", &self.keys())
            .finish()
    }
}
