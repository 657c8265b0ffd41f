//! # Coordinator: wires the bus, reporters, broadcaster and scheduler together.
//!
//! The [`Coordinator`] is the entry point of the crate. It owns one liveness
//! [`Broadcaster`] (shared by every schedule of every owner), the event
//! [`Bus`], the [`ReporterSet`] and the live-resource [`Gauges`]. Feature
//! instances are created with [`Coordinator::mount`].
//!
//! ## High-level architecture
//! ```text
//! Coordinator::builder(cfg, source).build()
//!   ├─► Bus (broadcast events)
//!   ├─► ReporterSet (faults → Report impls + bus)
//!   ├─► Broadcaster (one listener on the source, attached lazily)
//!   └─► VisibilityScheduler
//!
//! mount("dashboard") ──► Owner
//!                          ├─ DisposableRegistry
//!                          │    ├─ "ws"               (user resource)
//!                          │    ├─ "refresh#liveness" (broadcaster subscription)
//!                          │    └─ "refresh"          (ticker task, only while Running)
//!                          └─ unmount() ──► dispose_all()
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use tickvisor::{Config, Coordinator, Liveness, ManualSource, Phase, TickFn, TickRef};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = ManualSource::new(Liveness::Active);
//!     let coord = Coordinator::builder(Config::default(), Arc::new(source.clone())).build();
//!
//!     let owner = coord.mount("dashboard");
//!     let tick: TickRef = TickFn::arc("refresh", |_ctx: CancellationToken| async move {
//!         Ok::<(), tickvisor::TickError>(())
//!     });
//!     owner.schedule("refresh", coord.spec(tick, Duration::from_secs(30), true))?;
//!     assert_eq!(owner.phase("refresh"), Phase::Running);
//!
//!     source.set(Liveness::Inactive);
//!     assert_eq!(owner.phase("refresh"), Phase::Waiting);
//!
//!     owner.unmount();
//!     assert_eq!(coord.gauges().snapshot().timers, 0);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::broadcast;

use crate::core::broadcaster::Broadcaster;
use crate::core::builder::CoordinatorBuilder;
use crate::core::config::Config;
use crate::core::gauge::Gauges;
use crate::core::owner::Owner;
use crate::core::registry::DisposableRegistry;
use crate::core::scheduler::VisibilityScheduler;
use crate::events::{Bus, Event};
use crate::liveness::{Liveness, LivenessSource};
use crate::reporters::ReporterSet;
use crate::schedule::{ScheduleSpec, TickRef};

/// Owns the shared pieces every [`Owner`] is built from.
pub struct Coordinator {
    cfg: Config,
    bus: Bus,
    reporters: ReporterSet,
    broadcaster: Broadcaster,
    scheduler: VisibilityScheduler,
    gauges: Gauges,
    next_owner: AtomicU64,
}

impl Coordinator {
    /// Creates a builder for a coordinator over `source`.
    pub fn builder(cfg: Config, source: Arc<dyn LivenessSource>) -> CoordinatorBuilder {
        CoordinatorBuilder::new(cfg, source)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        reporters: ReporterSet,
        source: Arc<dyn LivenessSource>,
    ) -> Self {
        let gauges = Gauges::new();
        let broadcaster = Broadcaster::new(source, reporters.clone());
        let scheduler = VisibilityScheduler::new(broadcaster.clone(), gauges.clone());
        Self {
            cfg,
            bus,
            reporters,
            broadcaster,
            scheduler,
            gauges,
            next_owner: AtomicU64::new(1),
        }
    }

    /// Mounts a new owner named `name`.
    ///
    /// Names need not be unique; every owner gets its own id and registry.
    pub fn mount(&self, name: impl Into<Arc<str>>) -> Owner {
        let name = name.into();
        let id = self.next_owner.fetch_add(1, Ordering::Relaxed);
        let registry = DisposableRegistry::new(name.clone(), self.reporters.clone());
        Owner::mount(id, name, registry, self.scheduler.clone(), self.gauges.clone())
    }

    /// Builds a [`ScheduleSpec`] using this coordinator's default policies.
    pub fn spec(
        &self,
        tick: TickRef,
        interval: Duration,
        fire_immediately_on_resume: bool,
    ) -> ScheduleSpec {
        ScheduleSpec::with_defaults(tick, interval, fire_immediately_on_resume, &self.cfg)
    }

    /// Subscribes to the event bus.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// The shared liveness broadcaster.
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// The scheduler used by [`Owner::schedule`].
    pub fn scheduler(&self) -> &VisibilityScheduler {
        &self.scheduler
    }

    /// Live-resource counters.
    pub fn gauges(&self) -> &Gauges {
        &self.gauges
    }

    /// Configuration this coordinator was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Current liveness as seen by the broadcaster.
    pub fn liveness(&self) -> Liveness {
        self.broadcaster.current()
    }

    /// Fault reporters (also usable to report application faults).
    pub fn reporters(&self) -> &ReporterSet {
        &self.reporters
    }
}
