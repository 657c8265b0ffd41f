//! # tickvisor
//!
//! **Tickvisor** coordinates the lifetime of background resources that belong
//! to a logical owner (a screen, a widget, a session) and pauses periodic work
//! while nobody is looking.
//!
//! It provides four building blocks:
//! - a keyed disposable registry with replace semantics and total teardown;
//! - a reference-counted broadcaster over a binary liveness signal;
//! - a liveness-aware scheduler (Stopped / Waiting / Running);
//! - an owner lifecycle that tears everything down exactly once.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                ┌────────────────────────┐
//!                │ LivenessSource         │  (ManualSource, WatchSource, custom)
//!                │ current() / on_change()│
//!                └───────────┬────────────┘
//!                            │ exactly one listener while ≥1 subscriber
//!                            ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Coordinator                                                      │
//! │  - Broadcaster (dedup, sync initial delivery, fan-out)            │
//! │  - Bus (broadcast events)                                         │
//! │  - ReporterSet (background faults → Report impls)                 │
//! │  - Gauges (owners / timers / subscriptions)                       │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼ mount()          ▼ mount()          ▼ mount()
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │    Owner     │   │    Owner     │   │    Owner     │
//!     │  Registry    │   │  Registry    │   │  Registry    │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘
//!      │ "ws"             │ "poll#liveness"  │ ...
//!      │ "poll#liveness"  │ "poll" (Ticker)  │
//!      │ "poll" (Ticker)  │                  │
//!      ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                 (capacity: Config::bus_capacity)                  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Schedule lifecycle
//! ```text
//! Owner::schedule(key, spec)
//!   ├─► stop previous schedule under key (if any)
//!   ├─► registry.add("{key}#liveness", subscribe)
//!   │       └─ initial state delivered synchronously:
//!   │            Active   ─► Running: registry.add(key, Ticker)   (no immediate tick)
//!   │            Inactive ─► Waiting
//!   │
//!   ├─ Inactive while Running ─► registry.dispose(key)          ─► Waiting
//!   ├─ Active while Waiting   ─► registry.add(key, Ticker)      ─► Running
//!   │                             (+ immediate tick if fire_immediately_on_resume)
//!   └─ stop() / unmount       ─► dispose(key) + unsubscribe     ─► Stopped
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                              |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------------|
//! | **Lifecycle**     | Mount owners, register keyed resources, tear down once.      | [`Coordinator`], [`Owner`], [`Disposer`]        |
//! | **Liveness**      | Share one source listener across every consumer.             | [`LivenessSource`], [`Broadcaster`]             |
//! | **Scheduling**    | Periodic ticks that pause while the signal is inactive.      | [`ScheduleSpec`], [`Tick`], [`TickFn`]          |
//! | **Policies**      | Overlap and missed-tick handling.                            | [`OverlapPolicy`], [`MissedTickPolicy`]         |
//! | **Errors**        | Typed registration errors and reported background faults.    | [`CoordError`], [`Fault`], [`TickError`]        |
//! | **Observability** | Event bus, fault reporters and gauges.                       | [`Event`], [`Report`], [`Gauges`]               |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use tickvisor::{Config, Coordinator, Disposer, Liveness, ManualSource, TickFn, TickRef};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = ManualSource::new(Liveness::Active);
//!     let coord = Coordinator::builder(Config::default(), Arc::new(source.clone())).build();
//!
//!     // One owner per feature instance
//!     let owner = coord.mount("dashboard");
//!
//!     // Any resource with a cleanup
//!     owner.add("socket", || {
//!         println!("socket opened");
//!         Ok::<_, std::io::Error>(Disposer::new(|| println!("socket closed")))
//!     })?;
//!
//!     // Periodic work that pauses while the source is inactive
//!     let refresh: TickRef = TickFn::arc("refresh", |ctx: CancellationToken| async move {
//!         if ctx.is_cancelled() { return Ok(()); }
//!         println!("refreshing");
//!         Ok::<(), tickvisor::TickError>(())
//!     });
//!     owner.schedule("refresh", coord.spec(refresh, Duration::from_secs(30), true))?;
//!
//!     // Everything is released here, exactly once
//!     owner.unmount();
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod liveness;
mod policies;
mod reporters;
mod schedule;

// ---- Public re-exports ----

pub use crate::core::{
    Broadcaster, Config, Coordinator, CoordinatorBuilder, DisposableRegistry, Disposer,
    GaugeSnapshot, Gauges, Owner, OwnerState, Phase, ScheduleHandle, Subscription,
    VisibilityScheduler,
};
pub use error::{BoxError, CoordError, Fault, TickError};
pub use events::{Bus, Event, EventKind};
pub use liveness::{Detach, Listener, Liveness, LivenessSource, ManualSource, WatchSource};
pub use policies::{MissedTickPolicy, OverlapPolicy};
pub use reporters::{LogReporter, Report, ReporterSet};
pub use schedule::{BoxTickFuture, ScheduleSpec, Tick, TickFn, TickRef};
