//! Runtime core: owners, registries, the liveness broadcaster and the scheduler.
//!
//! The public entry point is [`Coordinator`]; everything else is reached
//! through it or through the [`Owner`] it mounts.
//!
//! Internal modules:
//! - [`registry`]: keyed disposables with replace semantics;
//! - [`broadcaster`]: one shared listener on the liveness source, fanned out to subscribers;
//! - [`scheduler`]: the Stopped/Waiting/Running state machine per schedule;
//! - [`ticker`]: the timer loop behind a Running schedule;
//! - [`owner`]: mount/unmount boundary of a feature instance;
//! - [`coordinator`] / [`builder`]: wiring;
//! - [`gauge`]: live-resource counters.

mod broadcaster;
mod builder;
mod config;
mod coordinator;
mod gauge;
mod owner;
mod registry;
mod scheduler;
mod ticker;

pub use broadcaster::{Broadcaster, Subscription};
pub use builder::CoordinatorBuilder;
pub use config::Config;
pub use coordinator::Coordinator;
pub use gauge::{GaugeSnapshot, Gauges};
pub use owner::{Owner, OwnerState};
pub use registry::{DisposableRegistry, Disposer};
pub use scheduler::{Phase, ScheduleHandle, VisibilityScheduler};
