//! External liveness signal: the binary "is this context observed" source.
//!
//! The coordinator never polls; it attaches exactly one listener through
//! [`LivenessSource::on_change`] (see [`Broadcaster`](crate::Broadcaster)) and
//! reads [`LivenessSource::current`] when that listener is attached.
//!
//! ## Contents
//! - [`Liveness`] the two states
//! - [`LivenessSource`] the collaborator contract
//! - [`ManualSource`] in-process source driven by explicit `set` calls
//! - [`WatchSource`] adapter over a `tokio::sync::watch` channel

mod manual;
mod source;
mod watch;

pub use manual::ManualSource;
pub use source::{Detach, Liveness, LivenessSource, Listener};
pub use watch::WatchSource;
