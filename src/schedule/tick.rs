//! # Tick abstraction.
//!
//! A [`Tick`] is the unit of periodic work. Each due tick calls
//! [`Tick::fire`], which creates a **new** future; the scheduler spawns that
//! future and does not await it before the next tick (unless the schedule
//! uses [`OverlapPolicy::SkipIfInFlight`](crate::OverlapPolicy::SkipIfInFlight)).
//!
//! The [`CancellationToken`] passed to `fire` is cancelled when the schedule
//! is suspended or stopped. The coordinator cannot abort in-flight work; a tick
//! that wants to stop early must watch the token itself.

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::error::TickError;

/// Boxed future returned by [`Tick::fire`].
pub type BoxTickFuture = Pin<Box<dyn Future<Output = Result<(), TickError>> + Send + 'static>>;

/// # Periodic, cancelable unit of work.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use tickvisor::{BoxTickFuture, Tick, TickError};
///
/// struct Refresh;
///
/// impl Tick for Refresh {
///     fn name(&self) -> &str { "refresh" }
///
///     fn fire(&self, ctx: CancellationToken) -> BoxTickFuture {
///         Box::pin(async move {
///             if ctx.is_cancelled() {
///                 return Err(TickError::Canceled);
///             }
///             // reload dashboard data...
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Tick: Send + Sync + 'static {
    /// Returns a stable, human-readable name.
    fn name(&self) -> &str;

    /// Creates the future for one invocation.
    ///
    /// Anything done synchronously here runs at the moment the tick comes due.
    fn fire(&self, ctx: CancellationToken) -> BoxTickFuture;
}
