//! # Function-backed tick (`TickFn`)
//!
//! [`TickFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a fresh
//! future per tick. No state is shared between ticks unless the closure
//! captures an `Arc<...>` explicitly.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use tickvisor::{TickFn, TickRef, TickError};
//!
//! let t: TickRef = TickFn::arc("poll", |ctx: CancellationToken| async move {
//!     if ctx.is_cancelled() {
//!         return Ok(());
//!     }
//!     // fetch analytics...
//!     Ok::<_, TickError>(())
//! });
//!
//! assert_eq!(t.name(), "poll");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::TickError;
use crate::schedule::tick::{BoxTickFuture, Tick};

/// Shared handle to a tick.
pub type TickRef = Arc<dyn Tick>;

/// Function-backed tick implementation.
#[derive(Debug)]
pub struct TickFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TickFn<F> {
    /// Creates a new function-backed tick.
    ///
    /// Prefer [`TickFn::arc`] when you immediately need a [`TickRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the tick and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> Tick for TickFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TickError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn fire(&self, ctx: CancellationToken) -> BoxTickFuture {
        Box::pin((self.f)(ctx))
    }
}
