//! # Liveness source backed by a `tokio::sync::watch` channel.
//!
//! Each `on_change` spawns a forwarding task that awaits `changed()` and calls
//! the listener with the new value. The returned [`Detach`] cancels that task.
//! Attaching outside a tokio runtime fails with an error instead of panicking.

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::source::{Detach, Liveness, LivenessSource, Listener};
use crate::error::BoxError;

/// Adapter turning a `watch::Receiver<Liveness>` into a [`LivenessSource`].
///
/// # Example
/// ```
/// use tokio::sync::watch;
/// use tickvisor::{Liveness, LivenessSource, WatchSource};
///
/// let (tx, rx) = watch::channel(Liveness::Active);
/// let src = WatchSource::new(rx);
/// tx.send_replace(Liveness::Inactive);
/// assert_eq!(src.current(), Liveness::Inactive);
/// ```
#[derive(Clone, Debug)]
pub struct WatchSource {
    rx: watch::Receiver<Liveness>,
}

impl WatchSource {
    /// Wraps a receiver.
    pub fn new(rx: watch::Receiver<Liveness>) -> Self {
        Self { rx }
    }

    /// Creates a channel and returns its sender together with the source.
    pub fn channel(initial: Liveness) -> (watch::Sender<Liveness>, Self) {
        let (tx, rx) = watch::channel(initial);
        (tx, Self::new(rx))
    }
}

impl LivenessSource for WatchSource {
    fn current(&self) -> Liveness {
        *self.rx.borrow()
    }

    fn on_change(&self, listener: Listener) -> Result<Detach, BoxError> {
        let rt = Handle::try_current()?;
        let mut rx = self.rx.clone();
        rx.mark_unchanged();
        let token = CancellationToken::new();
        let stop = token.clone();

        let join = rt.spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let next = *rx.borrow_and_update();
                        listener(next);
                    }
                }
            }
        });

        Ok(Detach::new(move || {
            token.cancel();
            join.abort();
        }))
    }

    fn name(&self) -> &'static str {
        "watch"
    }
}
