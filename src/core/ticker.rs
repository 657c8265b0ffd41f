//! # Ticker: the timer loop behind a Running schedule.
//!
//! One ticker task exists per armed timer entry. It owns a tokio interval and
//! fires the schedule's tick on every period until its token is cancelled.
//!
//! ## Lifecycle
//! ```text
//! arm (timer entry setup)
//!   ├─► [immediate?] fire()
//!   └─► spawn run():
//!         loop {
//!           ├─► select! { token.cancelled() → exit, interval.tick() }
//!           ├─► token cancelled meanwhile? → exit (no late tick)
//!           └─► fire()
//!                 ├─ overlap.should_skip(in_flight) → TickSkipped
//!                 ├─ tick.fire(child token)   (sync part, panic → Fault::Callback)
//!                 └─ spawn future             (Err / panic → Fault::Callback)
//!         }
//! disarm (timer entry cleanup) ──► token.cancel() + abort
//! ```
//!
//! ## Rules
//! - The loop never awaits a tick future, so a slow tick cannot shift the cadence.
//! - A failing tick is reported and the loop continues.
//! - Each tick gets a child of the ticker token: it is cancelled on disarm.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{Fault, TickError, panic_message};
use crate::events::{Event, EventKind};
use crate::policies::{MissedTickPolicy, OverlapPolicy};
use crate::reporters::ReporterSet;
use crate::schedule::TickRef;

/// Per-schedule tick counters, shared across suspend/resume cycles.
#[derive(Debug, Default)]
pub(crate) struct TickStats {
    fired: AtomicU64,
    skipped: AtomicU64,
    in_flight: AtomicUsize,
}

impl TickStats {
    pub(crate) fn fired(&self) -> u64 {
        self.fired.load(Ordering::SeqCst)
    }

    pub(crate) fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::SeqCst)
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter when the tick future finishes or is dropped.
struct InFlight(Arc<TickStats>);

impl InFlight {
    fn enter(stats: &Arc<TickStats>) -> Self {
        stats.in_flight.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(stats))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Everything one armed timer needs.
pub(crate) struct Ticker {
    pub(crate) owner: Arc<str>,
    pub(crate) key: Arc<str>,
    pub(crate) tick: TickRef,
    pub(crate) period: Duration,
    pub(crate) overlap: OverlapPolicy,
    pub(crate) missed_ticks: MissedTickPolicy,
    pub(crate) stats: Arc<TickStats>,
    pub(crate) reporters: ReporterSet,
    pub(crate) token: CancellationToken,
    pub(crate) rt: Handle,
}

impl Ticker {
    /// Timer loop. The first tick is due one full period after `start`.
    pub(crate) async fn run(self, start: Instant) {
        let mut interval = time::interval_at(start + self.period, self.period);
        interval.set_missed_tick_behavior(self.missed_ticks.into());

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                _ = interval.tick() => {}
            }
            if self.token.is_cancelled() {
                break;
            }
            self.fire();
        }

        tracing::trace!(target: "tickvisor", owner = %self.owner, key = %self.key, "ticker exited");
    }

    /// Fires one tick, honoring the overlap policy.
    pub(crate) fn fire(&self) {
        if self.overlap.should_skip(self.stats.in_flight()) {
            self.stats.skipped.fetch_add(1, Ordering::SeqCst);
            tracing::trace!(target: "tickvisor", owner = %self.owner, key = %self.key, "tick skipped, previous still in flight");
            self.reporters.bus().publish(
                Event::new(EventKind::TickSkipped)
                    .with_owner(self.owner.clone())
                    .with_key(self.key.clone()),
            );
            return;
        }

        self.stats.fired.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight::enter(&self.stats);
        let ctx = self.token.child_token();

        let fut = match catch_unwind(AssertUnwindSafe(|| self.tick.fire(ctx))) {
            Ok(fut) => fut,
            Err(payload) => {
                drop(guard);
                self.report(panic_message(payload.as_ref()));
                return;
            }
        };

        let owner = self.owner.clone();
        let key = self.key.clone();
        let reporters = self.reporters.clone();
        self.rt.spawn(async move {
            let _guard = guard;
            let error = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(())) => return,
                Ok(Err(TickError::Canceled)) => {
                    tracing::trace!(target: "tickvisor", %owner, %key, "tick observed cancellation");
                    return;
                }
                Ok(Err(e)) => e.to_string(),
                Err(payload) => panic_message(payload.as_ref()),
            };
            reporters.report(Fault::Callback {
                owner: owner.to_string(),
                key: key.to_string(),
                error,
            });
        });
    }

    fn report(&self, error: String) {
        self.reporters.report(Fault::Callback {
            owner: self.owner.to_string(),
            key: self.key.to_string(),
            error,
        });
    }
}
