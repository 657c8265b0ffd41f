//! # Example: Dashboard with visibility-aware refresh
//!
//! Two feature instances share one liveness source:
//! - `analytics` polls every second and fires right away when it becomes visible again;
//! - `presence` heartbeats every 400ms, skips ticks while one is in flight and never catches up.
//!
//! The "page" is hidden for two seconds in the middle: both schedules pause,
//! no tick fires, and they resume when it is shown again.
//!
//! Run with `RUST_LOG=tickvisor=debug cargo run --example dashboard` to see the
//! coordinator's own logs.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use tickvisor::{
    Config, Coordinator, Disposer, EventKind, Liveness, TickError, TickFn, TickRef, WatchSource,
};

fn analytics_tick() -> TickRef {
    let polls = Arc::new(AtomicU32::new(0));
    TickFn::arc("analytics", move |_ctx: CancellationToken| {
        let n = polls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n == 3 {
                // one flaky poll; the cadence is unaffected
                return Err(TickError::fail("analytics backend timed out"));
            }
            println!("[analytics] poll #{n}");
            Ok::<(), TickError>(())
        }
    })
}

fn presence_tick() -> TickRef {
    TickFn::arc("presence", |ctx: CancellationToken| async move {
        tokio::select! {
            _ = ctx.cancelled() => return Err(TickError::Canceled),
            _ = tokio::time::sleep(Duration::from_millis(600)) => {}
        }
        println!("[presence] heartbeat sent");
        Ok::<(), TickError>(())
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tickvisor=info")),
        )
        .init();

    let (visible, source) = WatchSource::channel(Liveness::Active);
    let coord = Coordinator::builder(Config::default(), Arc::new(source)).build();

    let mut events = coord.events();
    tokio::spawn(async move {
        while let Ok(ev) = events.recv().await {
            match ev.kind {
                EventKind::ScheduleSuspended | EventKind::ScheduleResumed | EventKind::TickSkipped => {
                    println!(
                        "  event #{:<3} {:?} key={}",
                        ev.seq,
                        ev.kind,
                        ev.key.as_deref().unwrap_or("-")
                    );
                }
                _ => {}
            }
        }
    });

    let analytics = coord.mount("analytics");
    analytics.add("socket", || {
        println!("[analytics] socket opened");
        Ok::<_, std::io::Error>(Disposer::new(|| println!("[analytics] socket closed")))
    })?;
    analytics.schedule(
        "poll",
        coord.spec(analytics_tick(), Duration::from_secs(1), true),
    )?;

    let presence = coord.mount("presence");
    let heartbeat = presence.schedule(
        "heartbeat",
        coord
            .spec(presence_tick(), Duration::from_millis(400), false)
            .skip_if_in_flight(),
    )?;

    tokio::time::sleep(Duration::from_millis(3500)).await;

    println!("--- page hidden ---");
    visible.send(Liveness::Inactive)?;
    tokio::time::sleep(Duration::from_secs(2)).await;
    println!("phase: poll={} heartbeat={}", analytics.phase("poll"), heartbeat.phase());

    println!("--- page shown ---");
    visible.send(Liveness::Active)?;
    tokio::time::sleep(Duration::from_millis(2500)).await;

    println!(
        "heartbeat: fired={} skipped={}",
        heartbeat.fired(),
        heartbeat.skipped()
    );
    println!("gauges before unmount: {:?}", coord.gauges().snapshot());

    analytics.unmount();
    presence.unmount();
    println!("gauges after unmount:  {:?}", coord.gauges().snapshot());
    Ok(())
}
