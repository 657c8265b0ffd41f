//! Visibility-aware scheduling under a paused tokio clock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;

use tickvisor::{
    Config, CoordError, Coordinator, EventKind, Fault, Liveness, ManualSource, Phase, Report,
    ScheduleSpec, TickError, TickFn, TickRef,
};

#[derive(Default)]
struct Collect(Mutex<Vec<Fault>>);

impl Report for Collect {
    fn report(&self, fault: &Fault) {
        self.0.lock().unwrap().push(fault.clone());
    }
}

impl Collect {
    fn callbacks(&self) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|f| matches!(f, Fault::Callback { .. }))
            .count()
    }
}

fn setup(initial: Liveness) -> (ManualSource, Arc<Coordinator>, Arc<Collect>) {
    let source = ManualSource::new(initial);
    let faults = Arc::new(Collect::default());
    let coord = Coordinator::builder(Config::default(), Arc::new(source.clone()))
        .with_reporter(faults.clone())
        .build();
    (source, coord, faults)
}

/// Tick recording the whole seconds elapsed since `t0` at every invocation.
fn recording(t0: Instant, times: &Arc<Mutex<Vec<u64>>>) -> TickRef {
    let times = times.clone();
    TickFn::arc("record", move |_ctx: CancellationToken| {
        times.lock().unwrap().push(t0.elapsed().as_secs());
        async move { Ok::<(), TickError>(()) }
    })
}

async fn flush() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

#[tokio::test(start_paused = true)]
async fn initial_active_waits_a_full_interval() {
    let (_source, coord, _) = setup(Liveness::Active);
    let owner = coord.mount("dash");
    let t0 = Instant::now();
    let times = Arc::new(Mutex::new(Vec::new()));

    let handle = owner
        .schedule("poll", coord.spec(recording(t0, &times), secs(10), true))
        .unwrap();
    assert_eq!(handle.phase(), Phase::Running);
    assert!(times.lock().unwrap().is_empty());

    sleep_until(t0 + Duration::from_millis(35_500)).await;
    assert_eq!(*times.lock().unwrap(), vec![10, 20, 30]);
}

#[tokio::test(start_paused = true)]
async fn resume_fires_immediately_then_keeps_cadence() {
    let (source, coord, _) = setup(Liveness::Active);
    let owner = coord.mount("dash");
    let t0 = Instant::now();
    let times = Arc::new(Mutex::new(Vec::new()));

    owner
        .schedule("poll", coord.spec(recording(t0, &times), secs(30), true))
        .unwrap();

    sleep_until(t0 + secs(10)).await;
    source.set(Liveness::Inactive);
    assert_eq!(owner.phase("poll"), Phase::Waiting);

    sleep_until(t0 + secs(45)).await;
    assert!(times.lock().unwrap().is_empty());
    source.set(Liveness::Active);
    assert_eq!(owner.phase("poll"), Phase::Running);
    assert_eq!(*times.lock().unwrap(), vec![45]);

    sleep_until(t0 + secs(110)).await;
    assert_eq!(*times.lock().unwrap(), vec![45, 75, 105]);
}

#[tokio::test(start_paused = true)]
async fn resume_without_immediate_fire_waits_an_interval() {
    let (source, coord, _) = setup(Liveness::Active);
    let owner = coord.mount("dash");
    let t0 = Instant::now();
    let times = Arc::new(Mutex::new(Vec::new()));

    owner
        .schedule("poll", coord.spec(recording(t0, &times), secs(30), false))
        .unwrap();

    sleep_until(t0 + secs(10)).await;
    source.set(Liveness::Inactive);
    sleep_until(t0 + secs(45)).await;
    source.set(Liveness::Active);
    assert!(times.lock().unwrap().is_empty());

    sleep_until(t0 + secs(80)).await;
    assert_eq!(*times.lock().unwrap(), vec![75]);
}

#[tokio::test(start_paused = true)]
async fn nothing_fires_while_inactive() {
    let (source, coord, _) = setup(Liveness::Inactive);
    let owner = coord.mount("dash");
    let t0 = Instant::now();
    let times = Arc::new(Mutex::new(Vec::new()));

    let handle = owner
        .schedule("poll", coord.spec(recording(t0, &times), secs(1), true))
        .unwrap();
    assert_eq!(handle.phase(), Phase::Waiting);
    assert_eq!(coord.gauges().timers(), 0);

    sleep(secs(100)).await;
    assert!(times.lock().unwrap().is_empty());

    source.set(Liveness::Active);
    assert_eq!(*times.lock().unwrap(), vec![100]);
}

#[tokio::test(start_paused = true)]
async fn toggling_never_leaves_orphan_timers() {
    let (source, coord, _) = setup(Liveness::Active);
    let owner = coord.mount("dash");
    let calls = Arc::new(AtomicU32::new(0));
    let tick: TickRef = {
        let calls = calls.clone();
        TickFn::arc("count", move |_ctx: CancellationToken| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<(), TickError>(()) }
        })
    };

    let handle = owner
        .schedule("poll", coord.spec(tick, secs(5), true))
        .unwrap();

    for i in 0..50 {
        let next = if i % 2 == 0 {
            Liveness::Inactive
        } else {
            Liveness::Active
        };
        source.set(next);
        // repeated notifications must not arm a second timer
        source.set(next);

        let expected = if next.is_active() { 1 } else { 0 };
        assert_eq!(coord.gauges().timers(), expected, "toggle {i}");
        assert_eq!(
            handle.phase(),
            if next.is_active() {
                Phase::Running
            } else {
                Phase::Waiting
            }
        );
        sleep(Duration::from_millis(100)).await;
    }

    // 25 resumes, one immediate fire each; no interval elapsed in between
    assert_eq!(calls.load(Ordering::SeqCst), 25);

    sleep(Duration::from_millis(5_050)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 26);
    assert_eq!(coord.gauges().timers(), 1);
}

#[tokio::test(start_paused = true)]
async fn failing_tick_does_not_shift_the_cadence() {
    let (_source, coord, faults) = setup(Liveness::Active);
    let owner = coord.mount("dash");
    let t0 = Instant::now();
    let times = Arc::new(Mutex::new(Vec::new()));

    let tick: TickRef = {
        let times = times.clone();
        TickFn::arc("flaky", move |_ctx: CancellationToken| {
            let mut times = times.lock().unwrap();
            times.push(t0.elapsed().as_secs());
            let n = times.len();
            async move {
                if n == 3 {
                    return Err(TickError::fail("backend down"));
                }
                Ok::<(), TickError>(())
            }
        })
    };
    let handle = owner
        .schedule("poll", coord.spec(tick, secs(30), false))
        .unwrap();

    sleep_until(t0 + secs(125)).await;
    flush().await;

    assert_eq!(*times.lock().unwrap(), vec![30, 60, 90, 120]);
    assert_eq!(faults.callbacks(), 1);
    assert_eq!(handle.phase(), Phase::Running);
    assert_eq!(handle.fired(), 4);
}

#[tokio::test(start_paused = true)]
async fn panicking_tick_is_reported_and_ticking_continues() {
    let (_source, coord, faults) = setup(Liveness::Active);
    let owner = coord.mount("dash");
    let t0 = Instant::now();
    let times = Arc::new(Mutex::new(Vec::new()));

    let tick: TickRef = {
        let times = times.clone();
        TickFn::arc("explodes", move |_ctx: CancellationToken| {
            let n = {
                let mut times = times.lock().unwrap();
                times.push(t0.elapsed().as_secs());
                times.len()
            };
            if n == 3 {
                panic!("tick exploded");
            }
            async move { Ok::<(), TickError>(()) }
        })
    };
    owner
        .schedule("poll", coord.spec(tick, secs(1), false))
        .unwrap();

    sleep_until(t0 + Duration::from_millis(4_500)).await;
    flush().await;

    assert_eq!(*times.lock().unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(faults.callbacks(), 1);
    assert_eq!(owner.phase("poll"), Phase::Running);
}

#[tokio::test(start_paused = true)]
async fn skip_if_in_flight_drops_overlapping_ticks() {
    let (_source, coord, _) = setup(Liveness::Active);
    let owner = coord.mount("dash");

    let slow: TickRef = TickFn::arc("slow", |_ctx: CancellationToken| async move {
        sleep(Duration::from_millis(2_500)).await;
        Ok::<(), TickError>(())
    });
    let handle = owner
        .schedule(
            "slow",
            coord.spec(slow, secs(1), false).skip_if_in_flight(),
        )
        .unwrap();

    // fires at 1s (busy until 3.5s), skips 2s and 3s, fires at 4s
    sleep(Duration::from_millis(4_500)).await;
    assert_eq!(handle.fired(), 2);
    assert_eq!(handle.skipped(), 2);
    assert_eq!(handle.in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn allow_policy_lets_ticks_overlap() {
    let (_source, coord, _) = setup(Liveness::Active);
    let owner = coord.mount("dash");

    let slow: TickRef = TickFn::arc("slow", |_ctx: CancellationToken| async move {
        sleep(Duration::from_millis(2_500)).await;
        Ok::<(), TickError>(())
    });
    let handle = owner
        .schedule("slow", coord.spec(slow, secs(1), false))
        .unwrap();

    sleep(Duration::from_millis(3_200)).await;
    assert_eq!(handle.fired(), 3);
    assert_eq!(handle.skipped(), 0);
    assert_eq!(handle.in_flight(), 3);
}

#[tokio::test(start_paused = true)]
async fn suspend_cancels_in_flight_ticks() {
    let (source, coord, faults) = setup(Liveness::Active);
    let owner = coord.mount("dash");

    let waits: TickRef = TickFn::arc("waits", |ctx: CancellationToken| async move {
        tokio::select! {
            _ = ctx.cancelled() => Err(TickError::Canceled),
            _ = sleep(secs(60)) => Ok(()),
        }
    });
    let handle = owner
        .schedule("poll", coord.spec(waits, secs(1), false))
        .unwrap();

    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(handle.in_flight(), 1);

    source.set(Liveness::Inactive);
    flush().await;
    assert_eq!(handle.in_flight(), 0);
    assert_eq!(faults.callbacks(), 0);
}

#[tokio::test(start_paused = true)]
async fn restarting_a_key_replaces_the_schedule() {
    let (source, coord, _) = setup(Liveness::Active);
    let owner = coord.mount("dash");
    let t0 = Instant::now();
    let first = Arc::new(Mutex::new(Vec::new()));
    let second = Arc::new(Mutex::new(Vec::new()));

    let old = owner
        .schedule("poll", coord.spec(recording(t0, &first), secs(10), false))
        .unwrap();
    sleep_until(t0 + secs(15)).await;
    let new = owner
        .schedule("poll", coord.spec(recording(t0, &second), secs(10), false))
        .unwrap();

    assert_eq!(old.phase(), Phase::Stopped);
    assert_eq!(new.phase(), Phase::Running);
    assert_eq!(coord.gauges().timers(), 1);
    assert_eq!(coord.gauges().subscriptions(), 1);
    assert_eq!(source.listener_count(), 1);

    sleep_until(t0 + secs(36)).await;
    assert_eq!(*first.lock().unwrap(), vec![10]);
    assert_eq!(*second.lock().unwrap(), vec![25, 35]);
}

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent_and_final() {
    let (source, coord, _) = setup(Liveness::Active);
    let owner = coord.mount("dash");
    let t0 = Instant::now();
    let times = Arc::new(Mutex::new(Vec::new()));

    let handle = owner
        .schedule("poll", coord.spec(recording(t0, &times), secs(1), true))
        .unwrap();
    sleep(Duration::from_millis(2_500)).await;

    assert!(handle.stop());
    assert!(!handle.stop());
    assert!(!owner.stop("poll"));
    assert_eq!(handle.phase(), Phase::Stopped);
    assert_eq!(owner.phase("poll"), Phase::Stopped);
    assert!(owner.schedule_handle("poll").is_none());
    assert!(owner.is_empty());

    // transitions after stop do nothing
    source.set(Liveness::Inactive);
    source.set(Liveness::Active);
    sleep(secs(10)).await;
    assert_eq!(*times.lock().unwrap(), vec![1, 2]);
    assert_eq!(coord.gauges().snapshot().timers, 0);
    assert_eq!(source.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn stale_handle_leaves_the_newer_schedule_alone() {
    let (_source, coord, _) = setup(Liveness::Active);
    let owner = coord.mount("dash");
    let t0 = Instant::now();
    let times = Arc::new(Mutex::new(Vec::new()));

    let old = owner
        .schedule("poll", coord.spec(recording(t0, &times), secs(1), false))
        .unwrap();
    assert!(old.stop());
    assert!(owner.schedule_handle("poll").is_none());

    let new = owner
        .schedule("poll", coord.spec(recording(t0, &times), secs(1), false))
        .unwrap();
    assert!(!old.stop());
    assert_eq!(new.phase(), Phase::Running);
    let tracked = owner.schedule_handle("poll").unwrap();
    assert_eq!(tracked.phase(), Phase::Running);

    // stopping through the subscription entry also untracks the schedule.
    assert!(owner.dispose("poll#liveness"));
    assert!(owner.schedule_handle("poll").is_none());
    assert_eq!(new.phase(), Phase::Stopped);
    assert_eq!(coord.gauges().timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn timer_entry_is_owned_by_its_schedule() {
    let (source, coord, _) = setup(Liveness::Active);
    let owner = coord.mount("dash");
    let t0 = Instant::now();
    let times = Arc::new(Mutex::new(Vec::new()));

    owner
        .schedule("poll", coord.spec(recording(t0, &times), secs(10), false))
        .unwrap();
    let replaced = owner.add("poll", || {
        Ok::<_, CoordError>(tickvisor::Disposer::none())
    });
    assert!(matches!(replaced, Err(CoordError::ReservedKey { .. })));
    assert_eq!(owner.phase("poll"), Phase::Running);
    assert_eq!(coord.gauges().timers(), 1);

    sleep_until(t0 + secs(15)).await;
    assert!(owner.dispose("poll"));
    assert_eq!(owner.phase("poll"), Phase::Stopped);
    assert_eq!(coord.gauges().timers(), 0);
    assert_eq!(coord.gauges().subscriptions(), 0);

    // no phantom Running phase survives a later transition.
    source.set(Liveness::Inactive);
    source.set(Liveness::Active);
    sleep_until(t0 + secs(40)).await;
    assert_eq!(*times.lock().unwrap(), vec![10]);
    assert!(owner.is_empty());
}

#[tokio::test(start_paused = true)]
async fn liveness_suffix_is_not_a_schedule_key() {
    let (source, coord, _) = setup(Liveness::Active);
    let owner = coord.mount("dash");
    let t0 = Instant::now();
    let times = Arc::new(Mutex::new(Vec::new()));

    owner
        .schedule("a", coord.spec(recording(t0, &times), secs(10), false))
        .unwrap();
    let shadow = owner.schedule("a#liveness", coord.spec(recording(t0, &times), secs(1), false));
    assert!(matches!(shadow, Err(CoordError::ReservedKey { .. })));

    assert_eq!(owner.keys(), vec!["a".to_string(), "a#liveness".to_string()]);
    assert_eq!(coord.gauges().subscriptions(), 1);
    source.set(Liveness::Inactive);
    assert_eq!(owner.phase("a"), Phase::Waiting);
    source.set(Liveness::Active);
    assert_eq!(owner.phase("a"), Phase::Running);
}

#[tokio::test(start_paused = true)]
async fn lifecycle_events_reach_the_bus() {
    let (source, coord, _) = setup(Liveness::Active);
    let mut rx = coord.events();
    let owner = coord.mount("dash");
    let t0 = Instant::now();
    let times = Arc::new(Mutex::new(Vec::new()));

    owner
        .schedule("poll", coord.spec(recording(t0, &times), secs(1), true))
        .unwrap();
    source.set(Liveness::Inactive);
    source.set(Liveness::Active);
    owner.stop("poll");

    let mut kinds = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        if ev.key.as_deref() == Some("poll") {
            kinds.push(ev.kind);
        }
    }
    let schedule_kinds: Vec<_> = kinds
        .into_iter()
        .filter(|k| {
            matches!(
                k,
                EventKind::ScheduleStarted
                    | EventKind::ScheduleSuspended
                    | EventKind::ScheduleResumed
                    | EventKind::ScheduleStopped
            )
        })
        .collect();
    assert_eq!(
        schedule_kinds,
        vec![
            EventKind::ScheduleStarted,
            EventKind::ScheduleSuspended,
            EventKind::ScheduleResumed,
            EventKind::ScheduleStopped,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn invalid_requests_are_rejected() {
    let (_source, coord, _) = setup(Liveness::Active);
    let owner = coord.mount("dash");
    let t0 = Instant::now();
    let times = Arc::new(Mutex::new(Vec::new()));

    let zero = owner.schedule("poll", coord.spec(recording(t0, &times), Duration::ZERO, true));
    assert!(matches!(zero, Err(CoordError::InvalidInterval { .. })));

    let empty = owner.schedule("", coord.spec(recording(t0, &times), secs(1), true));
    assert!(matches!(empty, Err(CoordError::EmptyKey)));

    assert!(owner.is_empty());
    assert_eq!(coord.gauges().subscriptions(), 0);
}

#[test]
fn starting_outside_a_runtime_is_an_error() {
    let (_source, coord, _) = setup(Liveness::Active);
    let owner = coord.mount("dash");
    let tick: TickRef = TickFn::arc("noop", |_ctx: CancellationToken| async move {
        Ok::<(), TickError>(())
    });

    let res = owner.schedule("poll", ScheduleSpec::new(tick, secs(1), false));
    assert!(matches!(res, Err(CoordError::NoRuntime)));
    assert!(owner.is_empty());
}
