use repeated_timer::prelude::*;

use std::sync::atomic::Ordering::{Acquire, Release};
use std::sync::atomic::{AtomicU64, AtomicUsize};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

// A routine whose desired interval is swapped from the outside, standing in
// for an external configuration source.
struct SwitchingRoutine {
    fire_instants: Arc<Mutex<Vec<Instant>>>,
    desired_millis: Arc<AtomicU64>,
}

impl SwitchingRoutine {
    fn new(initial_millis: u64) -> Self {
        SwitchingRoutine {
            fire_instants: Arc::new(Mutex::new(Vec::new())),
            desired_millis: Arc::new(AtomicU64::new(initial_millis)),
        }
    }
}

impl Routine for SwitchingRoutine {
    fn task(&self) {
        self.fire_instants.lock().unwrap().push(Instant::now());
    }
}

impl MonitoredRoutine for SwitchingRoutine {
    fn desired_interval(&self) -> Duration {
        Duration::from_millis(self.desired_millis.load(Acquire))
    }
}

// An interval change is detected within one poll period and the timer is
// restarted with the new interval.
#[test]
fn test_monitor_restarts_on_interval_change() -> AnyResult<()> {
    let routine = SwitchingRoutine::new(600);
    let fire_instants = routine.fire_instants.clone();
    let desired_millis = routine.desired_millis.clone();

    let timer = TimerBuilder::default()
        .set_interval(Duration::from_millis(600))
        .set_monitor_poll_period(Duration::from_millis(150))
        .spawn_monitored_routine(routine)?;

    thread::sleep(Duration::from_millis(100));
    desired_millis.store(300, Release);

    thread::sleep(Duration::from_millis(400));
    assert_eq!(timer.interval(), Duration::from_millis(300));
    assert!(!timer.is_stopped());
    // The restarted schedule fires on the shortened cadence.
    assert!(fire_instants.lock().unwrap().len() >= 2);

    timer.stop_blocking();
    Ok(())
}

// The concrete scenario: with interval 2000ms and a change to 1000ms
// arriving after the second fire, the next fire lands at
// `last_fire(=2000) + 1000 = 3000` from the start, not at `now + 1000`.
#[test]
fn test_phase_preserving_restart() -> AnyResult<()> {
    let routine = SwitchingRoutine::new(2000);
    let fire_instants = routine.fire_instants.clone();
    let desired_millis = routine.desired_millis.clone();

    let origin = Instant::now();
    let timer = TimerBuilder::default()
        .set_interval(Duration::from_millis(2000))
        .set_monitor_poll_period(Duration::from_millis(500))
        .spawn_monitored_routine(routine)?;

    // Past the second fire (t≈2000), before the next watch poll (t≈2500).
    thread::sleep(Duration::from_millis(2200));
    desired_millis.store(1000, Release);

    // Past the detecting poll, before the restarted fire.
    thread::sleep(Duration::from_millis(500));
    assert_eq!(timer.interval(), Duration::from_millis(1000));
    let rescheduled_for = timer.next_fire_at().expect("timer is running");
    let since_origin = rescheduled_for - origin;
    assert!(
        since_origin > Duration::from_millis(2900) && since_origin < Duration::from_millis(3100),
        "restart lost the original phase: next fire {:?} from start",
        since_origin
    );

    // And the fire itself lands on the preserved slot.
    thread::sleep(Duration::from_millis(850));
    timer.stop_blocking();

    let fire_instants = fire_instants.lock().unwrap();
    assert!(fire_instants.len() >= 3, "got {} fires", fire_instants.len());
    let third_fire = fire_instants[2] - origin;
    assert!(
        third_fire > Duration::from_millis(2800) && third_fire < Duration::from_millis(3400),
        "third fire at {:?} from start",
        third_fire
    );

    Ok(())
}

#[test]
fn test_monitor_keeps_schedule_when_interval_unchanged() -> AnyResult<()> {
    let routine = SwitchingRoutine::new(300);
    let fire_instants = routine.fire_instants.clone();

    let timer = TimerBuilder::default()
        .set_interval(Duration::from_millis(300))
        .set_monitor_poll_period(Duration::from_millis(100))
        .spawn_monitored_routine(routine)?;

    thread::sleep(Duration::from_millis(1000));

    assert!(!timer.is_stopped());
    assert_eq!(timer.interval(), Duration::from_millis(300));
    assert!(fire_instants.lock().unwrap().len() >= 3);

    timer.stop_blocking();
    Ok(())
}

// After stop() the watch loop retires: a later interval change must not
// resurrect the schedule.
#[test]
fn test_stop_retires_watch_loop() -> AnyResult<()> {
    let routine = SwitchingRoutine::new(300);
    let desired_millis = routine.desired_millis.clone();

    let timer = TimerBuilder::default()
        .set_interval(Duration::from_millis(300))
        .set_monitor_poll_period(Duration::from_millis(100))
        .spawn_monitored_routine(routine)?;

    thread::sleep(Duration::from_millis(50));
    timer.stop_blocking();
    assert!(timer.is_stopped());

    desired_millis.store(150, Release);
    thread::sleep(Duration::from_millis(350));

    assert!(timer.is_stopped());
    assert_eq!(timer.interval(), Duration::from_millis(300));
    Ok(())
}

#[test]
fn test_zero_poll_period_fails_fast() {
    let result = TimerBuilder::default()
        .set_interval(Duration::from_millis(300))
        .set_monitor_poll_period(Duration::from_secs(0))
        .spawn_monitored_routine(SwitchingRoutine::new(300));

    assert!(matches!(result, Err(TaskError::ZeroPollPeriod)));
}

#[test]
fn test_shutdown_signal_debounce() {
    let signal = ShutdownSignal::new();
    assert!(!signal.is_triggered());

    assert!(signal.trigger());
    assert!(signal.is_triggered());

    // Inside the debounce window the trigger is suppressed.
    assert!(!signal.trigger());
    assert!(signal.is_triggered());

    // Once the window elapses triggering is accepted again; the flag was
    // already sticky.
    thread::sleep(Duration::from_millis(150));
    assert!(signal.trigger());
    assert!(signal.is_triggered());

    // Waiting on an already-triggered signal resolves immediately.
    smol::block_on(signal.wait());
    signal.wait_blocking();
}

#[test]
fn test_shutdown_signal_wakes_blocked_waiters() {
    let signal = ShutdownSignal::new();
    let signal_bunshin = signal.clone();

    let waiter = thread::spawn(move || signal_bunshin.wait_blocking());

    thread::sleep(Duration::from_millis(50));
    signal.trigger();

    waiter.join().expect("waiter thread completes");
    assert!(signal.is_triggered());
}

#[test]
fn test_launch_timer_worker_lifecycle() -> AnyResult<()> {
    let signal = ShutdownSignal::new();
    let share_num = Arc::new(AtomicUsize::new(0));
    let share_num_bunshin = share_num.clone();

    let worker = launch_timer_worker("demo-task", signal.clone(), move || {
        TimerBuilder::default()
            .set_interval(Duration::from_millis(100))
            .spawn_routine(move || {
                share_num_bunshin.fetch_add(1, Release);
            })
    })?;

    thread::sleep(Duration::from_millis(450));
    assert!(share_num.load(Acquire) >= 2);

    signal.trigger();
    worker.join().expect("worker thread completes");

    // Joining the worker observes a fully drained schedule.
    let halted_at = share_num.load(Acquire);
    thread::sleep(Duration::from_millis(300));
    assert_eq!(share_num.load(Acquire), halted_at);

    Ok(())
}

#[test]
fn test_launch_timer_worker_with_monitored_task() -> AnyResult<()> {
    let signal = ShutdownSignal::new();
    let routine = SwitchingRoutine::new(80);
    let fire_instants = routine.fire_instants.clone();

    let worker = launch_timer_worker("monitored-task", signal.clone(), move || {
        TimerBuilder::default()
            .set_interval(Duration::from_millis(80))
            .set_monitor_poll_period(Duration::from_millis(100))
            .spawn_monitored_routine(routine)
    })?;

    thread::sleep(Duration::from_millis(300));
    signal.trigger();
    worker.join().expect("worker thread completes");

    assert!(fire_instants.lock().unwrap().len() >= 1);
    Ok(())
}

// A worker whose task fails construction logs the error and exits cleanly.
#[test]
fn test_launch_timer_worker_build_failure_ends_worker() -> AnyResult<()> {
    let signal = ShutdownSignal::new();

    let worker = launch_timer_worker("misconfigured-task", signal, || {
        TimerBuilder::default()
            .set_interval(Duration::from_secs(0))
            .spawn_routine(|| {})
    })?;

    worker.join().expect("worker thread completes");
    Ok(())
}
