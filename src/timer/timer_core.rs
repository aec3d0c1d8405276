//! The scheduling core of repeated-timer.
//!
//! # RepeatedTimer
//!
//! Each task instance exclusively owns one [`TimerState`]: the nominal
//! interval, the absolute instant of the next fire, and at most one live
//! deferred-execution handle. A fire sleeps until its absolute deadline,
//! invokes the task body, then arms its successor one interval after the
//! *intended* fire instant rather than after the completion time, so task
//! runtime never accumulates as drift.

use crate::prelude::*;
use crate::timer::task::Routine;

use std::panic::{catch_unwind, AssertUnwindSafe};

// Scheduling state shared between start/stop callers, the pending fire, and
// the interval monitor.
pub(crate) struct TimerState {
    // The nominal period between invocations. Always positive.
    pub(crate) interval: Duration,
    // Absolute instant of the next scheduled invocation.
    pub(crate) next_fire_at: Option<Instant>,
    // Exactly one live deferred fire, or `None` when stopped.
    pub(crate) handle: Option<SmolJoinHandler<()>>,
    // Schedule generation, bumped by every successful start and every
    // completed stop. Watch loops bound to an older generation retire
    // themselves.
    pub(crate) epoch: u64,
}

// Shared scheduling state for operate.
pub(crate) type SharedTimerState = Arc<Mutex<TimerState>>;

/// Common control surface of [`RepeatedTimer`] and
/// [`MonitoredTimer`](crate::timer::monitor::MonitoredTimer), used by
/// [`launch_timer_worker`](crate::utils::launch::launch_timer_worker) to
/// drain either variant during shutdown.
#[async_trait]
pub trait TimerControl: Send + Sync {
    /// Cancels the pending fire and waits until cancellation is confirmed.
    async fn stop(&self);

    /// Returns true iff no deferred fire is armed.
    fn is_stopped(&self) -> bool;
}

/// A periodic task running a [`Routine`] on a fixed cadence anchored to
/// absolute time.
///
/// Handles are cheap to clone and all clones drive the same schedule.
/// Dropping every clone does not stop the schedule; [`stop`](Self::stop) is
/// the only teardown.
///
/// Build instances through [`TimerBuilder`](crate::timer::task::TimerBuilder).
pub struct RepeatedTimer<R> {
    routine: Arc<R>,
    state: SharedTimerState,
}

impl<R> Clone for RepeatedTimer<R> {
    fn clone(&self) -> Self {
        RepeatedTimer {
            routine: self.routine.clone(),
            state: self.state.clone(),
        }
    }
}

impl<R: Routine> RepeatedTimer<R> {
    pub(crate) fn new(routine: R, interval: Duration) -> Self {
        RepeatedTimer {
            routine: Arc::new(routine),
            state: Arc::new(Mutex::new(TimerState {
                interval,
                next_fire_at: None,
                handle: None,
                epoch: 0,
            })),
        }
    }

    /// Schedules the first invocation at `now + first_call_interval`.
    ///
    /// A no-op while the task is already scheduled.
    pub fn start(&self, first_call_interval: Duration) {
        self.try_start_at(Instant::now() + first_call_interval);
    }

    /// Stops the schedule. Idempotent; never fails.
    ///
    /// Cancellation is cooperative: a fire parked at its deadline is
    /// prevented outright, while an invocation already executing cannot be
    /// pre-empted and is waited out, with its reschedule prevented by the
    /// handle having been taken. The loop re-checks for a successor handle
    /// armed while a cancel was in flight, so no further invocation can
    /// occur once this returns.
    pub async fn stop(&self) {
        loop {
            let handle = self.lock_state().handle.take();
            match handle {
                Some(handle) => {
                    handle.cancel().await;
                }
                None => break,
            }
        }

        let mut state = self.lock_state();
        state.next_fire_at = None;
        state.epoch = state.epoch.wrapping_add(1);
    }

    /// Synchronous counterpart of [`stop`](Self::stop) for non-async callers.
    pub fn stop_blocking(&self) {
        block_on(self.stop());
    }

    /// Returns true iff no deferred fire is armed.
    pub fn is_stopped(&self) -> bool {
        self.lock_state().handle.is_none()
    }

    /// The currently active nominal interval.
    pub fn interval(&self) -> Duration {
        self.lock_state().interval
    }

    /// Absolute instant of the next scheduled invocation, or `None` when
    /// stopped.
    pub fn next_fire_at(&self) -> Option<Instant> {
        self.lock_state().next_fire_at
    }

    // Arms the first fire of a fresh schedule generation. Returns the new
    // epoch, or `None` when a live handle already exists.
    pub(crate) fn try_start_at(&self, fire_at: Instant) -> Option<u64> {
        let mut state = self.lock_state();
        if state.handle.is_some() {
            debug!("start ignored, task already scheduled");
            return None;
        }
        Some(self.arm_locked(&mut state, fire_at))
    }

    // Atomic interval-change restart used by the monitor: only proceeds if
    // nothing re-armed the schedule since the caller's `stop` completed.
    pub(crate) fn restart_with_interval(
        &self,
        interval: Duration,
        fire_at: Instant,
    ) -> Option<u64> {
        let mut state = self.lock_state();
        if state.handle.is_some() {
            debug!("restart abandoned, task was rescheduled concurrently");
            return None;
        }
        state.interval = interval;
        Some(self.arm_locked(&mut state, fire_at))
    }

    // Consistent (interval, next_fire_at) snapshot, or `None` when the
    // schedule stopped or a newer generation took over.
    pub(crate) fn snapshot_if_epoch(&self, epoch: u64) -> Option<(Duration, Instant)> {
        let state = self.lock_state();
        if state.epoch != epoch {
            return None;
        }
        Some((state.interval, state.next_fire_at?))
    }

    pub(crate) fn routine(&self) -> &Arc<R> {
        &self.routine
    }

    fn lock_state(&self) -> MutexGuard<'_, TimerState> {
        // Poisoning is unreachable: no state mutation can panic while the
        // lock is held (the task body runs outside of it, unwind-caught).
        self.state.lock().expect("timer state lock poisoned")
    }

    fn arm_locked(&self, state: &mut TimerState, fire_at: Instant) -> u64 {
        state.next_fire_at = Some(fire_at);
        state.handle = Some(Self::arm(self.routine.clone(), self.state.clone(), fire_at));
        state.epoch = state.epoch.wrapping_add(1);
        state.epoch
    }

    // Arms one deferred fire: sleep until the absolute deadline, run the
    // body, then re-arm one interval after the intended fire instant. A
    // deadline already in the past fires immediately.
    //
    // The body and the reschedule happen within a single task poll, so a
    // concurrent `cancel` can prevent a parked fire but never splits an
    // invocation from its reschedule decision.
    fn arm(routine: Arc<R>, state: SharedTimerState, fire_at: Instant) -> SmolJoinHandler<()> {
        async_spawn(async move {
            AsyncTimer::at(fire_at).await;

            // Isolate-and-continue: one panicking invocation is lost, the
            // schedule is not.
            if catch_unwind(AssertUnwindSafe(|| routine.task())).is_err() {
                error!("task body panicked, keeping the schedule");
            }

            let mut state_guard = state.lock().expect("timer state lock poisoned");
            if state_guard.handle.is_none() {
                // stop() took the handle while the body was executing.
                return;
            }
            let next_fire_at = fire_at + state_guard.interval;
            state_guard.next_fire_at = Some(next_fire_at);
            state_guard.handle = Some(Self::arm(routine.clone(), state.clone(), next_fire_at));
        })
    }
}

#[async_trait]
impl<R: Routine> TimerControl for RepeatedTimer<R> {
    async fn stop(&self) {
        RepeatedTimer::stop(self).await;
    }

    fn is_stopped(&self) -> bool {
        RepeatedTimer::is_stopped(self)
    }
}
