//! Interval monitoring on top of the timer core.
//!
//! # MonitoredTimer
//!
//! A concurrent watch loop periodically polls the routine's desired
//! interval. When it differs from the active one, the loop stops the timer
//! and restarts it so that the sequence of fire instants continues from the
//! most recent firing instant plus the new interval, rather than restarting
//! the phase from "now". Detection latency is bounded by one poll period.

use crate::prelude::*;
use crate::timer::task::MonitoredRoutine;
use crate::timer::timer_core::RepeatedTimer;

/// A periodic task that follows runtime changes of its nominal interval.
///
/// Built through
/// [`TimerBuilder::spawn_monitored_routine`](crate::timer::task::TimerBuilder::spawn_monitored_routine).
pub struct MonitoredTimer<R> {
    inner: RepeatedTimer<R>,
    poll_period: Duration,
}

impl<R> Clone for MonitoredTimer<R> {
    fn clone(&self) -> Self {
        MonitoredTimer {
            inner: self.inner.clone(),
            poll_period: self.poll_period,
        }
    }
}

impl<R: MonitoredRoutine> MonitoredTimer<R> {
    pub(crate) fn new(routine: R, interval: Duration, poll_period: Duration) -> Self {
        MonitoredTimer {
            inner: RepeatedTimer::new(routine, interval),
            poll_period,
        }
    }

    /// Schedules the first invocation at `now + first_call_interval` and
    /// attaches a watch loop to the fresh schedule.
    ///
    /// A no-op while the task is already scheduled.
    pub fn start(&self, first_call_interval: Duration) {
        let fire_at = Instant::now() + first_call_interval;
        if let Some(epoch) = self.inner.try_start_at(fire_at) {
            Self::spawn_watch(self.inner.clone(), self.poll_period, epoch);
        }
    }

    /// Stops the schedule. Idempotent; never fails.
    ///
    /// The watch loop notices the stop at its next poll and retires itself.
    pub async fn stop(&self) {
        self.inner.stop().await;
    }

    /// Synchronous counterpart of [`stop`](Self::stop) for non-async callers.
    pub fn stop_blocking(&self) {
        self.inner.stop_blocking();
    }

    /// Returns true iff no deferred fire is armed.
    pub fn is_stopped(&self) -> bool {
        self.inner.is_stopped()
    }

    /// The currently active nominal interval.
    pub fn interval(&self) -> Duration {
        self.inner.interval()
    }

    /// Absolute instant of the next scheduled invocation, or `None` when
    /// stopped.
    pub fn next_fire_at(&self) -> Option<Instant> {
        self.inner.next_fire_at()
    }

    // One watch loop per schedule generation. It exits silently when the
    // timer stops or a newer generation takes over, and after acting on an
    // interval change (the restart spawns a fresh loop bound to the new
    // generation).
    fn spawn_watch(inner: RepeatedTimer<R>, poll_period: Duration, epoch: u64) {
        async_spawn(
            async move {
                loop {
                    AsyncTimer::after(poll_period).await;

                    let (active_interval, next_fire_at) = match inner.snapshot_if_epoch(epoch) {
                        Some(snapshot) => snapshot,
                        None => return,
                    };

                    let desired_interval = inner.routine().desired_interval();
                    if desired_interval == active_interval {
                        continue;
                    }
                    if desired_interval.is_zero() {
                        error!("monitored routine returned a zero interval, keeping the schedule");
                        continue;
                    }

                    info!(
                        "task interval changed from {:?} to {:?}, restarting",
                        active_interval, desired_interval
                    );
                    inner.stop().await;

                    // Continue the fire sequence from the most recent firing
                    // instant plus the new interval. A slot already in the
                    // past fires immediately.
                    let next_call = next_fire_at
                        .checked_sub(active_interval)
                        .map(|last_fire| last_fire + desired_interval)
                        .unwrap_or_else(|| Instant::now() + desired_interval);

                    if let Some(epoch) = inner.restart_with_interval(desired_interval, next_call)
                    {
                        Self::spawn_watch(inner.clone(), poll_period, epoch);
                    }
                    return;
                }
            }
            .instrument(info_span!("interval_monitor")),
        )
        .detach();
    }
}

#[async_trait]
impl<R: MonitoredRoutine> TimerControl for MonitoredTimer<R> {
    async fn stop(&self) {
        MonitoredTimer::stop(self).await;
    }

    fn is_stopped(&self) -> bool {
        MonitoredTimer::is_stopped(self)
    }
}
