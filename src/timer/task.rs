//! Task abstractions: the routine contracts implemented by concrete tasks
//! and the builder that schedules them.

use crate::prelude::*;
use crate::timer::monitor::MonitoredTimer;
use crate::timer::timer_core::RepeatedTimer;

pub(crate) const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
pub(crate) const DEFAULT_MONITOR_POLL_PERIOD: Duration = Duration::from_secs(5);

/// A unit of work driven on a fixed cadence.
///
/// Implemented automatically by any `Fn() + Send + Sync + 'static` closure;
/// implement it by hand when the task carries state.
pub trait Routine: Send + Sync + 'static {
    /// The task body. Must be safe to call repeatedly.
    ///
    /// Failure policy: a panicking invocation is caught and logged by the
    /// scheduler and the schedule continues (isolate-and-continue).
    fn task(&self);
}

impl<F> Routine for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn task(&self) {
        (self)()
    }
}

/// A [`Routine`] whose nominal interval may change at runtime, e.g. driven
/// by external configuration.
pub trait MonitoredRoutine: Routine {
    /// Returns the currently desired interval. Polled periodically by the
    /// watch loop of a [`MonitoredTimer`].
    fn desired_interval(&self) -> Duration;
}

/// Builds periodic tasks with custom configuration values.
///
/// Methods can be chained in order to set the configuration values. The
/// task is scheduled by calling `spawn_routine` or
/// `spawn_monitored_routine`.
///
/// # Examples
///
/// ```rust,no_run
/// use repeated_timer::prelude::*;
/// use std::time::Duration;
///
/// let timer = TimerBuilder::default()
///     .set_interval(Duration::from_secs(5))
///     .set_first_call_interval(Duration::from_secs(1))
///     .spawn_routine(|| println!("tick"))
///     .expect("interval is positive");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TimerBuilder {
    interval: Duration,
    first_call_interval: Duration,
    start_on_init: bool,
    monitor_poll_period: Duration,
}

impl Default for TimerBuilder {
    fn default() -> Self {
        TimerBuilder {
            interval: DEFAULT_INTERVAL,
            first_call_interval: Duration::from_secs(0),
            start_on_init: true,
            monitor_poll_period: DEFAULT_MONITOR_POLL_PERIOD,
        }
    }
}

impl TimerBuilder {
    /// Nominal period between invocations. Must be positive; default 60s.
    pub fn set_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Delay before the first invocation. Default zero, run immediately.
    pub fn set_first_call_interval(mut self, first_call_interval: Duration) -> Self {
        self.first_call_interval = first_call_interval;
        self
    }

    /// Whether the schedule starts as part of spawning. Default true.
    pub fn set_start_on_init(mut self, start_on_init: bool) -> Self {
        self.start_on_init = start_on_init;
        self
    }

    /// Poll period of the interval-monitor watch loop. Must be positive;
    /// default 5s.
    pub fn set_monitor_poll_period(mut self, monitor_poll_period: Duration) -> Self {
        self.monitor_poll_period = monitor_poll_period;
        self
    }

    /// Spawns a fixed-interval task around `routine`.
    pub fn spawn_routine<R>(self, routine: R) -> Result<RepeatedTimer<R>, TaskError>
    where
        R: Routine,
    {
        self.check_interval()?;

        let timer = RepeatedTimer::new(routine, self.interval);
        if self.start_on_init {
            timer.start(self.first_call_interval);
        }
        Ok(timer)
    }

    /// Spawns an interval-monitored task around `routine`.
    pub fn spawn_monitored_routine<R>(self, routine: R) -> Result<MonitoredTimer<R>, TaskError>
    where
        R: MonitoredRoutine,
    {
        self.check_interval()?;
        if self.monitor_poll_period.is_zero() {
            return Err(TaskError::ZeroPollPeriod);
        }

        let timer = MonitoredTimer::new(routine, self.interval, self.monitor_poll_period);
        if self.start_on_init {
            timer.start(self.first_call_interval);
        }
        Ok(timer)
    }

    // Configuration errors fail fast at construction time, not at the first
    // invocation.
    fn check_interval(&self) -> Result<(), TaskError> {
        if self.interval.is_zero() {
            return Err(TaskError::ZeroInterval);
        }
        Ok(())
    }
}
