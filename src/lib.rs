//! RepeatedTimer is a minimal periodic-task scheduler,
//! based on a self-rescheduling deferred-execution chain driven by the
//! runtime provided by smol,
//! which makes it easy to run a unit of work on a fixed cadence and to
//! follow interval changes at runtime without losing phase.
//!
//! # repeated_timer
//!
//! The scheduler recomputes every delay from an absolute timestamp instead
//! of a fixed relative delay, so scheduled slots stay aligned to the
//! original start time no matter how long an invocation takes (until the
//! runtime exceeds the interval, in which case the next slot fires
//! immediately).
//!
//! User applications are served through two task variants:
//!
//! 1. [`RepeatedTimer`](crate::timer::timer_core::RepeatedTimer) runs a
//!    [`Routine`](crate::timer::task::Routine) at a fixed interval with
//!    idempotent start/stop.
//! 2. [`MonitoredTimer`](crate::timer::monitor::MonitoredTimer) also
//!    watches a [`MonitoredRoutine`](crate::timer::task::MonitoredRoutine)'s
//!    desired interval and restarts the schedule on change, preserving the
//!    original phase.
//!
//! # Example
//!
//! ```rust,no_run
//! use repeated_timer::prelude::*;
//! use std::time::Duration;
//!
//! fn main() -> AnyResult<()> {
//!     // Fires immediately, then every six seconds, without cumulative drift.
//!     let timer = TimerBuilder::default()
//!         .set_interval(Duration::from_secs(6))
//!         .spawn_routine(|| println!("tick"))?;
//!
//!     std::thread::sleep(Duration::from_secs(20));
//!     timer.stop_blocking();
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod prelude;
pub mod timer;
pub mod utils;
