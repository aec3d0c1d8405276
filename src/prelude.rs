//! A "prelude" for users of the `repeated-timer` crate.
//!
//! This prelude is similar to the standard library's prelude in that you'll
//! almost always want to import its entire contents, but unlike the standard
//! library's prelude you'll have to do so manually:
//!
//! ```
//! use repeated_timer::prelude::*;
//! ```
//!
//! The prelude may grow over time as additional items see ubiquitous use.

pub use crate::error::*;
pub use crate::timer::monitor::MonitoredTimer;
pub use crate::timer::task::{MonitoredRoutine, Routine, TimerBuilder};
pub use crate::timer::timer_core::{RepeatedTimer, TimerControl};
pub use crate::utils::launch::{launch_timer_worker, ShutdownSignal};

pub use anyhow::{anyhow, Result as AnyResult};
pub use async_trait::async_trait;
pub use smol::spawn as async_spawn;
pub use smol::Task as SmolJoinHandler;
pub use thiserror::Error;

pub(crate) use event_listener::Event;
pub(crate) use futures::executor::block_on;
pub(crate) use log::{debug, error, info};
pub(crate) use smol::Timer as AsyncTimer;
pub(crate) use std::sync::{Arc, Mutex, MutexGuard};
pub(crate) use std::time::{Duration, Instant};
pub(crate) use tracing::{info_span, Instrument};
