//! Public error of repeated-timer.

use crate::prelude::*;

/// Error enumeration for `Task`-related operations.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The nominal interval of a periodic task must be a positive duration.
    #[error("The task interval must be a positive duration.")]
    ZeroInterval,
    /// The interval-monitor poll period must be a positive duration.
    #[error("The monitor poll period must be a positive duration.")]
    ZeroPollPeriod,
    /// The dedicated worker thread could not be launched.
    #[error("The timer worker thread failed to launch.")]
    WorkerLaunch(#[from] std::io::Error),
}
