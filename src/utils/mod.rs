//! Supporting utilities: process-launch glue around the timer core.

pub mod launch;
