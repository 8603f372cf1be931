//! Site polling scheduler.
//!
//! Every registered site gets one timer job driven by its own schedule.
//! A firing runs one poll cycle; a firing that arrives while the previous
//! cycle for the same site is still running is dropped, not queued.

pub mod poll;
pub mod runner;
pub mod schedule;

pub use poll::{CycleOutcome, PollContext};
pub use runner::JobScheduler;
pub use schedule::{CronSchedule, ScheduleSpec};
