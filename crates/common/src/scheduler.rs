mod cron_schedule;
mod error;
mod job_scheduler;

pub use cron_schedule::*;
pub use error::*;
pub use job_scheduler::*;
