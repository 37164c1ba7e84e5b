//! Parallel job scheduling
//!
//! Runs one external process per sample under a fixed parallelism bound.
//! A failing job never stops its siblings; every job ends up in its own
//! result slot in the returned [`ScheduleReport`].

mod children;
mod job;
mod pool;

pub use children::ChildRegistry;
pub use job::{Job, JobOutcome, JobStatus};
pub use pool::{JobScheduler, ScheduleReport, SchedulerProgress};
