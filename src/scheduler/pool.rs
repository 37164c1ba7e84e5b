//! Bounded worker pool for external jobs
//!
//! ```text
//!   job channel (submission order)
//!   │
//!   ├── job-worker-0: recv job → spawn process → wait → send outcome
//!   ├── job-worker-1: recv job → spawn process → wait → send outcome
//!   └── job-worker-J: ...
//!   │
//!   └── scheduler thread: recv outcome → fill slot → progress callback
//! ```
//!
//! At most J processes exist at once because each worker owns one slot and
//! waits on its child before taking the next job. Running children are
//! tracked in a [`ChildRegistry`] so an interrupt can stop them.

use super::children::ChildRegistry;
use super::job::{Job, JobOutcome};
use crate::error::WorkerError;
use crossbeam_channel::{bounded, unbounded};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Progress snapshot handed to the callback after every completion
#[derive(Debug, Clone, Default)]
pub struct SchedulerProgress {
    pub completed: usize,
    pub total: usize,
    pub failed: usize,
    pub running: usize,
    /// Sample key of the job that just completed
    pub last_key: String,
    pub last_succeeded: bool,
    pub elapsed: Duration,
}

/// Final report with one slot per submitted job
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScheduleReport {
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Highest number of jobs observed running at once
    pub peak_running: usize,
    #[serde(skip)]
    pub duration: Duration,
    /// Outcomes indexed by submission order
    pub outcomes: Vec<JobOutcome>,
}

impl ScheduleReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.completed == self.total
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }
}

/// Live concurrency gauges shared with the workers
#[derive(Debug, Default)]
struct Gauges {
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauges {
    fn enter(&self) {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs jobs with a fixed parallelism bound
#[derive(Debug, Clone)]
pub struct JobScheduler {
    parallelism: usize,
    working_dir: PathBuf,
    log_dir: Option<PathBuf>,
    children: ChildRegistry,
}

impl JobScheduler {
    /// Create a scheduler; a parallelism of zero is treated as one
    pub fn new(parallelism: usize, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            parallelism: parallelism.max(1),
            working_dir: working_dir.into(),
            log_dir: None,
            children: ChildRegistry::new(),
        }
    }

    /// Send each job's stdout/stderr to `<dir>/<key>.log`
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Handle to the processes this scheduler has running
    pub fn children(&self) -> ChildRegistry {
        self.children.clone()
    }

    /// Run every job to completion and collect the outcomes
    pub fn run<F>(&self, jobs: Vec<Job>, mut on_progress: F) -> Result<ScheduleReport, WorkerError>
    where
        F: FnMut(&SchedulerProgress),
    {
        let start = Instant::now();
        let total = jobs.len();
        let mut report = ScheduleReport {
            total,
            ..Default::default()
        };
        if total == 0 {
            return Ok(report);
        }

        let worker_count = self.parallelism.min(total);
        let gauges = Arc::new(Gauges::default());

        // Queue all jobs up front, in order; workers pull from the front
        let (job_tx, job_rx) = bounded::<Job>(total);
        for job in jobs {
            // Capacity equals the job count and the receiver is alive
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let (outcome_tx, outcome_rx) = unbounded::<JobOutcome>();

        info!(jobs = total, workers = worker_count, "Starting jobs");

        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let job_rx = job_rx.clone();
            let outcome_tx = outcome_tx.clone();
            let gauges = Arc::clone(&gauges);
            let working_dir = self.working_dir.clone();
            let log_dir = self.log_dir.clone();
            let children = self.children.clone();

            let handle = thread::Builder::new()
                .name(format!("job-worker-{}", id))
                .spawn(move || {
                    while let Ok(job) = job_rx.recv() {
                        debug!(worker = id, sample = job.key(), "Running {}", job.rendered());
                        gauges.enter();
                        let outcome = job.execute(&working_dir, log_dir.as_deref(), &children);
                        gauges.leave();
                        if outcome_tx.send(outcome).is_err() {
                            break;
                        }
                    }
                })
                .map_err(|source| WorkerError::Spawn { id, source })?;

            handles.push(handle);
        }

        // Only the workers hold senders now
        drop(outcome_tx);
        drop(job_rx);

        let mut slots: Vec<Option<JobOutcome>> = vec![None; total];
        while let Ok(outcome) = outcome_rx.recv() {
            report.completed += 1;
            if outcome.succeeded() {
                report.succeeded += 1;
                info!(sample = %outcome.key, secs = outcome.duration.as_secs(), "Job succeeded");
            } else {
                report.failed += 1;
                warn!(sample = %outcome.key, status = ?outcome.status, "Job failed");
            }

            let progress = SchedulerProgress {
                completed: report.completed,
                total,
                failed: report.failed,
                running: gauges.running.load(Ordering::SeqCst),
                last_key: outcome.key.clone(),
                last_succeeded: outcome.succeeded(),
                elapsed: start.elapsed(),
            };

            let index = outcome.index;
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(outcome);
            }
            on_progress(&progress);
        }

        for (id, handle) in handles.into_iter().enumerate() {
            handle
                .join()
                .map_err(|payload| WorkerError::from_panic(id, payload))?;
        }

        let missing = slots.iter().filter(|s| s.is_none()).count();
        if missing > 0 {
            return Err(WorkerError::ResultChannelClosed { missing });
        }

        report.outcomes = slots.into_iter().flatten().collect();
        report.peak_running = gauges.peak.load(Ordering::SeqCst);
        report.duration = start.elapsed();

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            secs = report.duration.as_secs(),
            "All jobs completed"
        );

        Ok(report)
    }
}
