//! fastq-batch - Batch Runner for Paired-End Read Pipelines
//!
//! Finds paired-end FASTQ files under one or more directory trees, groups
//! them into samples, and runs an external per-sample pipeline over every
//! sample with bounded parallelism.
//!
//! # Pipeline
//!
//! ```text
//!  --dir roots
//!      │
//!      ▼
//! ┌──────────────┐  sorted absolute paths
//! │   Scanner    │───────────────────────┐
//! └──────────────┘                       ▼
//!                               ┌──────────────────┐
//!                               │   PairMatcher    │  R1 rule first, then R2
//!                               └────────┬─────────┘
//!                                        ▼
//!                               ┌──────────────────┐
//!                               │    aggregate     │  R1/R2 counts must match
//!                               └────────┬─────────┘
//!                                        ▼ Vec<Sample>
//!                               ┌──────────────────┐
//!                               │   ReadMerger     │  link or concatenate
//!                               └────────┬─────────┘
//!                                        ▼ Vec<MergedReads>
//!                               ┌──────────────────┐
//!                               │ PipelineCommand  │  one Job per sample
//!                               └────────┬─────────┘
//!                                        ▼ Vec<Job>
//!                               ┌──────────────────┐
//!                               │  JobScheduler    │  J workers, one slot each
//!                               └────────┬─────────┘
//!                                        ▼
//!                                 ScheduleReport
//! ```
//!
//! Scanning and pairing errors abort the run before anything is written.
//! Merge failures drop only the affected sample. Job failures are recorded
//! per job.
//!
//! # Example
//!
//! ```bash
//! fastq-batch --dir /data/run1 \
//!     --r1 '(.+)_R1(?:_L\d+)?\.fastq\.gz' --r2 '(.+)_R2(?:_L\d+)?\.fastq\.gz' \
//!     --ref genome.fa --outdir results -j 4 --threads-per-job 8
//! ```

pub mod command;
pub mod config;
pub mod discovery;
pub mod error;
pub mod merge;
pub mod pairing;
pub mod progress;
pub mod scheduler;

pub use command::PipelineCommand;
pub use config::{BatchConfig, CliArgs};
pub use error::{BatchError, Result};
pub use merge::{MergeReport, MergedReads, ReadMerger};
pub use pairing::{aggregate, PairMatcher, Sample};
pub use scheduler::{Job, JobScheduler, ScheduleReport};

use discovery::{ScanStats, Scanner};
use std::path::PathBuf;

/// Discover files under `roots` and group them into validated samples
pub fn discover_samples(
    roots: &[PathBuf],
    matcher: &PairMatcher,
) -> Result<(Vec<Sample>, ScanStats)> {
    let (files, stats) = Scanner::new(roots).scan()?;
    let classified = matcher.classify_all(&files);
    Ok((aggregate(classified)?, stats))
}
