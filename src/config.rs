//! Configuration types for fastq-batch
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - Pattern rule compilation

use crate::command::{PipelineCommand, DEFAULT_PIPELINE};
use crate::error::ConfigError;
use crate::pairing::PairMatcher;
use clap::Parser;
use std::path::PathBuf;
use tracing::warn;

/// Maximum reasonable job parallelism
const MAX_JOBS: usize = 512;

/// Default threads handed to each pipeline run
const DEFAULT_THREADS_PER_JOB: usize = 10;

/// Default number of concurrent pipeline runs
const DEFAULT_JOBS: usize = 4;

/// Directory under the output location holding per-job logs
const LOG_SUBDIR: &str = "logs";

/// Find paired FASTQ files and run a per-sample pipeline on each
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fastq-batch",
    version,
    about = "Find paired FASTQ files and run a per-sample pipeline on each",
    long_about = "Recursively scans directories for paired-end read files, groups them into \
                  samples using R1/R2 patterns, merges multi-lane samples, and runs the \
                  variant-calling pipeline for every sample in parallel.\n\n\
                  Each pattern must contain exactly one capturing group holding the sample name.",
    after_help = "EXAMPLES:\n    \
        fastq-batch --dir /data/run1 --r1 '(.+)_R1.fastq.gz' --r2 '(.+)_R2.fastq.gz' \\\n        \
            --ref genome.fa --outdir results\n    \
        fastq-batch --dir /a /b --r1 '(.+)_S\\d+_L00\\d_R1' --r2 '(.+)_S\\d+_L00\\d_R2' \\\n        \
            --ref genome.fa --outdir results -j 8 --threads-per-job 4\n    \
        fastq-batch ... --dry-run  # print commands only"
)]
pub struct CliArgs {
    /// Directories to search for FASTQ files
    #[arg(long = "dir", value_name = "DIR", num_args = 1.., required = true)]
    pub dirs: Vec<PathBuf>,

    /// Pattern matching R1 files (one capturing group = sample name)
    #[arg(long = "r1", value_name = "REGEX")]
    pub r1_pattern: String,

    /// Pattern matching R2 files (one capturing group = sample name)
    #[arg(long = "r2", value_name = "REGEX")]
    pub r2_pattern: String,

    /// Reference genome
    #[arg(long = "ref", value_name = "FILE")]
    pub reference: PathBuf,

    /// Output directory (merged reads and pipeline outputs)
    #[arg(long, value_name = "DIR")]
    pub outdir: PathBuf,

    /// Number of threads per job
    #[arg(long, default_value_t = DEFAULT_THREADS_PER_JOB, value_name = "NUM")]
    pub threads_per_job: usize,

    /// Number of jobs to run in parallel
    #[arg(short = 'j', long, default_value_t = DEFAULT_JOBS, value_name = "NUM")]
    pub jobs: usize,

    /// Pipeline executable invoked per sample
    #[arg(long, env = "FASTQ_BATCH_PIPELINE", default_value = DEFAULT_PIPELINE, value_name = "PROG")]
    pub pipeline: String,

    /// Print the commands that would run, without merging or running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Write each job's stdout/stderr to <outdir>/logs/<sample>.log
    #[arg(long)]
    pub job_logs: bool,

    /// Write a JSON report of job outcomes
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Root directories to scan
    pub roots: Vec<PathBuf>,

    /// Compiled R1/R2 rules
    pub matcher: PairMatcher,

    /// Pipeline invocation template
    pub pipeline: PipelineCommand,

    /// Absolute output/working directory
    pub output_dir: PathBuf,

    /// Job parallelism bound
    pub job_count: usize,

    /// Per-job log directory, if capturing logs
    pub log_dir: Option<PathBuf>,

    /// JSON report destination
    pub report_path: Option<PathBuf>,

    /// Only print commands
    pub dry_run: bool,

    /// Show progress indicator
    pub show_progress: bool,
}

impl BatchConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if args.dirs.is_empty() {
            return Err(ConfigError::NoRoots);
        }

        if args.jobs == 0 || args.jobs > MAX_JOBS {
            return Err(ConfigError::InvalidJobCount {
                count: args.jobs,
                max: MAX_JOBS,
            });
        }

        if args.threads_per_job == 0 {
            return Err(ConfigError::InvalidThreadCount {
                count: args.threads_per_job,
            });
        }

        let matcher = PairMatcher::from_patterns(&args.r1_pattern, &args.r2_pattern)?;

        let output_dir = std::path::absolute(&args.outdir).map_err(|e| ConfigError::InvalidPath {
            path: args.outdir.clone(),
            reason: e.to_string(),
        })?;

        // The pipeline runs from the output dir, so a relative reference must be anchored now
        let reference = std::path::absolute(&args.reference).map_err(|e| ConfigError::InvalidPath {
            path: args.reference.clone(),
            reason: e.to_string(),
        })?;
        if !reference.exists() {
            warn!("Reference '{}' does not exist", reference.display());
        }

        if let Some(report) = &args.report {
            if let Some(parent) = report.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(ConfigError::InvalidPath {
                        path: report.clone(),
                        reason: format!("Parent directory '{}' does not exist", parent.display()),
                    });
                }
            }
        }

        let requested = args.jobs * args.threads_per_job;
        let cores = num_cpus::get();
        if requested > cores {
            warn!(
                "{} jobs x {} threads = {} threads requested, but only {} CPUs available",
                args.jobs, args.threads_per_job, requested, cores
            );
        }

        let log_dir = args.job_logs.then(|| output_dir.join(LOG_SUBDIR));

        Ok(Self {
            roots: args.dirs,
            matcher,
            pipeline: PipelineCommand::new(reference, args.threads_per_job)
                .with_program(args.pipeline),
            output_dir,
            job_count: args.jobs,
            log_dir,
            report_path: args.report,
            dry_run: args.dry_run,
            show_progress: !args.quiet,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec![
            "fastq-batch",
            "--dir",
            "/data",
            "--r1",
            "(.+)_R1",
            "--r2",
            "(.+)_R2",
            "--ref",
            "/ref/genome.fa",
            "--outdir",
            "/out",
        ];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = BatchConfig::from_args(args(&[])).unwrap();
        assert_eq!(config.job_count, 4);
        assert_eq!(config.pipeline.threads_per_job, 10);
        assert_eq!(config.output_dir, PathBuf::from("/out"));
        assert!(config.log_dir.is_none());
        assert!(config.show_progress);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_multiple_dirs() {
        let parsed = CliArgs::try_parse_from([
            "fastq-batch", "--dir", "/a", "/b", "--r1", "(.+)_R1", "--r2", "(.+)_R2",
            "--ref", "/r.fa", "--outdir", "/o",
        ])
        .unwrap();
        assert_eq!(parsed.dirs, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[test]
    fn test_job_logs_dir() {
        let config = BatchConfig::from_args(args(&["--job-logs"])).unwrap();
        assert_eq!(config.log_dir, Some(PathBuf::from("/out/logs")));
    }

    #[test]
    fn test_invalid_counts() {
        assert!(matches!(
            BatchConfig::from_args(args(&["--jobs", "0"])),
            Err(ConfigError::InvalidJobCount { .. })
        ));
        assert!(matches!(
            BatchConfig::from_args(args(&["--threads-per-job", "0"])),
            Err(ConfigError::InvalidThreadCount { .. })
        ));
    }

    #[test]
    fn test_pattern_without_group_rejected() {
        let mut a = args(&[]);
        a.r2_pattern = "_R2".into();
        assert!(matches!(
            BatchConfig::from_args(a),
            Err(ConfigError::InvalidPattern { direction: "R2", .. })
        ));
    }

    #[test]
    fn test_missing_dir_arg() {
        assert!(CliArgs::try_parse_from([
            "fastq-batch", "--r1", "(a)", "--r2", "(b)", "--ref", "/r", "--outdir", "/o",
        ])
        .is_err());
    }
}
