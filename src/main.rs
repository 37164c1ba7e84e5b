//! fastq-batch - Batch Runner for Paired-End Read Pipelines
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use fastq_batch::config::{BatchConfig, CliArgs};
use fastq_batch::discover_samples;
use fastq_batch::merge::{MergeReport, ReadMerger};
use fastq_batch::progress::{print_header, print_summary, ProgressReporter};
use fastq_batch::scheduler::JobScheduler;
use std::fs;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Exit status used when interrupted, matching shell convention for SIGINT
const INTERRUPT_EXIT_CODE: i32 = 130;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run a batch; `Ok(false)` means it finished but something failed
fn run() -> Result<bool> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = BatchConfig::from_args(args).context("Invalid configuration")?;

    // Create scheduler
    let mut scheduler = JobScheduler::new(config.job_count, &config.output_dir);
    if let Some(log_dir) = &config.log_dir {
        scheduler = scheduler.with_log_dir(log_dir);
    }

    // Setup signal handler: stop every running job, then exit without draining
    let children = scheduler.children();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, terminating");
        let stopped = children.terminate_all();
        if stopped > 0 {
            eprintln!("Sent SIGTERM to {} running job(s)", stopped);
        }
        std::process::exit(INTERRUPT_EXIT_CODE);
    })
    .context("Failed to set signal handler")?;

    // Print header
    if config.show_progress && !config.dry_run {
        print_header(
            &config.roots,
            config.job_count,
            config.pipeline.threads_per_job,
            &config.output_dir,
        );
    }

    // Discover and pair samples
    let (samples, scan) =
        discover_samples(&config.roots, &config.matcher).context("Failed to discover samples")?;
    if samples.is_empty() {
        info!("No samples matched the R1/R2 patterns");
    }

    let merger = ReadMerger::new(&config.output_dir);

    // Dry run: print the commands and stop
    if config.dry_run {
        let planned: Vec<_> = samples.iter().map(|s| merger.canonical_paths(s)).collect();
        for job in config.pipeline.build_all(&planned) {
            println!("{}", job.rendered());
        }
        return Ok(true);
    }

    // Prepare output locations
    merger.prepare().context("Failed to prepare output directory")?;
    if let Some(log_dir) = &config.log_dir {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    }

    // Merge reads and build one job per merged sample
    let merge: MergeReport = merger.merge_all(&samples);
    let jobs = config.pipeline.build_all(&merge.merged);

    // Create progress reporter
    let progress = config.show_progress.then(|| ProgressReporter::new(jobs.len()));

    // Run the jobs
    let schedule = scheduler
        .run(jobs, |p| {
            if let Some(reporter) = &progress {
                reporter.update(p);
            }
        })
        .context("Job scheduling failed")?;

    // Finish progress
    if let Some(reporter) = &progress {
        if schedule.all_succeeded() {
            reporter.finish("All jobs succeeded");
        } else {
            reporter.finish("Jobs completed with failures");
        }
    }

    // Write JSON report
    if let Some(path) = &config.report_path {
        let json = serde_json::to_string_pretty(&schedule).context("Failed to serialize report")?;
        fs::write(path, json).with_context(|| format!("Failed to write report {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    // Print summary
    if config.show_progress {
        print_summary(&scan, samples.len(), &merge, &schedule, &config.output_dir);
    }

    // Report success/failure
    if merge.has_failures() {
        info!(failed = merge.failures.len(), "Some samples could not be merged");
    }
    if !schedule.all_succeeded() {
        info!(failed = schedule.failed, "Some jobs failed");
    }

    Ok(!merge.has_failures() && schedule.all_succeeded())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("fastq_batch=debug,warn")
    } else {
        EnvFilter::new("fastq_batch=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
