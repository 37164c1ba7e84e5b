//! Progress reporting for batch runs
//!
//! Provides a job progress bar using indicatif, plus the run header and
//! final summary.

use crate::discovery::ScanStats;
use crate::merge::MergeReport;
use crate::scheduler::{ScheduleReport, SchedulerProgress};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Progress bar over the scheduled jobs
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a reporter for `total` jobs
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress template")
                .progress_chars("=> ")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_message("Running jobs");

        Self { bar }
    }

    /// Update the display after a job completes
    pub fn update(&self, progress: &SchedulerProgress) {
        self.bar.set_position(progress.completed as u64);

        let last = if progress.last_succeeded {
            style(&progress.last_key).green()
        } else {
            style(&progress.last_key).red()
        };

        let msg = if progress.failed > 0 {
            format!(
                "last: {} | running: {} | failed: {}",
                last, progress.running, progress.failed
            )
        } else {
            format!("last: {} | running: {}", last, progress.running)
        };

        self.bar.set_message(msg);
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Format a number with thousands separators
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of the run
pub fn print_header(roots: &[PathBuf], jobs: usize, threads_per_job: usize, output: &Path) {
    println!();
    println!(
        "{} {}",
        style("fastq-batch").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    for root in roots {
        println!("  {} {}", style("Source:").bold(), root.display());
    }
    println!(
        "  {} {} x {} threads",
        style("Jobs:").bold(),
        jobs,
        threads_per_job
    );
    println!("  {} {}", style("Output:").bold(), output.display());
    println!();
}

/// Print a summary of the batch results
pub fn print_summary(
    scan: &ScanStats,
    samples: usize,
    merge: &MergeReport,
    schedule: &ScheduleReport,
    output: &Path,
) {
    let duration_secs = scan.duration.as_secs_f64() + schedule.duration.as_secs_f64();
    let heading = if merge.has_failures() || !schedule.all_succeeded() {
        style("Batch Complete (with failures)").yellow().bold()
    } else {
        style("Batch Complete").green().bold()
    };

    println!();
    println!("{}", heading);
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {} in {} directories",
        style("Files Scanned:").bold(),
        format_number(scan.files as usize),
        format_number(scan.dirs as usize)
    );
    println!("  {} {}", style("Samples:").bold(), format_number(samples));
    println!(
        "  {} {}",
        style("Merged Reads:").bold(),
        format_size(merge.total_bytes(), BINARY)
    );
    println!(
        "  {} {} succeeded, {} failed",
        style("Jobs:").bold(),
        format_number(schedule.succeeded),
        format_number(schedule.failed)
    );
    println!("  {} {:.1}s", style("Duration:").bold(), duration_secs);

    if merge.has_failures() {
        println!(
            "  {} {}",
            style("Merge Failures:").yellow().bold(),
            format_number(merge.failures.len())
        );
        for failure in &merge.failures {
            println!("    {} {}", style(&failure.key).red(), failure.error);
        }
    }

    let failed: Vec<_> = schedule.failures().collect();
    if !failed.is_empty() {
        println!("  {}", style("Failed Jobs:").yellow().bold());
        for outcome in failed {
            println!("    {} {:?}", style(&outcome.key).red(), outcome.status);
        }
    }

    println!("  {} {}", style("Output:").bold(), output.display());
    println!();
}
