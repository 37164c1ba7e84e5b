//! Per-sample pipeline command construction
//!
//! A job is executed from its argument vector, never through a shell, so
//! paths with spaces or metacharacters cannot split or inject arguments.
//! The rendered string form is quoted for display and copy-paste.

use crate::merge::MergedReads;
use crate::scheduler::Job;
use std::path::PathBuf;

/// Default external pipeline executable
pub const DEFAULT_PIPELINE: &str = "fastq2vcf.py";

/// Default pipeline subcommand
pub const DEFAULT_SUBCOMMAND: &str = "all";

/// Template for the external per-sample pipeline invocation
#[derive(Debug, Clone)]
pub struct PipelineCommand {
    pub program: String,
    pub subcommand: String,
    pub reference: PathBuf,
    pub threads_per_job: usize,
}

impl PipelineCommand {
    pub fn new(reference: impl Into<PathBuf>, threads_per_job: usize) -> Self {
        Self {
            program: DEFAULT_PIPELINE.to_string(),
            subcommand: DEFAULT_SUBCOMMAND.to_string(),
            reference: reference.into(),
            threads_per_job,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Argument vector, in the fixed order the pipeline expects
    pub fn args_for(&self, merged: &MergedReads) -> Vec<String> {
        vec![
            self.subcommand.clone(),
            "--ref".to_string(),
            self.reference.to_string_lossy().into_owned(),
            "-1".to_string(),
            merged.r1.to_string_lossy().into_owned(),
            "-2".to_string(),
            merged.r2.to_string_lossy().into_owned(),
            "--prefix".to_string(),
            merged.key.clone(),
            "--bam-qc".to_string(),
            "--cram".to_string(),
            "--threads".to_string(),
            self.threads_per_job.to_string(),
        ]
    }

    pub fn build(&self, index: usize, merged: &MergedReads) -> Job {
        Job::new(index, merged.key.clone(), self.program.clone(), self.args_for(merged))
    }

    /// One job per merged sample, preserving order
    pub fn build_all(&self, merged: &[MergedReads]) -> Vec<Job> {
        merged
            .iter()
            .enumerate()
            .map(|(i, m)| self.build(i, m))
            .collect()
    }
}

/// Quote a token for a POSIX shell if it needs it
pub fn shell_quote(token: &str) -> String {
    let safe = !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"_-./=:,+@%".contains(&b));
    if safe {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', r"'\''"))
    }
}
