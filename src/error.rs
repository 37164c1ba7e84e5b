//! Error types for fastq-batch
//!
//! This module defines the error hierarchy for a batch run:
//! - Discovery errors (missing or unreadable root directories)
//! - Pairing errors (R1/R2 counts that do not line up)
//! - Merge errors (linking or concatenating fragments)
//! - Configuration and CLI errors
//! - Worker pool errors
//!
//! A non-zero exit of a scheduled pipeline is not an error here. It is
//! recorded as a job status in the schedule report.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the fastq-batch library
#[derive(Error, Debug)]
pub enum BatchError {
    /// Directory scanning errors
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// R1/R2 pairing errors
    #[error("Pairing error: {0}")]
    Pairing(#[from] PairingError),

    /// Fragment merge errors
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker pool errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors (report writing, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while enumerating the input directory trees
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Root directory does not exist
    #[error("Root directory not found: '{path}'")]
    RootNotFound { path: PathBuf },

    /// Root exists but is not a directory
    #[error("Root is not a directory: '{path}'")]
    NotADirectory { path: PathBuf },

    /// Root path could not be made absolute
    #[error("Cannot resolve root '{path}': {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An entry under a root could not be read
    #[error("Failed to read '{path}': {reason}")]
    Walk { path: PathBuf, reason: String },
}

/// Errors raised while grouping classified paths into samples
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PairingError {
    /// Different number of R1 and R2 files for one sample
    #[error("Number of R1 ({r1_count}) and R2 ({r2_count}) files for sample '{key}' do not match")]
    Mismatch {
        key: String,
        r1_count: usize,
        r2_count: usize,
    },

    /// Sample constructed without any fragments
    #[error("Sample '{key}' has no read files")]
    Empty { key: String },
}

/// Errors raised while producing the per-sample R1/R2 inputs
#[derive(Error, Debug)]
pub enum MergeError {
    /// Output directory could not be created
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reference link could not be created
    #[error("Failed to link '{source_path}' to '{dest}': {source}")]
    Link {
        source_path: PathBuf,
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Fragment concatenation failed
    #[error("Failed to concatenate {fragments} fragment(s) into '{dest}': {source}")]
    Concatenate {
        dest: PathBuf,
        fragments: usize,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Pattern rule that does not compile or has the wrong group count
    #[error("Invalid {direction} pattern '{pattern}': {reason}")]
    InvalidPattern {
        direction: &'static str,
        pattern: String,
        reason: String,
    },

    /// Invalid job parallelism
    #[error("Invalid job count {count}: must be between 1 and {max}")]
    InvalidJobCount { count: usize, max: usize },

    /// Invalid threads-per-job
    #[error("Invalid threads per job {count}: must be at least 1")]
    InvalidThreadCount { count: usize },

    /// No root directories supplied
    #[error("At least one directory to scan is required")]
    NoRoots,

    /// Path could not be resolved or is unusable
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: PathBuf, reason: String },
}

/// Worker pool errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker thread could not be started
    #[error("Failed to spawn worker {id}: {source}")]
    Spawn {
        id: usize,
        #[source]
        source: std::io::Error,
    },

    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Result channel closed before every job reported back
    #[error("Result channel closed with {missing} job(s) unaccounted for")]
    ResultChannelClosed { missing: usize },
}

impl WorkerError {
    /// Build a `Panicked` error from a thread join payload
    pub fn from_panic(id: usize, payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        WorkerError::Panicked { id, message }
    }
}

/// Result type alias for fastq-batch operations
pub type Result<T> = std::result::Result<T, BatchError>;
