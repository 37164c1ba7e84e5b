//! Read merging
//!
//! Reduces each sample to exactly one R1 and one R2 file in the output
//! directory:
//!
//! - single-fragment samples get a reference link (`Link`)
//! - multi-fragment samples get a byte concatenation (`Concatenate`)
//!
//! Canonical names are `<outdir>/<key>_1.fastq.gz` and `<outdir>/<key>_2.fastq.gz`.
//! A failing sample is dropped from the batch and reported. The rest of the
//! batch goes ahead.

mod strategy;

pub use strategy::{Concatenate, Link, MergeStrategy};

use crate::error::MergeError;
use crate::pairing::{ReadDirection, Sample};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extension given to merged read files
pub const MERGED_EXTENSION: &str = "fastq.gz";

/// The pipeline-ready inputs for one sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedReads {
    pub key: String,
    pub r1: PathBuf,
    pub r2: PathBuf,
    /// Strategy used, `None` for a planned (dry-run) merge
    pub strategy: Option<&'static str>,
    /// Bytes behind the merged R1 plus R2
    pub bytes: u64,
}

/// A sample that could not be merged
#[derive(Debug)]
pub struct MergeFailure {
    pub key: String,
    pub error: MergeError,
}

/// Outcome of merging a whole batch
#[derive(Debug, Default)]
pub struct MergeReport {
    /// Successfully merged samples, in input order
    pub merged: Vec<MergedReads>,
    /// Samples excluded from scheduling
    pub failures: Vec<MergeFailure>,
}

impl MergeReport {
    pub fn total_bytes(&self) -> u64 {
        self.merged.iter().map(|m| m.bytes).sum()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Writes merged inputs into a fixed output directory
#[derive(Debug, Clone)]
pub struct ReadMerger {
    output_dir: PathBuf,
}

impl ReadMerger {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create the output directory if needed
    pub fn prepare(&self) -> Result<(), MergeError> {
        fs::create_dir_all(&self.output_dir).map_err(|source| MergeError::OutputDir {
            path: self.output_dir.clone(),
            source,
        })
    }

    /// Canonical merged path for one sample and direction
    pub fn canonical_path(&self, key: &str, direction: ReadDirection) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}.{}",
            key,
            direction.mate_number(),
            MERGED_EXTENSION
        ))
    }

    /// Destination paths without touching the filesystem
    pub fn canonical_paths(&self, sample: &Sample) -> MergedReads {
        MergedReads {
            key: sample.key().to_string(),
            r1: self.canonical_path(sample.key(), ReadDirection::R1),
            r2: self.canonical_path(sample.key(), ReadDirection::R2),
            strategy: None,
            bytes: 0,
        }
    }

    /// Strategy for a sample, chosen by its fragment count
    pub fn strategy_for(sample: &Sample) -> &'static dyn MergeStrategy {
        if sample.multi_fragment() {
            &Concatenate
        } else {
            &Link
        }
    }

    /// Merge one sample into the output directory
    pub fn merge(&self, sample: &Sample) -> Result<MergedReads, MergeError> {
        let strategy = Self::strategy_for(sample);
        let mut merged = self.canonical_paths(sample);

        let r1_bytes = strategy.merge(sample.r1_paths(), &merged.r1)?;
        let r2_bytes = strategy.merge(sample.r2_paths(), &merged.r2).map_err(|e| {
            // An excluded sample leaves no half of its pair behind
            let _ = fs::remove_file(&merged.r1);
            e
        })?;

        merged.strategy = Some(strategy.name());
        merged.bytes = r1_bytes + r2_bytes;

        debug!(
            sample = sample.key(),
            strategy = strategy.name(),
            fragments = sample.fragment_count(),
            bytes = merged.bytes,
            "Merged reads"
        );

        Ok(merged)
    }

    /// Merge every sample, isolating per-sample failures
    pub fn merge_all(&self, samples: &[Sample]) -> MergeReport {
        let mut report = MergeReport::default();

        for sample in samples {
            match self.merge(sample) {
                Ok(m) => report.merged.push(m),
                Err(error) => {
                    warn!(sample = sample.key(), "Excluding sample: {}", error);
                    report.failures.push(MergeFailure {
                        key: sample.key().to_string(),
                        error,
                    });
                }
            }
        }

        info!(
            merged = report.merged.len(),
            failed = report.failures.len(),
            "Merge complete"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_canonical_paths() {
        let merger = ReadMerger::new("/out");
        let sample = Sample::new("s1", vec!["/d/s1_R1.fq".into()], vec!["/d/s1_R2.fq".into()]).unwrap();
        let planned = merger.canonical_paths(&sample);
        assert_eq!(planned.r1, PathBuf::from("/out/s1_1.fastq.gz"));
        assert_eq!(planned.r2, PathBuf::from("/out/s1_2.fastq.gz"));
        assert_eq!(planned.strategy, None);
    }

    #[test]
    fn test_strategy_selection() {
        let single = Sample::new("a", vec!["/a1".into()], vec!["/a2".into()]).unwrap();
        let multi = Sample::new(
            "b",
            vec!["/b1a".into(), "/b1b".into()],
            vec!["/b2a".into(), "/b2b".into()],
        )
        .unwrap();
        assert_eq!(ReadMerger::strategy_for(&single).name(), "link");
        assert_eq!(ReadMerger::strategy_for(&multi).name(), "concatenate");
    }

    #[test]
    fn test_merge_all_skips_failed_sample() {
        let input = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::write(input.path().join("ok_R1.fq"), b"1").unwrap();
        fs::write(input.path().join("ok_R2.fq"), b"2").unwrap();

        let ok = Sample::new(
            "ok",
            vec![input.path().join("ok_R1.fq")],
            vec![input.path().join("ok_R2.fq")],
        )
        .unwrap();
        let broken = Sample::new(
            "broken",
            vec![input.path().join("gone_a.fq"), input.path().join("gone_b.fq")],
            vec![input.path().join("gone_c.fq"), input.path().join("gone_d.fq")],
        )
        .unwrap();

        let merger = ReadMerger::new(out.path());
        merger.prepare().unwrap();
        let report = merger.merge_all(&[broken, ok]);

        assert_eq!(report.merged.len(), 1);
        assert_eq!(report.merged[0].key, "ok");
        assert_eq!(report.merged[0].bytes, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].key, "broken");
        assert!(report.has_failures());
    }

    #[test]
    fn test_failed_r2_removes_merged_r1() {
        let input = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::write(input.path().join("s_R1.fq"), b"1").unwrap();

        let sample = Sample::new(
            "s",
            vec![input.path().join("s_R1.fq")],
            vec![input.path().join("s_R2.fq")],
        )
        .unwrap();

        let merger = ReadMerger::new(out.path());
        let err = merger.merge(&sample).unwrap_err();

        assert!(matches!(err, MergeError::Link { .. }));
        assert!(fs::symlink_metadata(out.path().join("s_1.fastq.gz")).is_err());
        assert!(input.path().join("s_R1.fq").exists());
    }

    #[test]
    fn test_in_place_output_dir_keeps_sources() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("SRR1_1.fastq.gz"), b"forward").unwrap();
        fs::write(dir.path().join("SRR1_2.fastq.gz"), b"reverse").unwrap();

        let sample = Sample::new(
            "SRR1",
            vec![dir.path().join("SRR1_1.fastq.gz")],
            vec![dir.path().join("SRR1_2.fastq.gz")],
        )
        .unwrap();

        let report = ReadMerger::new(dir.path()).merge_all(&[sample]);

        assert!(report.merged.is_empty());
        assert_eq!(report.failures[0].key, "SRR1");
        assert_eq!(fs::read(dir.path().join("SRR1_1.fastq.gz")).unwrap(), b"forward");
        assert_eq!(fs::read(dir.path().join("SRR1_2.fastq.gz")).unwrap(), b"reverse");
    }

    #[test]
    fn test_prepare_creates_nested_dir() {
        let root = tempdir().unwrap();
        let merger = ReadMerger::new(root.path().join("a/b/c"));
        merger.prepare().unwrap();
        assert!(merger.output_dir().is_dir());
    }
}
