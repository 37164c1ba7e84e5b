//! The `Sample` entity

use crate::error::PairingError;
use std::path::PathBuf;

/// One biological sample with its paired read fragments
///
/// Construction sorts both fragment lists and rejects unequal lengths, so
/// every `Sample` in existence has `r1_paths().len() == r2_paths().len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    key: String,
    r1_paths: Vec<PathBuf>,
    r2_paths: Vec<PathBuf>,
}

impl Sample {
    pub fn new(
        key: impl Into<String>,
        mut r1_paths: Vec<PathBuf>,
        mut r2_paths: Vec<PathBuf>,
    ) -> Result<Self, PairingError> {
        let key = key.into();

        if r1_paths.len() != r2_paths.len() {
            return Err(PairingError::Mismatch {
                key,
                r1_count: r1_paths.len(),
                r2_count: r2_paths.len(),
            });
        }
        if r1_paths.is_empty() {
            return Err(PairingError::Empty { key });
        }

        r1_paths.sort();
        r2_paths.sort();

        Ok(Self {
            key,
            r1_paths,
            r2_paths,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn r1_paths(&self) -> &[PathBuf] {
        &self.r1_paths
    }

    pub fn r2_paths(&self) -> &[PathBuf] {
        &self.r2_paths
    }

    /// Number of fragments per direction
    pub fn fragment_count(&self) -> usize {
        self.r1_paths.len()
    }

    /// True when the sample was split over several files per direction
    pub fn multi_fragment(&self) -> bool {
        self.r1_paths.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorts_fragments() {
        let s = Sample::new(
            "b",
            vec!["/d/b_R1_L002.fq".into(), "/d/b_R1_L001.fq".into()],
            vec!["/d/b_R2_L002.fq".into(), "/d/b_R2_L001.fq".into()],
        )
        .unwrap();
        assert_eq!(s.r1_paths()[0], PathBuf::from("/d/b_R1_L001.fq"));
        assert_eq!(s.r2_paths()[0], PathBuf::from("/d/b_R2_L001.fq"));
        assert!(s.multi_fragment());
        assert_eq!(s.fragment_count(), 2);
    }

    #[test]
    fn test_single_fragment() {
        let s = Sample::new("a", vec!["/d/a_R1.fq".into()], vec!["/d/a_R2.fq".into()]).unwrap();
        assert!(!s.multi_fragment());
    }

    #[test]
    fn test_unequal_counts_rejected() {
        let err = Sample::new(
            "c",
            vec!["/d/c_R1.fq".into()],
            vec!["/d/c_R2_a.fq".into(), "/d/c_R2_b.fq".into()],
        )
        .unwrap_err();
        assert_eq!(
            err,
            PairingError::Mismatch {
                key: "c".into(),
                r1_count: 1,
                r2_count: 2
            }
        );
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(
            Sample::new("e", vec![], vec![]).unwrap_err(),
            PairingError::Empty { key: "e".into() }
        );
    }
}
