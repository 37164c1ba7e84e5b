//! R1/R2 pattern classification
//!
//! Each rule is a regular expression with exactly one capturing group that
//! locates the sample key inside a path. The R1 rule always wins: a path
//! the R1 rule matches is never tested against the R2 rule.

use crate::error::ConfigError;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Mate direction of a paired-end read file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadDirection {
    R1,
    R2,
}

impl ReadDirection {
    /// Suffix used for the canonical merged file (`_1` / `_2`)
    pub fn mate_number(self) -> u8 {
        match self {
            ReadDirection::R1 => 1,
            ReadDirection::R2 => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReadDirection::R1 => "R1",
            ReadDirection::R2 => "R2",
        }
    }
}

impl fmt::Display for ReadDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated pattern rule for one direction
#[derive(Debug, Clone)]
pub struct PatternRule {
    direction: ReadDirection,
    regex: Regex,
}

impl PatternRule {
    /// Compile a rule, requiring exactly one capturing group
    pub fn new(direction: ReadDirection, pattern: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidPattern {
            direction: direction.as_str(),
            pattern: pattern.to_string(),
            reason,
        };

        let regex = Regex::new(pattern).map_err(|e| invalid(e.to_string()))?;

        // captures_len() counts the implicit whole-match group
        let groups = regex.captures_len() - 1;
        if groups != 1 {
            return Err(invalid(format!(
                "expected exactly one capturing group, found {}",
                groups
            )));
        }

        Ok(Self { direction, regex })
    }

    /// Extract the sample key from a path string, if the rule matches
    ///
    /// The key is the last path segment of the captured text, so a group
    /// that spans directories still yields a bare sample name.
    pub fn key_for(&self, path: &str) -> Option<String> {
        let caps = self.regex.captures(path)?;
        let captured = caps.get(1)?.as_str();
        let key = captured
            .rsplit(|c: char| c == '/' || c == std::path::MAIN_SEPARATOR)
            .next()
            .unwrap_or(captured);
        if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        }
    }
}

/// A path assigned to a sample and direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedPath {
    pub key: String,
    pub direction: ReadDirection,
    pub path: PathBuf,
}

/// Classifies paths as R1, R2, or ignored
#[derive(Debug, Clone)]
pub struct PairMatcher {
    r1: PatternRule,
    r2: PatternRule,
}

impl PairMatcher {
    /// Build a matcher from already validated rules
    pub fn new(r1: PatternRule, r2: PatternRule) -> Self {
        Self { r1, r2 }
    }

    /// Compile and validate both rules
    pub fn from_patterns(r1: &str, r2: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(
            PatternRule::new(ReadDirection::R1, r1)?,
            PatternRule::new(ReadDirection::R2, r2)?,
        ))
    }

    /// Classify a single path
    pub fn classify(&self, path: &Path) -> Option<PairedPath> {
        let text = path.to_string_lossy();

        // R1 first, and only fall through to R2 when R1 does not match
        let (key, direction) = match self.r1.key_for(&text) {
            Some(key) => (key, self.r1.direction),
            None => (self.r2.key_for(&text)?, self.r2.direction),
        };

        Some(PairedPath {
            key,
            direction,
            path: path.to_path_buf(),
        })
    }

    /// Classify many paths, keeping input order and dropping unmatched ones
    pub fn classify_all<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<PairedPath> {
        let mut matched = Vec::with_capacity(paths.len());
        let mut ignored = 0usize;

        for path in paths {
            match self.classify(path.as_ref()) {
                Some(p) => matched.push(p),
                None => {
                    ignored += 1;
                    trace!("Ignoring {}", path.as_ref().display());
                }
            }
        }

        debug!(matched = matched.len(), ignored, "Classified paths");
        matched
    }
}
