//! Pairing of R1/R2 read files into samples
//!
//! ```text
//! sorted paths ──► PairMatcher ──► PairedPath{key, R1|R2} ──► aggregate ──► Vec<Sample>
//! ```

pub mod aggregator;
pub mod matcher;
pub mod sample;

pub use aggregator::aggregate;
pub use matcher::{PairMatcher, PairedPath, PatternRule, ReadDirection};
pub use sample::Sample;
