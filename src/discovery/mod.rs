//! Directory discovery
//!
//! Recursively enumerates the input roots into a sorted list of absolute
//! file paths. Sorting here is what makes sample grouping and fragment
//! order reproducible between runs.

mod scanner;

pub use scanner::{scan_roots, ScanStats, Scanner};
