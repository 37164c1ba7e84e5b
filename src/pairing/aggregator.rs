//! Grouping classified paths into samples

use super::matcher::{PairedPath, ReadDirection};
use super::sample::Sample;
use crate::error::PairingError;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default)]
struct Pending {
    r1: Vec<PathBuf>,
    r2: Vec<PathBuf>,
}

/// Group classified paths by key and build validated samples
///
/// Samples come back in the order their key was first seen, which for a
/// sorted scan is deterministic. Every key is validated before any sample
/// is returned: one mismatch fails the whole batch.
pub fn aggregate<I>(classified: I) -> Result<Vec<Sample>, PairingError>
where
    I: IntoIterator<Item = PairedPath>,
{
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Pending> = HashMap::new();

    for PairedPath {
        key,
        direction,
        path,
    } in classified
    {
        let pending = groups.entry(key).or_insert_with_key(|k| {
            order.push(k.clone());
            Pending::default()
        });
        match direction {
            ReadDirection::R1 => pending.r1.push(path),
            ReadDirection::R2 => pending.r2.push(path),
        }
    }

    // Validate all keys first so a failure leaves nothing half-built
    for key in &order {
        let pending = &groups[key];
        if pending.r1.len() != pending.r2.len() {
            return Err(PairingError::Mismatch {
                key: key.clone(),
                r1_count: pending.r1.len(),
                r2_count: pending.r2.len(),
            });
        }
    }

    let mut samples = Vec::with_capacity(order.len());
    for key in order {
        let Pending { r1, r2 } = groups.remove(&key).unwrap_or_default();
        samples.push(Sample::new(key, r1, r2)?);
    }

    let multi = samples.iter().filter(|s| s.multi_fragment()).count();
    info!(samples = samples.len(), multi_fragment = multi, "Grouped samples");

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pp(key: &str, direction: ReadDirection, path: &str) -> PairedPath {
        PairedPath {
            key: key.into(),
            direction,
            path: path.into(),
        }
    }

    #[test]
    fn test_first_seen_order() {
        let samples = aggregate(vec![
            pp("z", ReadDirection::R1, "/d/z_R1.fq"),
            pp("a", ReadDirection::R1, "/d/a_R1.fq"),
            pp("z", ReadDirection::R2, "/d/z_R2.fq"),
            pp("a", ReadDirection::R2, "/d/a_R2.fq"),
        ])
        .unwrap();
        let keys: Vec<_> = samples.iter().map(|s| s.key()).collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn test_mismatch_aborts_everything() {
        let err = aggregate(vec![
            pp("good", ReadDirection::R1, "/d/good_R1.fq"),
            pp("good", ReadDirection::R2, "/d/good_R2.fq"),
            pp("bad", ReadDirection::R1, "/d/bad_R1.fq"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            PairingError::Mismatch {
                key: "bad".into(),
                r1_count: 1,
                r2_count: 0
            }
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(Vec::new()).unwrap().is_empty());
    }
}
