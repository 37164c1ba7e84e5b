//! Filesystem strategies for producing a sample's single R1/R2 file

use crate::error::MergeError;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Buffer size for fragment copies
const COPY_BUFFER_SIZE: usize = 1024 * 1024;

/// Produces `dest` from an ordered list of fragments
pub trait MergeStrategy: Send + Sync {
    /// Short name for logs and reports
    fn name(&self) -> &'static str;

    /// Build `dest`, returning the number of bytes it holds
    fn merge(&self, fragments: &[PathBuf], dest: &Path) -> Result<u64, MergeError>;
}

/// Byte-concatenate every fragment, in order, into a new file
#[derive(Debug, Clone, Copy, Default)]
pub struct Concatenate;

impl MergeStrategy for Concatenate {
    fn name(&self) -> &'static str {
        "concatenate"
    }

    fn merge(&self, fragments: &[PathBuf], dest: &Path) -> Result<u64, MergeError> {
        let wrap = |source: io::Error| MergeError::Concatenate {
            dest: dest.to_path_buf(),
            fragments: fragments.len(),
            source,
        };

        guard_sources(fragments, dest).map_err(wrap)?;
        remove_existing(dest).map_err(wrap)?;

        concatenate_into(fragments, dest).map_err(|e| {
            // Don't leave a truncated file behind for the pipeline to pick up
            let _ = fs::remove_file(dest);
            wrap(e)
        })
    }
}

fn concatenate_into(fragments: &[PathBuf], dest: &Path) -> io::Result<u64> {
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, File::create(dest)?);
    let mut total = 0u64;
    for fragment in fragments {
        let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, File::open(fragment)?);
        total += io::copy(&mut reader, &mut writer)?;
    }
    writer.flush()?;
    Ok(total)
}

/// Point `dest` at the single existing fragment without copying it
#[derive(Debug, Clone, Copy, Default)]
pub struct Link;

impl MergeStrategy for Link {
    fn name(&self) -> &'static str {
        "link"
    }

    fn merge(&self, fragments: &[PathBuf], dest: &Path) -> Result<u64, MergeError> {
        let source_path = fragments.first().cloned().unwrap_or_default();
        let wrap = |source: io::Error| MergeError::Link {
            source_path: source_path.clone(),
            dest: dest.to_path_buf(),
            source,
        };

        if fragments.len() != 1 {
            return Err(wrap(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("link needs exactly one fragment, got {}", fragments.len()),
            )));
        }

        guard_sources(fragments, dest).map_err(wrap)?;
        let len = fs::metadata(&source_path).map_err(wrap)?.len();
        remove_existing(dest).map_err(wrap)?;
        create_link(&source_path, dest).map_err(wrap)?;

        Ok(len)
    }
}

/// Refuse a destination that is one of the fragments being merged
///
/// This happens when the output directory is also an input root and the
/// fragment names already follow the merged naming. A link left at `dest`
/// by an earlier run is not a fragment and may be replaced.
fn guard_sources(fragments: &[PathBuf], dest: &Path) -> io::Result<()> {
    let dest_entry = entry_path(dest);
    let dest_file = match fs::symlink_metadata(dest) {
        Ok(meta) if !meta.file_type().is_symlink() => fs::canonicalize(dest).ok(),
        _ => None,
    };

    for fragment in fragments {
        let same_entry = dest_entry.is_some() && entry_path(fragment) == dest_entry;
        let same_file = dest_file.is_some() && fs::canonicalize(fragment).ok() == dest_file;
        if same_entry || same_file {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "merged output '{}' would overwrite source fragment '{}'",
                    dest.display(),
                    fragment.display()
                ),
            ));
        }
    }
    Ok(())
}

/// Directory entry a path names, with its parent resolved but not the entry
fn entry_path(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    Some(fs::canonicalize(parent).ok()?.join(name))
}

/// Remove a file or link left at `dest` by an earlier run
///
/// Writing through a stale symlink would truncate the fragment it points
/// to, so the destination entry itself is always replaced.
fn remove_existing(dest: &Path) -> io::Result<()> {
    match fs::symlink_metadata(dest) {
        Ok(_) => fs::remove_file(dest),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn create_link(source: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, dest)
}

#[cfg(not(unix))]
fn create_link(source: &Path, dest: &Path) -> io::Result<()> {
    fs::hard_link(source, dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_concatenate_order_and_length() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.fq");
        let b = dir.path().join("b.fq");
        fs::write(&a, b"@r1\nACGT\n").unwrap();
        fs::write(&b, b"@r2\nTTTT\n").unwrap();
        let dest = dir.path().join("out.fq");

        let written = Concatenate.merge(&[a, b], &dest).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"@r1\nACGT\n@r2\nTTTT\n");
        assert_eq!(written, 18);
    }

    #[test]
    fn test_concatenate_missing_fragment() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out.fq");
        let err = Concatenate
            .merge(&[dir.path().join("missing.fq")], &dest)
            .unwrap_err();
        assert!(matches!(err, MergeError::Concatenate { fragments: 1, .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn test_link_rejects_multiple_fragments() {
        let dir = tempdir().unwrap();
        let err = Link
            .merge(&[dir.path().join("a"), dir.path().join("b")], &dir.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, MergeError::Link { .. }));
    }

    #[test]
    fn test_link_refuses_to_replace_its_source() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("SRR1_1.fastq.gz");
        fs::write(&src, b"raw reads").unwrap();

        let err = Link.merge(&[src.clone()], &src).unwrap_err();

        assert!(matches!(err, MergeError::Link { .. }));
        assert!(err.to_string().contains("would overwrite source fragment"));
        assert!(!fs::symlink_metadata(&src).unwrap().file_type().is_symlink());
        assert_eq!(fs::read(&src).unwrap(), b"raw reads");
    }

    #[test]
    fn test_concatenate_refuses_fragment_named_like_output() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("s_1.fastq.gz");
        let second = dir.path().join("s_L002.fastq.gz");
        fs::write(&first, b"lane1|").unwrap();
        fs::write(&second, b"lane2").unwrap();

        // Same entry spelled through a `..` detour
        let dest = dir.path().join("sub/../s_1.fastq.gz");
        fs::create_dir(dir.path().join("sub")).unwrap();
        let err = Concatenate.merge(&[first.clone(), second], &dest).unwrap_err();

        assert!(matches!(err, MergeError::Concatenate { fragments: 2, .. }));
        assert_eq!(fs::read(&first).unwrap(), b"lane1|");
    }

    #[cfg(unix)]
    #[test]
    fn test_refuses_dest_reached_through_fragment_link() {
        let dir = tempdir().unwrap();
        let real = dir.path().join("out.fq");
        let alias = dir.path().join("alias.fq");
        fs::write(&real, b"data").unwrap();
        std::os::unix::fs::symlink(&real, &alias).unwrap();

        let err = Link.merge(&[alias], &real).unwrap_err();

        assert!(matches!(err, MergeError::Link { .. }));
        assert_eq!(fs::read(&real).unwrap(), b"data");
    }

    #[cfg(unix)]
    #[test]
    fn test_rerun_does_not_clobber_source() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.fq");
        let other = dir.path().join("other.fq");
        fs::write(&src, b"original").unwrap();
        fs::write(&other, b"other").unwrap();
        let dest = dir.path().join("out.fq");

        // First run leaves a link to src at dest
        Link.merge(&[src.clone()], &dest).unwrap();
        // Second run concatenates into dest and must not write through the link
        Concatenate.merge(&[other], &dest).unwrap();

        assert_eq!(fs::read(&src).unwrap(), b"original");
        assert_eq!(fs::read(&dest).unwrap(), b"other");
        assert!(!fs::symlink_metadata(&dest).unwrap().file_type().is_symlink());
    }
}
