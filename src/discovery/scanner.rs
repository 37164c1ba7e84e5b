//! Local filesystem scanner
//!
//! Walks every root with `walkdir`, following symlinks so that linked
//! FASTQ files are picked up like regular ones. Any error during the walk
//! is fatal: a partial file list would silently drop fragments. Dangling
//! symlinks are the one exception and are skipped.

use crate::error::DiscoveryError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Statistics from a completed scan
#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    /// Number of roots walked
    pub roots: usize,
    /// Regular files found (after deduplication)
    pub files: u64,
    /// Directories visited
    pub dirs: u64,
    /// Total duration
    pub duration: Duration,
}

/// Recursive scanner over one or more root directories
#[derive(Debug, Clone)]
pub struct Scanner {
    roots: Vec<PathBuf>,
}

impl Scanner {
    /// Create a scanner over the given roots
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    /// Walk every root and return the sorted, deduplicated file list
    pub fn scan(&self) -> Result<(Vec<PathBuf>, ScanStats), DiscoveryError> {
        let start = Instant::now();
        let mut files = Vec::new();
        let mut dirs = 0u64;

        for root in &self.roots {
            let root = resolve_root(root)?;
            debug!("Scanning {}", root.display());

            for entry in WalkDir::new(&root).follow_links(true) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) if is_dangling_link(&e) => {
                        if let Some(path) = e.path() {
                            debug!("Skipping dangling symlink {}", path.display());
                        }
                        continue;
                    }
                    Err(e) => {
                        return Err(DiscoveryError::Walk {
                            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone()),
                            reason: e.to_string(),
                        })
                    }
                };

                let file_type = entry.file_type();
                if file_type.is_dir() {
                    dirs += 1;
                } else if file_type.is_file() {
                    files.push(entry.into_path());
                }
            }
        }

        files.sort();
        files.dedup();

        let stats = ScanStats {
            roots: self.roots.len(),
            files: files.len() as u64,
            dirs,
            duration: start.elapsed(),
        };

        info!(
            roots = stats.roots,
            dirs = stats.dirs,
            files = stats.files,
            "Scan complete"
        );

        Ok((files, stats))
    }
}

/// A link whose target is missing, which walkdir reports as NotFound
fn is_dangling_link(err: &walkdir::Error) -> bool {
    let not_found = err
        .io_error()
        .is_some_and(|e| e.kind() == io::ErrorKind::NotFound);

    not_found
        && err
            .path()
            .and_then(|p| fs::symlink_metadata(p).ok())
            .is_some_and(|m| m.file_type().is_symlink())
}

/// Scan the given roots with default settings
pub fn scan_roots<P: AsRef<Path>>(roots: &[P]) -> Result<Vec<PathBuf>, DiscoveryError> {
    let (files, _) = Scanner::new(roots.iter().map(|r| r.as_ref().to_path_buf())).scan()?;
    Ok(files)
}

/// Check a root exists and is a directory, and make it absolute
fn resolve_root(root: &Path) -> Result<PathBuf, DiscoveryError> {
    let metadata = match fs::metadata(root) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DiscoveryError::RootNotFound {
                path: root.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(DiscoveryError::Walk {
                path: root.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };

    if !metadata.is_dir() {
        return Err(DiscoveryError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    std::path::absolute(root).map_err(|source| DiscoveryError::Resolve {
        path: root.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_scan_is_sorted_and_absolute() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/nested")).unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("b/nested/z.fq"), b"z").unwrap();
        fs::write(dir.path().join("a/y.fq"), b"y").unwrap();
        fs::write(dir.path().join("x.txt"), b"x").unwrap();

        let files = scan_roots(&[dir.path()]).unwrap();

        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|p| p.is_absolute()));
        let mut sorted = files.clone();
        sorted.sort();
        assert_eq!(files, sorted);
        assert!(files[0].ends_with("a/y.fq"));
    }

    #[test]
    fn test_overlapping_roots_are_deduplicated() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/r.fq"), b"r").unwrap();

        let files = scan_roots(&[dir.path().to_path_buf(), dir.path().join("sub")]).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let err = scan_roots(&[missing.clone()]).unwrap_err();
        match err {
            DiscoveryError::RootNotFound { path } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_file_root_is_rejected() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain.fq");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            scan_roots(&[file]),
            Err(DiscoveryError::NotADirectory { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_files_are_included() {
        let dir = tempdir().unwrap();
        let data = tempdir().unwrap();
        fs::write(data.path().join("real.fq"), b"r").unwrap();
        std::os::unix::fs::symlink(data.path().join("real.fq"), dir.path().join("link.fq"))
            .unwrap();

        let files = scan_roots(&[dir.path()]).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("link.fq"));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_skipped() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lane")).unwrap();
        fs::write(dir.path().join("lane/s_R1.fq"), b"r").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.fq"), dir.path().join("lane/stale.fq"))
            .unwrap();

        let (files, stats) = Scanner::new([dir.path()]).scan().unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("lane/s_R1.fq"));
        assert_eq!(stats.files, 1);
        assert_eq!(stats.dirs, 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_still_fatal() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("s_R1.fq"), b"r").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores permission bits, so only check when they apply
        let readable = fs::read_dir(&locked).is_ok();
        let result = scan_roots(&[dir.path()]);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        if !readable {
            assert!(matches!(result, Err(DiscoveryError::Walk { .. })));
        }
    }
}
