//! Lazy creation of empty placeholder files for torrent entries.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Component, Path, PathBuf};

use seedline_torrent_core::FileEntry;
use tracing::{debug, warn};

use crate::error::{FsOpsError, FsOpsResult};

/// Outcome of a placeholder pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaceholderReport {
    /// Files newly created.
    pub created: usize,
    /// Files that were already present.
    pub existing: usize,
    /// Entries skipped because creation failed or the path was unsafe.
    pub failed: usize,
}

/// Resolves file entries beneath a root directory and materialises them.
#[derive(Debug, Clone)]
pub struct FileEntryManager {
    root: PathBuf,
}

impl FileEntryManager {
    /// Manager rooted at `root` (the parent of a session's data path).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory entries are resolved against.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk location of `entry`, or `None` when its path escapes the root.
    #[must_use]
    pub fn entry_path(&self, entry: &FileEntry) -> Option<PathBuf> {
        let relative = Path::new(&entry.path);
        let safe = !entry.path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        safe.then(|| self.root.join(relative))
    }

    /// Ensure each entry has a file on disk. Per-entry failures are logged and
    /// counted, never returned.
    pub fn ensure_placeholders(&self, entries: &[FileEntry]) -> PlaceholderReport {
        let mut report = PlaceholderReport::default();
        for entry in entries {
            let Some(path) = self.entry_path(entry) else {
                warn!(entry = %entry.path, root = %self.root.display(), "file entry escapes root; skipping");
                report.failed += 1;
                continue;
            };
            match create_placeholder(&path) {
                Ok(true) => report.created += 1,
                Ok(false) => report.existing += 1,
                Err(err) => {
                    warn!(error = %err, path = %path.display(), "placeholder creation failed");
                    report.failed += 1;
                }
            }
        }
        debug!(
            root = %self.root.display(),
            created = report.created,
            existing = report.existing,
            failed = report.failed,
            "placeholders ensured"
        );
        report
    }
}

fn create_placeholder(path: &Path) -> FsOpsResult<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| FsOpsError::io("placeholder.create_parent", parent, source))?;
    }
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(FsOpsError::io("placeholder.create", path, err)),
    }
}
