//! Copy-then-delete relocation helpers.
//!
//! Nothing here deletes a source before its copy has completed. A failure part
//! way through leaves earlier copies in place; callers reconcile.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{FsOpsError, FsOpsResult};

/// A file copied to a new location whose original still exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedFile {
    /// Original location, pending removal.
    pub from: PathBuf,
    /// New location.
    pub to: PathBuf,
}

/// Copy a single file, creating the destination's parent directories.
///
/// # Errors
///
/// Returns [`FsOpsError::Io`] when the parent cannot be created or the copy fails.
pub fn copy_file(source: &Path, destination: &Path) -> FsOpsResult<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .map_err(|source_err| FsOpsError::io("copy_file.create_parent", parent, source_err))?;
    }
    fs::copy(source, destination)
        .map_err(|source_err| FsOpsError::io("copy_file.copy", destination, source_err))?;
    Ok(())
}

/// Recursively copy `source` (file or directory) to `destination`.
///
/// # Errors
///
/// Returns [`FsOpsError`] when traversal or any individual copy fails.
pub fn copy_tree(source: &Path, destination: &Path) -> FsOpsResult<()> {
    if source.is_file() {
        return copy_file(source, destination);
    }

    fs::create_dir_all(destination)
        .map_err(|source_err| FsOpsError::io("copy_tree.create_dir", destination, source_err))?;

    for entry in WalkDir::new(source) {
        let entry =
            entry.map_err(|source_err| FsOpsError::walkdir("copy_tree.walk", source, source_err))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| FsOpsError::InvalidInput {
                field: "source_path",
                reason: "strip_prefix",
                value: Some(entry.path().to_string_lossy().into_owned()),
            })?;
        let target_path = destination.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target_path).map_err(|source_err| {
                FsOpsError::io("copy_tree.create_dir", &target_path, source_err)
            })?;
        } else {
            copy_file(entry.path(), &target_path)?;
        }
    }
    Ok(())
}

/// Move `source` to `destination`, falling back to copy-then-delete across
/// filesystems.
///
/// # Errors
///
/// Returns [`FsOpsError`] when the copy fails or the original cannot be removed.
pub fn move_tree(source: &Path, destination: &Path) -> FsOpsResult<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .map_err(|source_err| FsOpsError::io("move_tree.create_parent", parent, source_err))?;
    }
    if fs::rename(source, destination).is_ok() {
        return Ok(());
    }
    copy_tree(source, destination)?;
    let removal = if source.is_dir() {
        fs::remove_dir_all(source)
    } else {
        fs::remove_file(source)
    };
    match removal {
        Err(err) if err.kind() != io::ErrorKind::NotFound => {
            Err(FsOpsError::io("move_tree.cleanup", source, err))
        }
        _ => Ok(()),
    }
}

/// Copy each existing companion file into `target_dir`.
///
/// Missing sources are skipped with a warning; sources already inside
/// `target_dir` are left alone. Originals are not removed.
///
/// # Errors
///
/// Returns the first copy failure; copies made before it remain on disk.
pub fn relocate_companions(files: &[&Path], target_dir: &Path) -> FsOpsResult<Vec<CopiedFile>> {
    let mut copied = Vec::with_capacity(files.len());
    for source in files {
        let Some(file_name) = source.file_name() else {
            return Err(FsOpsError::InvalidInput {
                field: "companion",
                reason: "path has no file name",
                value: Some(source.display().to_string()),
            });
        };
        if source.parent() == Some(target_dir) {
            continue;
        }
        if !source.exists() {
            warn!(path = %source.display(), "companion file missing; skipping");
            continue;
        }
        let destination = target_dir.join(file_name);
        copy_file(source, &destination)?;
        info!(
            from = %source.display(),
            to = %destination.display(),
            "companion file copied"
        );
        copied.push(CopiedFile {
            from: source.to_path_buf(),
            to: destination,
        });
    }
    Ok(copied)
}

/// Remove files, tolerating ones that are already gone.
///
/// # Errors
///
/// Returns [`FsOpsError::Io`] for the first removal that fails for another reason.
pub fn remove_files<P: AsRef<Path>>(paths: &[P]) -> FsOpsResult<()> {
    for path in paths {
        let path = path.as_ref();
        match fs::remove_file(path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => {
                return Err(FsOpsError::io("remove_files.remove", path, err));
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copy_tree_preserves_nested_layout() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("album");
        fs::create_dir_all(source.join("cd1"))?;
        fs::write(source.join("cd1/01.flac"), b"track")?;
        fs::write(source.join("cover.jpg"), b"img")?;

        let destination = temp.path().join("out/album");
        copy_tree(&source, &destination)?;

        assert_eq!(fs::read(destination.join("cd1/01.flac"))?, b"track");
        assert_eq!(fs::read(destination.join("cover.jpg"))?, b"img");
        assert!(source.join("cover.jpg").exists());
        Ok(())
    }

    #[test]
    fn move_tree_relocates_files_and_directories() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let file = temp.path().join("a.bin");
        fs::write(&file, b"data")?;
        let moved = temp.path().join("seed/a.bin");
        move_tree(&file, &moved)?;
        assert!(!file.exists());
        assert_eq!(fs::read(&moved)?, b"data");

        let dir = temp.path().join("dir");
        fs::create_dir_all(dir.join("nested"))?;
        fs::write(dir.join("nested/x"), b"x")?;
        let moved_dir = temp.path().join("seed/dir");
        move_tree(&dir, &moved_dir)?;
        assert!(!dir.exists());
        assert!(moved_dir.join("nested/x").is_file());
        Ok(())
    }

    #[test]
    fn relocate_companions_copies_without_deleting() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let torrent = temp.path().join("a.torrent");
        let resume = temp.path().join("a.fastresume");
        let missing = temp.path().join("gone.fastresume");
        fs::write(&torrent, b"t")?;
        fs::write(&resume, b"r")?;
        let target = temp.path().join("uploads");

        let copied =
            relocate_companions(&[torrent.as_path(), resume.as_path(), missing.as_path()], &target)?;

        assert_eq!(copied.len(), 2);
        assert!(torrent.exists() && resume.exists());
        assert_eq!(fs::read(target.join("a.torrent"))?, b"t");
        assert_eq!(fs::read(target.join("a.fastresume"))?, b"r");
        assert_eq!(copied[1].to, target.join("a.fastresume"));
        Ok(())
    }

    #[test]
    fn relocate_companions_skips_files_already_in_target() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let torrent = temp.path().join("a.torrent");
        fs::write(&torrent, b"t")?;
        let copied = relocate_companions(&[torrent.as_path()], temp.path())?;
        assert!(copied.is_empty());
        assert!(torrent.exists());
        Ok(())
    }

    #[test]
    fn remove_files_tolerates_missing_paths() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let present = temp.path().join("present");
        fs::write(&present, b"p")?;
        remove_files(&[present.clone(), temp.path().join("absent")])?;
        assert!(!present.exists());
        Ok(())
    }

    #[test]
    fn remove_files_reports_directories() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let dir = temp.path().join("dir");
        fs::create_dir(&dir)?;
        let err = remove_files(&[dir]).expect_err("directories are not files");
        assert_eq!(err.operation(), Some("remove_files.remove"));
        Ok(())
    }
}
