//! Moves a finished download from staging into the final root
//!
//! The final root never shows a partially copied directory: a plain rename is
//! used when possible, and across filesystems the tree is copied into a hidden
//! sibling first and renamed into place.

use crate::error::{LibraryError, LibraryResult};
use crate::progress::{BAD_MARKER, OLDER_FILES, PROCESS_LOG};
use loanload_core::LoanLayout;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What [`promote`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promotion {
    /// Staging was moved into place
    Moved,
    /// The final directory already existed; staging was left alone
    AlreadyPresent,
    /// There was no staging directory to move
    NothingStaged,
}

/// Moves `layout.staging_path` to `layout.final_path`
pub fn promote(layout: &LoanLayout) -> LibraryResult<Promotion> {
    if layout.final_path.exists() {
        return Ok(Promotion::AlreadyPresent);
    }
    if !layout.staging_path.is_dir() {
        return Ok(Promotion::NothingStaged);
    }

    // Bookkeeping from earlier attempts stays out of the library
    for marker in [OLDER_FILES, BAD_MARKER, PROCESS_LOG] {
        let path = layout.staging_path.join(marker);
        if path.exists() {
            fs::remove_file(&path)?;
        }
    }

    if let Some(parent) = layout.final_path.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::rename(&layout.staging_path, &layout.final_path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            log::debug!("Staging is on another filesystem, copying instead");
            copy_then_rename(&layout.staging_path, &layout.final_path)?;
            fs::remove_dir_all(&layout.staging_path)?;
        }
        Err(source) => {
            return Err(LibraryError::Promotion {
                from: layout.staging_path.clone(),
                to: layout.final_path.clone(),
                source,
            })
        }
    }

    log::info!(
        "Moved {} to {}",
        layout.staging_path.display(),
        layout.final_path.display()
    );
    Ok(Promotion::Moved)
}

/// Hidden sibling of `target` used while a copy is in flight
fn partial_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.partial", name))
}

fn copy_then_rename(from: &Path, to: &Path) -> LibraryResult<()> {
    let partial = partial_path(to);
    if partial.exists() {
        fs::remove_dir_all(&partial)?;
    }

    copy_tree(from, &partial)?;

    fs::rename(&partial, to).map_err(|source| LibraryError::Promotion {
        from: partial.clone(),
        to: to.to_path_buf(),
        source,
    })
}

pub(crate) fn copy_tree(from: &Path, to: &Path) -> LibraryResult<()> {
    for entry in WalkDir::new(from) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(from).map_err(|e| {
            LibraryError::Io(io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))
        })?;
        let dest = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn staged_layout(dir: &TempDir) -> LoanLayout {
        let layout = LoanLayout::new(
            dir.path().join("tmp").join("libby").join("5"),
            dir.path().join("books").join("libby").join("5"),
        );
        fs::create_dir_all(layout.staging_path.join("disc1")).unwrap();
        fs::write(layout.staging_path.join("part1.mp3"), b"audio").unwrap();
        fs::write(layout.staging_path.join("disc1").join("part2.mp3"), b"audio").unwrap();
        fs::write(layout.staging_path.join(OLDER_FILES), "part1.mp3").unwrap();
        layout
    }

    #[test]
    fn test_promote_moves_staging() {
        let dir = TempDir::new().unwrap();
        let layout = staged_layout(&dir);

        assert_eq!(promote(&layout).unwrap(), Promotion::Moved);
        assert!(!layout.staging_path.exists());
        assert!(layout.final_path.join("part1.mp3").is_file());
        assert!(layout.final_path.join("disc1").join("part2.mp3").is_file());
        assert!(!layout.final_path.join(OLDER_FILES).exists());
    }

    #[test]
    fn test_earlier_failure_log_is_not_promoted() {
        let dir = TempDir::new().unwrap();
        let layout = staged_layout(&dir);
        fs::write(layout.staging_path.join(PROCESS_LOG), "exit code 1\n").unwrap();

        assert_eq!(promote(&layout).unwrap(), Promotion::Moved);
        assert!(layout.final_path.join("part1.mp3").is_file());
        assert!(!layout.final_path.join(PROCESS_LOG).exists());
    }

    #[test]
    fn test_existing_final_is_not_touched() {
        let dir = TempDir::new().unwrap();
        let layout = staged_layout(&dir);
        fs::create_dir_all(&layout.final_path).unwrap();

        assert_eq!(promote(&layout).unwrap(), Promotion::AlreadyPresent);
        assert!(layout.staging_path.join("part1.mp3").exists());
    }

    #[test]
    fn test_nothing_staged() {
        let dir = TempDir::new().unwrap();
        let layout = LoanLayout::new(dir.path().join("s"), dir.path().join("f"));
        assert_eq!(promote(&layout).unwrap(), Promotion::NothingStaged);
    }

    #[test]
    fn test_copy_then_rename_leaves_no_partial() {
        let dir = TempDir::new().unwrap();
        let layout = staged_layout(&dir);
        fs::create_dir_all(layout.final_path.parent().unwrap()).unwrap();

        copy_then_rename(&layout.staging_path, &layout.final_path).unwrap();

        assert!(layout.final_path.join("disc1").join("part2.mp3").is_file());
        assert!(!partial_path(&layout.final_path).exists());
        assert_eq!(
            partial_path(&layout.final_path).file_name().unwrap(),
            ".5.partial"
        );
    }
}
