//! Sandboxed file access
//!
//! Concurrent writers to the same file are not coordinated; callers own
//! their workspace exclusively while editing it.

use crate::error::{at, Result, WorkspaceError};
use crate::sandbox::resolve;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Resolve `rel` under `root` and require an existing regular file
///
/// # Errors
/// - [`WorkspaceError::InvalidPath`] on sandbox escape
/// - [`WorkspaceError::NotFound`] if missing or a directory
pub fn locate_file(root: &Path, rel: &str) -> Result<PathBuf> {
    let path = resolve(root, [rel])?;
    if path.is_file() {
        Ok(path)
    } else {
        Err(WorkspaceError::NotFound(format!("file {rel}")))
    }
}

/// Read a UTF-8 text file below `root`
///
/// # Errors
/// - [`WorkspaceError::InvalidPath`] on sandbox escape
/// - [`WorkspaceError::NotFound`] if missing or a directory
/// - [`WorkspaceError::InvalidTarget`] if the content is not UTF-8
pub fn read_file(root: &Path, rel: &str) -> Result<String> {
    let path = locate_file(root, rel)?;
    match fs::read_to_string(&path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            Err(WorkspaceError::InvalidTarget(format!("{rel} is not UTF-8 text")))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Err(WorkspaceError::NotFound(format!("file {rel}"))),
        Err(e) => Err(WorkspaceError::io(path, e)),
    }
}

/// Write `content` to `rel` below `root`, creating parent directories
///
/// The write replaces the whole file but is not atomic: a crash mid-write
/// can leave partial content behind.
///
/// # Errors
/// - [`WorkspaceError::InvalidPath`] on sandbox escape
/// - [`WorkspaceError::InvalidTarget`] if the target is an existing directory
pub fn write_file(root: &Path, rel: &str, content: &str) -> Result<PathBuf> {
    let path = resolve(root, [rel])?;
    if path.is_dir() {
        return Err(WorkspaceError::InvalidTarget(format!("{rel} is a directory")));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(at(parent))?;
    }
    fs::write(&path, content).map_err(at(&path))?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "wrote workspace file");
    Ok(path)
}
