//! Error types for workspace operations
//!
//! Every structural problem is detected before any mutation happens, so a
//! returned error never leaves a half-applied change behind (except for the
//! non-atomic file write, which is documented on [`crate::write_file`]).

use std::path::{Path, PathBuf};

/// Result alias used throughout this crate
pub type Result<T> = std::result::Result<T, WorkspaceError>;

/// Workspace error taxonomy
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// Workspace, project, template or file is absent
    #[error("not found: {0}")]
    NotFound(String),

    /// Project id collision without overwrite
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Resolved path escapes its sandbox root, or an id is not a single path component
    #[error("invalid path (escapes sandbox root): {0}")]
    InvalidPath(String),

    /// Operation applied to the wrong kind of entry
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// Underlying filesystem failure
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        /// Path the failing operation touched
        path: PathBuf,
        /// Original error
        #[source]
        source: std::io::Error,
    },
}

impl WorkspaceError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if error means "the thing is not there"
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if error was raised by a structural check rather than by the filesystem
    #[inline]
    #[must_use]
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }
}

/// Build a closure that tags an I/O error with `path`
pub(crate) fn at(path: &Path) -> impl FnOnce(std::io::Error) -> WorkspaceError + '_ {
    move |source| WorkspaceError::io(path, source)
}
