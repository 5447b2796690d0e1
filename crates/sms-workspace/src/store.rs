//! Workspace storage
//!
//! Layout on disk:
//!
//! ```text
//! <base>/<workspace-id>/games/__init__.py
//! <base>/<workspace-id>/games/<game-id>/...
//! ```
//!
//! Workspaces are never expired here; removing one is an explicit caller
//! action ([`WorkspaceStore::remove_workspace`]).

use crate::error::{at, Result, WorkspaceError};
use crate::sandbox::resolve;
use crate::types::{GameId, WorkspaceId};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-workspace directory holding game projects
pub const GAMES_DIR: &str = "games";

/// Package marker written into every games root so `games.<id>` is importable
pub const PACKAGE_MARKER: &str = "__init__.py";

/// Static content of [`PACKAGE_MARKER`]
pub const PACKAGE_MARKER_CONTENT: &str = "# workspace games package\n";

/// Creates and locates workspaces under a base directory
#[derive(Debug, Clone)]
pub struct WorkspaceStore {
    base: PathBuf,
}

impl WorkspaceStore {
    /// Create a store rooted at `base` (created lazily)
    #[inline]
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Base directory holding all workspaces
    #[inline]
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Create a brand-new workspace with a random id
    ///
    /// # Errors
    /// Filesystem errors while creating the layout
    pub fn create_workspace(&self) -> Result<WorkspaceId> {
        let id = WorkspaceId::generate();
        let root = self.ensure_workspace(&id)?;
        tracing::info!(workspace = %id, root = %root.display(), "created workspace");
        Ok(id)
    }

    /// Idempotently create the layout of workspace `id` and return its root
    ///
    /// The package marker is written only if absent; an existing marker is
    /// never overwritten.
    ///
    /// # Errors
    /// Filesystem errors while creating the layout
    pub fn ensure_workspace(&self, id: &WorkspaceId) -> Result<PathBuf> {
        let root = self.workspace_root(id)?;
        fs::create_dir_all(&root).map_err(at(&root))?;

        let games = self.games_root(id)?;
        fs::create_dir_all(&games).map_err(at(&games))?;

        let marker = resolve(&games, [PACKAGE_MARKER])?;
        if !marker.exists() {
            fs::write(&marker, PACKAGE_MARKER_CONTENT).map_err(at(&marker))?;
        }
        Ok(root)
    }

    /// Path of workspace `id` (no disk access)
    ///
    /// # Errors
    /// [`WorkspaceError::InvalidPath`] if the id would escape the base directory
    pub fn workspace_root(&self, id: &WorkspaceId) -> Result<PathBuf> {
        resolve(&self.base, [id])
    }

    /// Path of the games root of workspace `id` (no disk access)
    ///
    /// # Errors
    /// [`WorkspaceError::InvalidPath`] on sandbox escape
    pub fn games_root(&self, id: &WorkspaceId) -> Result<PathBuf> {
        resolve(&self.workspace_root(id)?, [GAMES_DIR])
    }

    /// Path of project `game` inside workspace `id` (no disk access)
    ///
    /// # Errors
    /// [`WorkspaceError::InvalidPath`] on sandbox escape
    pub fn game_root(&self, id: &WorkspaceId, game: &GameId) -> Result<PathBuf> {
        resolve(&self.games_root(id)?, [game])
    }

    /// Root of an existing workspace
    ///
    /// # Errors
    /// [`WorkspaceError::NotFound`] if the workspace directory is absent
    pub fn existing_workspace_root(&self, id: &WorkspaceId) -> Result<PathBuf> {
        let root = self.workspace_root(id)?;
        if root.is_dir() {
            Ok(root)
        } else {
            Err(WorkspaceError::NotFound(format!("workspace {id}")))
        }
    }

    /// Games root of an existing workspace
    ///
    /// # Errors
    /// [`WorkspaceError::NotFound`] if the games root is absent
    pub fn existing_games_root(&self, id: &WorkspaceId) -> Result<PathBuf> {
        let games = self.games_root(id)?;
        if games.is_dir() {
            Ok(games)
        } else {
            Err(WorkspaceError::NotFound(format!("workspace {id}")))
        }
    }

    /// Delete workspace `id` and everything in it
    ///
    /// # Errors
    /// [`WorkspaceError::NotFound`] if absent; filesystem errors while deleting
    pub fn remove_workspace(&self, id: &WorkspaceId) -> Result<()> {
        let root = self.existing_workspace_root(id)?;
        fs::remove_dir_all(&root).map_err(at(&root))?;
        tracing::info!(workspace = %id, "removed workspace");
        Ok(())
    }
}
