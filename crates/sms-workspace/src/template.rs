//! Template materialization
//!
//! Seeds a new game project from the template tree. Besides the plain copy
//! it adds placeholder reel strips the template configuration expects and
//! patches the game id into `game_config.py` when the template still carries
//! the empty default.

use crate::error::{at, Result, WorkspaceError};
use crate::sandbox::resolve;
use crate::store::WorkspaceStore;
use crate::types::{GameId, WorkspaceId};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory holding reel strip CSVs inside a project
pub const REELS_DIR: &str = "reels";

/// Reel files seeded when the template does not ship them
pub const PLACEHOLDER_REELS: [&str; 2] = ["BR0.csv", "FR0.csv"];

/// One row of five identical placeholder symbols
pub const PLACEHOLDER_REEL_ROW: &str = "A,A,A,A,A\n";

/// Configuration source file of a project
pub const CONFIG_SOURCE: &str = "game_config.py";

const GAME_ID_MARKER: &str = r#"self.game_id = """#;

/// Copies the template project into workspaces
#[derive(Debug, Clone)]
pub struct TemplateMaterializer {
    template_dir: PathBuf,
}

impl TemplateMaterializer {
    /// Create a materializer reading from `template_dir`
    #[inline]
    #[must_use]
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
        }
    }

    /// Template directory
    #[inline]
    #[must_use]
    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Materialize project `game` in `workspace`, returning its directory
    ///
    /// The workspace layout is created if needed. With `overwrite`, an
    /// existing project directory is deleted wholesale before copying.
    ///
    /// # Errors
    /// - [`WorkspaceError::NotFound`] if the template directory is missing
    /// - [`WorkspaceError::AlreadyExists`] if the project exists and `overwrite` is false
    /// - [`WorkspaceError::Io`] for filesystem failures, unwrapped
    pub fn materialize(
        &self,
        store: &WorkspaceStore,
        workspace: &WorkspaceId,
        game: &GameId,
        overwrite: bool,
    ) -> Result<PathBuf> {
        store.ensure_workspace(workspace)?;

        if !self.template_dir.is_dir() {
            return Err(WorkspaceError::NotFound(format!(
                "template folder {}",
                self.template_dir.display()
            )));
        }

        let dest = store.game_root(workspace, game)?;
        if dest.exists() {
            if !overwrite {
                return Err(WorkspaceError::AlreadyExists(format!("game {game}")));
            }
            fs::remove_dir_all(&dest).map_err(at(&dest))?;
            tracing::info!(workspace = %workspace, game = %game, "removed existing game for overwrite");
        }

        let copied = copy_tree(&self.template_dir, &dest)?;
        seed_reels(&dest)?;
        let patched = patch_game_id(&dest, game)?;

        tracing::info!(
            workspace = %workspace,
            game = %game,
            files = copied,
            patched_game_id = patched,
            "materialized game from template"
        );
        Ok(dest)
    }
}

/// Recursively copy `src` into `dest` byte for byte, returning the file count
fn copy_tree(src: &Path, dest: &Path) -> Result<usize> {
    fs::create_dir_all(dest).map_err(at(dest))?;
    let mut files = 0;

    for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().map_or_else(|| src.to_path_buf(), Path::to_path_buf);
            WorkspaceError::io(path, e.into())
        })?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = resolve(dest, [rel])?;

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(at(&target))?;
        } else {
            fs::copy(entry.path(), &target).map_err(at(entry.path()))?;
            files += 1;
        }
    }
    Ok(files)
}

/// Write placeholder reel strips the template config would otherwise miss
fn seed_reels(dest: &Path) -> Result<()> {
    let reels = resolve(dest, [REELS_DIR])?;
    fs::create_dir_all(&reels).map_err(at(&reels))?;

    for name in PLACEHOLDER_REELS {
        let file = resolve(&reels, [name])?;
        if !file.exists() {
            fs::write(&file, PLACEHOLDER_REEL_ROW).map_err(at(&file))?;
        }
    }
    Ok(())
}

/// Replace the first empty `self.game_id` assignment with the real id
///
/// Best effort: a missing config file or missing marker is a silent no-op.
fn patch_game_id(dest: &Path, game: &GameId) -> Result<bool> {
    let config = resolve(dest, [CONFIG_SOURCE])?;
    if !config.is_file() {
        tracing::debug!(game = %game, "no {CONFIG_SOURCE} in template, skipping game id patch");
        return Ok(false);
    }

    let text = fs::read_to_string(&config).map_err(at(&config))?;
    if !text.contains(GAME_ID_MARKER) {
        tracing::debug!(game = %game, "game id marker not found, skipping patch");
        return Ok(false);
    }

    let patched = text.replacen(GAME_ID_MARKER, &format!(r#"self.game_id = "{game}""#), 1);
    fs::write(&config, patched).map_err(at(&config))?;
    Ok(true)
}
