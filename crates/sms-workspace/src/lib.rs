//! Sandboxed game workspaces
//!
//! Everything the service does on disk goes through this crate:
//!
//! - [`resolve`]: confine a relative path to a root directory
//! - [`WorkspaceStore`]: create, locate and remove workspaces
//! - [`list_tree`], [`read_file`], [`write_file`]: browse and edit files
//! - [`TemplateMaterializer`]: seed a game project from the template
//!
//! # Example
//!
//! ```rust,ignore
//! use sms_workspace::{GameId, TemplateMaterializer, WorkspaceStore};
//!
//! let store = WorkspaceStore::new("/var/lib/stake-math/workspaces");
//! let ws = store.create_workspace()?;
//! let game = GameId::parse("lines")?;
//! let root = TemplateMaterializer::new("/opt/math-sdk/games/template")
//!     .materialize(&store, &ws, &game, false)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod files;
mod sandbox;
mod store;
mod template;
mod tree;
mod types;

pub use error::{Result, WorkspaceError};
pub use files::{locate_file, read_file, write_file};
pub use sandbox::{canonicalize_lenient, resolve};
pub use store::{WorkspaceStore, GAMES_DIR, PACKAGE_MARKER, PACKAGE_MARKER_CONTENT};
pub use template::{
    TemplateMaterializer, CONFIG_SOURCE, PLACEHOLDER_REELS, PLACEHOLDER_REEL_ROW, REELS_DIR,
};
pub use tree::{list_tree, TreeEntry, TreeIter};
pub use types::{GameId, WorkspaceId};
