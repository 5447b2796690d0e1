//! Directory tree listing

use crate::error::{Result, WorkspaceError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// One node of a directory listing
///
/// `path` is relative to the listing root and always uses `/` separators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeEntry {
    /// Directory; its children follow it immediately in the listing
    Dir {
        /// Relative POSIX path
        path: String,
    },
    /// Regular file (or a symlink, which is never followed)
    File {
        /// Relative POSIX path
        path: String,
        /// Size in bytes
        size: u64,
    },
}

impl TreeEntry {
    /// Relative path of the entry
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Dir { path } | Self::File { path, .. } => path,
        }
    }

    /// Check if the entry is a directory
    #[inline]
    #[must_use]
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Dir { .. })
    }
}

/// Lazily list everything below `root`
///
/// Depth-first pre-order. Siblings are ordered files first, then
/// directories, each group by lowercased name. Every call starts a new
/// walk, so the listing can be restarted at will; it reflects the
/// directory contents at the time each directory is read.
#[must_use]
pub fn list_tree(root: &Path) -> TreeIter {
    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by(sibling_order)
        .into_iter();
    TreeIter {
        walker,
        base: root.to_path_buf(),
    }
}

fn sibling_order(a: &DirEntry, b: &DirEntry) -> Ordering {
    let key = |e: &DirEntry| (e.file_type().is_dir(), e.file_name().to_string_lossy().to_lowercase());
    key(a).cmp(&key(b))
}

/// Iterator returned by [`list_tree`]
pub struct TreeIter {
    walker: walkdir::IntoIter,
    base: PathBuf,
}

impl std::fmt::Debug for TreeIter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeIter").field("base", &self.base).finish_non_exhaustive()
    }
}

impl TreeIter {
    fn entry(&self, entry: &DirEntry) -> Result<TreeEntry> {
        let path = posix_relative(entry.path(), &self.base);
        if entry.file_type().is_dir() {
            return Ok(TreeEntry::Dir { path });
        }
        let size = entry
            .metadata()
            .map_err(|e| WorkspaceError::io(entry.path(), e.into()))?
            .len();
        Ok(TreeEntry::File { path, size })
    }
}

impl Iterator for TreeIter {
    type Item = Result<TreeEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.walker.next()?;
        Some(match next {
            Ok(entry) => self.entry(&entry),
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| self.base.clone());
                Err(WorkspaceError::io(path, err.into()))
            }
        })
    }
}

fn posix_relative(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn collect(root: &Path) -> Vec<TreeEntry> {
        list_tree(root).collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn files_before_directories_and_parent_before_children() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "hello").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b.txt"), "").unwrap();

        assert_eq!(
            collect(dir.path()),
            vec![
                TreeEntry::File { path: "a.txt".into(), size: 5 },
                TreeEntry::Dir { path: "sub".into() },
                TreeEntry::File { path: "sub/b.txt".into(), size: 0 },
            ]
        );
    }

    #[test]
    fn ordering_ignores_case_within_group() {
        let dir = TempDir::new().unwrap();
        for name in ["b.py", "A.py", "c.py"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        for name in ["Zeta", "alpha"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }

        let paths: Vec<String> = collect(dir.path()).iter().map(|e| e.path().to_owned()).collect();
        assert_eq!(paths, vec!["A.py", "b.py", "c.py", "alpha", "Zeta"]);
    }

    #[test]
    fn listing_is_restartable() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("one.txt"), "1").unwrap();

        assert_eq!(collect(dir.path()), collect(dir.path()));
        fs::write(dir.path().join("two.txt"), "2").unwrap();
        assert_eq!(collect(dir.path()).len(), 2);
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(TreeEntry::File { path: "a.txt".into(), size: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "file", "path": "a.txt", "size": 3}));
        let json = serde_json::to_value(TreeEntry::Dir { path: "sub".into() }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "dir", "path": "sub"}));
    }

    #[test]
    fn empty_root_lists_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(collect(dir.path()).is_empty());
    }
}
