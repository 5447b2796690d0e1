//! Path sandboxing
//!
//! [`resolve`] joins caller-supplied segments onto a root and accepts the
//! result only if, after canonicalization, it is the root itself or lies
//! strictly below it. The check runs on canonical paths, never on raw
//! strings, so `..` traversal and symlinks pointing outside the root are
//! both rejected.

use crate::error::{Result, WorkspaceError};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolve `segments` under `root`, rejecting anything that escapes it
///
/// Segments are joined in order with [`Path::push`] semantics, so an
/// absolute segment replaces everything before it (and is then rejected
/// unless it happens to point inside `root`).
///
/// # Errors
/// - [`WorkspaceError::InvalidPath`] if the canonical result is outside `root`
/// - [`WorkspaceError::Io`] if the working directory cannot be read while
///   absolutizing a relative root
pub fn resolve<I, S>(root: &Path, segments: I) -> Result<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: AsRef<Path>,
{
    let mut joined = root.to_path_buf();
    for segment in segments {
        joined.push(segment.as_ref());
    }

    let canonical_root = canonicalize_lenient(root).map_err(|e| WorkspaceError::io(root, e))?;
    let candidate = canonicalize_lenient(&joined).map_err(|e| WorkspaceError::io(&joined, e))?;

    if candidate == canonical_root || candidate.starts_with(&canonical_root) {
        Ok(candidate)
    } else {
        Err(WorkspaceError::InvalidPath(joined.display().to_string()))
    }
}

/// Symlink hops followed before giving up (matches the usual `ELOOP` limit)
const MAX_LINK_HOPS: usize = 40;

enum Part {
    Root(OsString),
    Parent,
    Name(OsString),
}

fn parts(path: &Path) -> impl Iterator<Item = Part> + '_ {
    path.components().filter_map(|c| match c {
        Component::Prefix(_) | Component::RootDir => Some(Part::Root(c.as_os_str().to_owned())),
        Component::CurDir => None,
        Component::ParentDir => Some(Part::Parent),
        Component::Normal(name) => Some(Part::Name(name.to_owned())),
    })
}

/// Canonicalize a path that may not exist yet
///
/// Components are applied left to right. While the accumulated path exists
/// on disk it is canonicalized through the filesystem (resolving symlinks).
/// A symlink whose target is missing is still followed: its target is
/// spliced in front of the remaining components. Once a component is truly
/// missing the rest is applied lexically, with `..` popping the last
/// component and `.` ignored. Popping back into existing territory resumes
/// filesystem resolution.
///
/// # Errors
/// The working directory cannot be read, a link cannot be read, or more
/// than 40 links are chained
pub fn canonicalize_lenient(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut pending: VecDeque<Part> = parts(&absolute).collect();
    let mut resolved = PathBuf::new();
    let mut on_disk = true;
    let mut hops = 0;

    while let Some(part) = pending.pop_front() {
        match part {
            Part::Root(root) => resolved.push(root),
            Part::Parent => {
                resolved.pop();
                if !on_disk {
                    on_disk = resolved.exists();
                }
            }
            Part::Name(name) => {
                resolved.push(name);
                if !on_disk {
                    continue;
                }
                if let Ok(real) = fs::canonicalize(&resolved) {
                    resolved = real;
                    continue;
                }
                match fs::symlink_metadata(&resolved) {
                    Ok(meta) if meta.file_type().is_symlink() => {
                        hops += 1;
                        if hops > MAX_LINK_HOPS {
                            return Err(io::Error::other(format!(
                                "too many levels of symbolic links at {}",
                                resolved.display()
                            )));
                        }
                        let target = fs::read_link(&resolved)?;
                        resolved.pop();
                        let spliced: Vec<Part> = parts(&target).collect();
                        for part in spliced.into_iter().rev() {
                            pending.push_front(part);
                        }
                    }
                    _ => on_disk = false,
                }
            }
        }
    }

    Ok(resolved)
}

/// Check that `raw` names exactly one ordinary path component
///
/// Used for workspace and project ids, which become directory names.
pub(crate) fn single_component(raw: &str, what: &str) -> Result<()> {
    let mut components = Path::new(raw).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == raw => Ok(()),
        _ => Err(WorkspaceError::InvalidPath(format!("{what} {raw:?}"))),
    }
}
