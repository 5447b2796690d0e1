//! Identifier types
//!
//! Both ids end up as directory names, so both are restricted to a single
//! ordinary path component.

use crate::error::Result;
use crate::sandbox::single_component;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

/// Unique workspace identifier (128 random bits, rendered as lowercase hex)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Generate a fresh random id
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Accept a caller-supplied id
    ///
    /// # Errors
    /// [`crate::WorkspaceError::InvalidPath`] unless `raw` is a single path component
    pub fn parse(raw: &str) -> Result<Self> {
        single_component(raw, "workspace id")?;
        Ok(Self(raw.to_owned()))
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for WorkspaceId {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

/// Caller-chosen project ("game") identifier, unique within a workspace
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    /// Accept a caller-supplied id
    ///
    /// # Errors
    /// [`crate::WorkspaceError::InvalidPath`] unless `raw` is a single path component
    pub fn parse(raw: &str) -> Result<Self> {
        single_component(raw, "game id")?;
        Ok(Self(raw.to_owned()))
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for GameId {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_32_hex_chars_and_distinct() {
        let a = WorkspaceId::generate();
        let b = WorkspaceId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn parse_rejects_traversal() {
        assert!(WorkspaceId::parse("..").is_err());
        assert!(GameId::parse("../other").is_err());
        assert!(GameId::parse("").is_err());
        assert_eq!(GameId::parse("foo").unwrap().as_str(), "foo");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = GameId::parse("lines").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"lines\"");
    }
}
