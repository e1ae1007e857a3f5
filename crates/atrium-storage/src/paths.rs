//! Path containment for the file store.
//!
//! Resolution is lexical first (`.` and `..` are folded without touching the
//! filesystem), then checked against the root. When both the root and the target
//! already exist their canonical forms are compared too, so a symlink planted
//! inside a scope cannot point the store outside of it.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Component, Path, PathBuf};

use atrium_core::models::public_file_url;
use atrium_core::FileScope;

use crate::filename::sanitize_entity_key;
use crate::traits::{StorageError, StorageResult};

/// Sanitized identifier of the record that owns a folder of files.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey(String);

impl EntityKey {
    /// Validate and sanitize a raw entity key.
    ///
    /// Blank keys and keys carrying path separators or NUL are rejected outright;
    /// anything else is reduced to `[a-z0-9_-]{1,96}`.
    pub fn parse(raw: &str) -> StorageResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(StorageError::InvalidPath("Entity key is empty".to_string()));
        }
        if trimmed.contains(|c: char| c == '/' || c == '\\' || c == '\0') {
            return Err(StorageError::InvalidPath(format!(
                "Entity key contains path separators: {}",
                raw
            )));
        }
        Ok(EntityKey(sanitize_entity_key(trimmed)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EntityKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Public URL of a stored file: `/{scope}/files/{entity_key}/{name}`.
pub fn public_url(scope: FileScope, entity_key: &EntityKey, name: &str) -> String {
    public_file_url(scope, entity_key.as_str(), name)
}

/// Fold `.` and `..` components. Returns `None` if `..` climbs above the start.
pub fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                _ => return None,
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    Some(normalized)
}

/// Join `parts` onto `root` and require the result to be `root` or a descendant of it.
pub fn resolve_within(root: &Path, parts: &[&str]) -> StorageResult<PathBuf> {
    let escape = || StorageError::InvalidPath("Path resolves outside storage root".to_string());

    let root = normalize_lexically(root).ok_or_else(escape)?;
    let mut joined = root.clone();
    for part in parts {
        joined.push(part);
    }

    let resolved = normalize_lexically(&joined).ok_or_else(escape)?;
    if !resolved.starts_with(&root) {
        return Err(escape());
    }

    if let (Ok(canonical_root), Ok(canonical)) = (root.canonicalize(), resolved.canonicalize()) {
        if canonical.strip_prefix(&canonical_root).is_err() {
            return Err(escape());
        }
    }

    Ok(resolved)
}

/// Remove `dir` and its ancestors while they are empty, stopping before `root`.
///
/// Failures (non-empty directory, concurrent writer, already gone) end the walk
/// and are not reported.
pub async fn prune_empty_dirs(dir: &Path, root: &Path) {
    let mut current = dir.to_path_buf();
    while current != root && current.starts_with(root) {
        if let Err(e) = tokio::fs::remove_dir(&current).await {
            tracing::debug!(
                path = %current.display(),
                error = %e,
                "Stopped pruning directories"
            );
            break;
        }
        tracing::debug!(path = %current.display(), "Pruned empty directory");
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }
}
