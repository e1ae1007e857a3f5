//! File store abstraction trait
//!
//! This module defines the FileStore trait and the errors its operations report.

use async_trait::async_trait;
use atrium_core::models::{ManagedFile, UploadedFile};
use atrium_core::{AppError, FileScope};
use std::path::Path;
use thiserror::Error;

use crate::paths::EntityKey;

/// File store operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Empty file")]
    EmptyFile,

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Files with extension .{0} are not allowed")]
    BlockedExtension(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for file store operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidScope(_) | StorageError::EmptyFile => {
                AppError::InvalidInput(err.to_string())
            }
            StorageError::FileTooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            StorageError::InvalidPath(_) | StorageError::BlockedExtension(_) => {
                AppError::SafetyRejection(err.to_string())
            }
            StorageError::NotFound(name) => AppError::NotFound(format!("File not found: {}", name)),
            StorageError::IoError(e) => AppError::Internal(format!("IO error: {}", e)),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
        }
    }
}

/// Parse a scope coming from a request, rejecting anything outside the fixed set.
pub fn parse_scope(raw: &str) -> StorageResult<FileScope> {
    raw.parse::<FileScope>()
        .map_err(|_| StorageError::InvalidScope(raw.to_string()))
}

/// Managed file store
///
/// Scope and entity key arrive already validated (`FileScope`, `EntityKey`), so a
/// malformed namespace is rejected before any filesystem access. File names are
/// checked by each operation: stored names must be exact sanitizer output.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// List regular files of one entity, newest first. A missing folder is an empty list.
    async fn list_files(
        &self,
        scope: FileScope,
        entity_key: &EntityKey,
    ) -> StorageResult<Vec<ManagedFile>>;

    /// Store an upload under a sanitized, collision-free name.
    async fn upload_file(
        &self,
        scope: FileScope,
        entity_key: &EntityKey,
        file: UploadedFile,
    ) -> StorageResult<ManagedFile>;

    /// Read the bytes of one managed file.
    async fn read_file(
        &self,
        scope: FileScope,
        entity_key: &EntityKey,
        name: &str,
    ) -> StorageResult<Vec<u8>>;

    /// Delete one file by its exact stored name, then prune empty folders.
    async fn delete_file(
        &self,
        scope: FileScope,
        entity_key: &EntityKey,
        name: &str,
    ) -> StorageResult<()>;

    /// Delete a file referenced by a public URL from records that predate scoped storage.
    ///
    /// Only URLs under `/articles/` and `/pages/` are accepted.
    async fn delete_file_by_url(&self, url: &str) -> StorageResult<()>;

    /// Rename a file, keeping its extension when the new name has none.
    async fn rename_file(
        &self,
        scope: FileScope,
        entity_key: &EntityKey,
        old_name: &str,
        new_name: &str,
    ) -> StorageResult<ManagedFile>;

    /// Delete every managed file of an entity and prune its folder.
    ///
    /// Returns the number of files removed.
    async fn remove_entity(&self, scope: FileScope, entity_key: &EntityKey)
        -> StorageResult<usize>;

    /// Public static root all scopes live under
    fn public_root(&self) -> &Path;
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_core::ErrorMetadata;

    #[test]
    fn parse_scope_rejects_unknown_values() {
        assert_eq!(parse_scope("pages").unwrap(), FileScope::Pages);
        assert!(matches!(
            parse_scope("uploads"),
            Err(StorageError::InvalidScope(s)) if s == "uploads"
        ));
    }

    #[test]
    fn storage_errors_map_onto_taxonomy() {
        let err = AppError::from(StorageError::BlockedExtension("exe".to_string()));
        assert_eq!(err.error_code(), "SAFETY_REJECTION");
        assert!(err.client_message().contains(".exe"));

        let err = AppError::from(StorageError::FileTooLarge { size: 10, max: 5 });
        assert_eq!(err.http_status_code(), 413);

        let err = AppError::from(StorageError::NotFound("a.txt".to_string()));
        assert!(err.is_not_found());

        let err = AppError::from(StorageError::EmptyFile);
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }
}
