//! Atrium Storage Library
//!
//! Scoped, sanitized file storage on the local filesystem.
//!
//! # Layout
//!
//! Files live under `{public_root}/{scope}/files/{entity_key}/{name}` and are
//! served at the public URL `/{scope}/files/{entity_key}/{name}`. Scopes are the
//! fixed set in [`FileScope`]; entity keys and names are always sanitized before
//! they reach the filesystem, and every resolved path is checked to stay inside
//! its scope root.
//!
//! # Concurrency
//!
//! No locks are taken. Collision handling on upload checks for an existing name
//! and then writes, so two simultaneous uploads of the same desired name can race
//! and one may overwrite the other. Directory pruning after delete is best-effort.

pub mod factory;
pub mod filename;
pub mod local;
pub mod paths;
pub mod traits;

// Re-export commonly used types
pub use atrium_core::FileScope;
pub use factory::create_file_store;
pub use filename::{sanitize_entity_key, sanitize_file_name};
pub use local::LocalFileStore;
pub use paths::{public_url, EntityKey};
pub use traits::{parse_scope, FileStore, StorageError, StorageResult};
