//! Atrium Core Library
//!
//! This crate provides the error taxonomy, configuration and domain models
//! shared by the managed file store, the visual page store and their callers.

pub mod config;
pub mod error;
pub mod models;
pub mod scope;

// Re-export commonly used types
pub use config::{BaseConfig, Config, ContentConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use scope::FileScope;
// Note: FileStore, StorageError, StorageResult live in the atrium-storage crate
