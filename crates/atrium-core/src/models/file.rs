use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::scope::FileScope;

/// One uploaded file inside a scope/entity folder.
///
/// Identity is the `(scope, entity_key, name)` triple; `url` is derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedFile {
    pub name: String,
    pub url: String,
    pub size: u64,
    pub updated_at: DateTime<Utc>,
}

/// An incoming upload as received from the request layer.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original client-side name, possibly empty or containing path components
    pub name: String,
    /// MIME type reported by the client
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Public URL of a managed file: `/{scope}/files/{entity_key}/{name}`.
///
/// Front-end consumers depend on this exact shape.
pub fn public_file_url(scope: FileScope, entity_key: &str, name: &str) -> String {
    format!("/{}/files/{}/{}", scope, entity_key, name)
}
