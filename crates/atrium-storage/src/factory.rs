use crate::{FileStore, LocalFileStore, StorageResult};
use atrium_core::Config;
use std::sync::Arc;

/// Create the file store described by configuration
pub async fn create_file_store(config: &Config) -> StorageResult<Arc<dyn FileStore>> {
    let store =
        LocalFileStore::new(config.public_root(), config.max_upload_size_bytes()).await?;

    tracing::info!(
        public_root = %store.public_root().display(),
        max_upload_size_bytes = config.max_upload_size_bytes(),
        "File store initialized"
    );

    Ok(Arc::new(store))
}
