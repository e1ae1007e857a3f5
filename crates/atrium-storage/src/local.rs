use crate::filename::{
    base_name, extension_of, is_blocked_extension, is_managed_name, numbered_name,
    sanitize_file_name, split_extension, upload_name,
};
use crate::paths::{normalize_lexically, prune_empty_dirs, resolve_within, EntityKey};
use crate::traits::{FileStore, StorageError, StorageResult};
use async_trait::async_trait;
use atrium_core::models::{public_file_url, ManagedFile, UploadedFile};
use atrium_core::FileScope;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Upper bound on `-2`, `-3`, … suffixes tried before giving up on a name.
const MAX_COLLISION_ATTEMPTS: u32 = 10_000;

/// Local filesystem file store
#[derive(Clone)]
pub struct LocalFileStore {
    public_root: PathBuf,
    max_upload_size_bytes: u64,
}

impl LocalFileStore {
    /// Create a new LocalFileStore instance
    ///
    /// # Arguments
    /// * `public_root` - Public static root (e.g., "/var/www/site/public")
    /// * `max_upload_size_bytes` - Largest accepted upload
    pub async fn new(
        public_root: impl Into<PathBuf>,
        max_upload_size_bytes: u64,
    ) -> StorageResult<Self> {
        let public_root = public_root.into();
        let public_root = normalize_lexically(&public_root).ok_or_else(|| {
            StorageError::ConfigError(format!(
                "Invalid public root: {}",
                public_root.display()
            ))
        })?;

        fs::create_dir_all(&public_root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create public root {}: {}",
                public_root.display(),
                e
            ))
        })?;

        Ok(LocalFileStore {
            public_root,
            max_upload_size_bytes,
        })
    }

    /// Root directory of a scope: `{public_root}/{scope}/files`
    pub fn scope_root(&self, scope: FileScope) -> PathBuf {
        self.public_root.join(scope.as_str()).join("files")
    }

    fn entity_dir(&self, scope: FileScope, entity_key: &EntityKey) -> StorageResult<PathBuf> {
        resolve_within(&self.scope_root(scope), &[entity_key.as_str()])
    }

    /// Resolve an existing stored name. Anything the sanitizer would alter is rejected.
    fn file_path(
        &self,
        scope: FileScope,
        entity_key: &EntityKey,
        name: &str,
    ) -> StorageResult<PathBuf> {
        if !is_managed_name(name) {
            return Err(StorageError::InvalidPath(format!(
                "Not a managed file name: {}",
                name
            )));
        }
        resolve_within(&self.scope_root(scope), &[entity_key.as_str(), name])
    }

    fn managed_file(
        scope: FileScope,
        entity_key: &EntityKey,
        name: &str,
        metadata: &std::fs::Metadata,
    ) -> ManagedFile {
        let updated_at = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        ManagedFile {
            name: name.to_string(),
            url: public_file_url(scope, entity_key.as_str(), name),
            size: metadata.len(),
            updated_at,
        }
    }

    /// First free name for `desired` inside `dir`: the name itself, then `-2`, `-3`, …
    ///
    /// `current` is the name of the file being renamed, which never collides with itself.
    async fn available_name(
        dir: &Path,
        desired: &str,
        current: Option<&str>,
    ) -> StorageResult<String> {
        for n in 1..=MAX_COLLISION_ATTEMPTS {
            let candidate = if n == 1 {
                desired.to_string()
            } else {
                numbered_name(desired, n)
            };
            if n > 1 && !is_managed_name(&candidate) {
                continue;
            }
            if current == Some(candidate.as_str()) {
                return Ok(candidate);
            }
            if !Self::name_taken(&dir.join(&candidate)).await? {
                return Ok(candidate);
            }
        }

        Err(StorageError::IoError(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("No free name left for {}", desired),
        )))
    }

    /// Any directory entry counts, including a dangling symlink that `try_exists` would miss.
    async fn name_taken(path: &Path) -> StorageResult<bool> {
        match fs::symlink_metadata(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn ensure_allowed_extension(name: &str) -> StorageResult<()> {
        match extension_of(name) {
            Some(extension) if is_blocked_extension(&extension) => {
                tracing::warn!(name = %name, extension = %extension, "Rejected blocked file extension");
                Err(StorageError::BlockedExtension(extension))
            }
            _ => Ok(()),
        }
    }

    fn not_found_or_io(e: std::io::Error, name: &str) -> StorageError {
        if e.kind() == ErrorKind::NotFound {
            StorageError::NotFound(name.to_string())
        } else {
            StorageError::IoError(e)
        }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    #[tracing::instrument(skip(self), fields(scope = %scope, entity_key = %entity_key))]
    async fn list_files(
        &self,
        scope: FileScope,
        entity_key: &EntityKey,
    ) -> StorageResult<Vec<ManagedFile>> {
        let dir = self.entity_dir(scope, entity_key)?;

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                tracing::debug!(path = %entry.path().display(), "Skipping non UTF-8 file name");
                continue;
            };
            if !is_managed_name(name) {
                tracing::debug!(name = %name, "Skipping file not written by the store");
                continue;
            }
            let metadata = entry.metadata().await?;
            files.push(Self::managed_file(scope, entity_key, name, &metadata));
        }

        files.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(files)
    }

    #[tracing::instrument(
        skip(self, file),
        fields(scope = %scope, entity_key = %entity_key, original_name = %file.name, size_bytes = file.size())
    )]
    async fn upload_file(
        &self,
        scope: FileScope,
        entity_key: &EntityKey,
        file: UploadedFile,
    ) -> StorageResult<ManagedFile> {
        let size = file.size();
        if size == 0 {
            return Err(StorageError::EmptyFile);
        }
        if size > self.max_upload_size_bytes {
            return Err(StorageError::FileTooLarge {
                size,
                max: self.max_upload_size_bytes,
            });
        }

        let desired = upload_name(&file.name, &file.content_type);
        Self::ensure_allowed_extension(&desired)?;

        let dir = self.entity_dir(scope, entity_key)?;
        fs::create_dir_all(&dir).await?;

        let name = Self::available_name(&dir, &desired, None).await?;
        let path = resolve_within(&self.scope_root(scope), &[entity_key.as_str(), &name])?;

        let start = std::time::Instant::now();

        let mut out = fs::File::create(&path).await?;
        out.write_all(&file.bytes).await?;
        out.sync_all().await?;

        let metadata = fs::metadata(&path).await?;
        let managed = Self::managed_file(scope, entity_key, &name, &metadata);

        tracing::info!(
            path = %path.display(),
            name = %name,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File upload stored"
        );

        Ok(managed)
    }

    #[tracing::instrument(skip(self), fields(scope = %scope, entity_key = %entity_key))]
    async fn read_file(
        &self,
        scope: FileScope,
        entity_key: &EntityKey,
        name: &str,
    ) -> StorageResult<Vec<u8>> {
        let path = self.file_path(scope, entity_key, name)?;
        fs::read(&path)
            .await
            .map_err(|e| Self::not_found_or_io(e, name))
    }

    #[tracing::instrument(skip(self), fields(scope = %scope, entity_key = %entity_key))]
    async fn delete_file(
        &self,
        scope: FileScope,
        entity_key: &EntityKey,
        name: &str,
    ) -> StorageResult<()> {
        let path = self.file_path(scope, entity_key, name)?;
        let start = std::time::Instant::now();

        fs::remove_file(&path)
            .await
            .map_err(|e| Self::not_found_or_io(e, name))?;

        let root = self.scope_root(scope);
        if let Some(dir) = path.parent() {
            prune_empty_dirs(dir, &root).await;
        }

        tracing::info!(
            path = %path.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File deleted"
        );

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_file_by_url(&self, url: &str) -> StorageResult<()> {
        let invalid = |reason: &str| StorageError::InvalidPath(format!("{}: {}", reason, url));

        let path_part = url
            .split(|c: char| c == '?' || c == '#')
            .next()
            .unwrap_or("");
        if !path_part.starts_with('/') || path_part.starts_with("//") {
            return Err(invalid("Only root-relative URLs can be deleted"));
        }

        let decoded = urlencoding::decode(path_part)
            .map_err(|_| invalid("URL is not valid UTF-8"))?;
        if decoded.contains(|c: char| c == '\\' || c == '\0') {
            return Err(invalid("URL contains forbidden characters"));
        }

        let mut segments = decoded.trim_start_matches('/').split('/');
        let scope = segments
            .next()
            .and_then(|first| first.parse::<FileScope>().ok())
            .ok_or_else(|| invalid("URL is outside the managed public roots"))?;
        let rest: Vec<&str> = segments.collect();
        if rest.is_empty() || rest.iter().all(|s| s.is_empty()) {
            return Err(invalid("URL does not name a file"));
        }

        let legacy_root = self.public_root.join(scope.as_str());
        let path = resolve_within(&legacy_root, &rest)?;
        if path == legacy_root {
            return Err(invalid("URL does not name a file"));
        }

        let start = std::time::Instant::now();

        match fs::symlink_metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Err(invalid("URL does not name a regular file")),
            Err(e) => return Err(Self::not_found_or_io(e, url)),
        }

        fs::remove_file(&path)
            .await
            .map_err(|e| Self::not_found_or_io(e, url))?;

        let scope_root = self.scope_root(scope);
        let prune_limit = if path.starts_with(&scope_root) {
            &scope_root
        } else {
            &legacy_root
        };
        if let Some(dir) = path.parent() {
            prune_empty_dirs(dir, prune_limit).await;
        }

        tracing::info!(
            path = %path.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Legacy file deleted by URL"
        );

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(scope = %scope, entity_key = %entity_key))]
    async fn rename_file(
        &self,
        scope: FileScope,
        entity_key: &EntityKey,
        old_name: &str,
        new_name: &str,
    ) -> StorageResult<ManagedFile> {
        let old_path = self.file_path(scope, entity_key, old_name)?;

        let requested = base_name(new_name.trim()).trim();
        if requested.is_empty() {
            return Err(StorageError::InvalidPath("New file name is empty".to_string()));
        }

        let (_, requested_extension) = split_extension(requested);
        let desired = match (requested_extension.is_empty(), extension_of(old_name)) {
            (true, Some(extension)) => sanitize_file_name(&format!("{}.{}", requested, extension)),
            _ => sanitize_file_name(requested),
        };
        Self::ensure_allowed_extension(&desired)?;

        let metadata = match fs::metadata(&old_path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(StorageError::NotFound(old_name.to_string())),
            Err(e) => return Err(Self::not_found_or_io(e, old_name)),
        };

        if desired == old_name {
            return Ok(Self::managed_file(scope, entity_key, old_name, &metadata));
        }

        let dir = self.entity_dir(scope, entity_key)?;
        let name = Self::available_name(&dir, &desired, Some(old_name)).await?;
        if name == old_name {
            return Ok(Self::managed_file(scope, entity_key, old_name, &metadata));
        }

        let new_path = resolve_within(&self.scope_root(scope), &[entity_key.as_str(), &name])?;
        let start = std::time::Instant::now();
        fs::rename(&old_path, &new_path)
            .await
            .map_err(|e| Self::not_found_or_io(e, old_name))?;

        let metadata = fs::metadata(&new_path).await?;

        tracing::info!(
            from = %old_name,
            to = %name,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File renamed"
        );

        Ok(Self::managed_file(scope, entity_key, &name, &metadata))
    }

    #[tracing::instrument(skip(self), fields(scope = %scope, entity_key = %entity_key))]
    async fn remove_entity(
        &self,
        scope: FileScope,
        entity_key: &EntityKey,
    ) -> StorageResult<usize> {
        let dir = self.entity_dir(scope, entity_key)?;

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            match file_name.to_str() {
                Some(name) if is_managed_name(name) => {}
                _ => continue,
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        prune_empty_dirs(&dir, &self.scope_root(scope)).await;

        tracing::info!(removed, "Entity files removed");

        Ok(removed)
    }

    fn public_root(&self) -> &Path {
        &self.public_root
    }
}
