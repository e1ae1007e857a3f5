//! Site content repository: keyed JSON blobs in the site_content table.

use async_trait::async_trait;
use atrium_core::AppError;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgPool, Postgres};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One stored blob and the time it was last written.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteContentEntry {
    pub items: Value,
    pub updated_at: DateTime<Utc>,
}

/// Keyed get/upsert of opaque JSON by a fixed string slug
#[async_trait]
pub trait SiteContentStore: Send + Sync {
    async fn get(&self, slug: &str) -> Result<Option<SiteContentEntry>, AppError>;

    /// Insert or replace the blob stored under `slug`.
    async fn upsert(&self, slug: &str, name: &str, items: Value) -> Result<(), AppError>;
}

/// Row type for site_content table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
struct SiteContentRow {
    items: Value,
    updated_at: DateTime<Utc>,
}

impl SiteContentRow {
    fn into_entry(self) -> SiteContentEntry {
        SiteContentEntry {
            items: self.items,
            updated_at: self.updated_at,
        }
    }
}

/// Repository for site_content table.
#[derive(Clone)]
pub struct PostgresSiteContentRepository {
    pool: PgPool,
}

impl PostgresSiteContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SiteContentStore for PostgresSiteContentRepository {
    #[tracing::instrument(skip(self), fields(db.table = "site_content", db.operation = "select"))]
    async fn get(&self, slug: &str) -> Result<Option<SiteContentEntry>, AppError> {
        let row: Option<SiteContentRow> = sqlx::query_as::<Postgres, SiteContentRow>(
            "SELECT items, updated_at FROM site_content WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(SiteContentRow::into_entry))
    }

    #[tracing::instrument(skip(self, items), fields(db.table = "site_content", db.operation = "upsert"))]
    async fn upsert(&self, slug: &str, name: &str, items: Value) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO site_content (slug, name, items, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (slug) DO UPDATE
            SET name = EXCLUDED.name,
                items = EXCLUDED.items,
                updated_at = NOW()
            "#,
        )
        .bind(slug)
        .bind(name)
        .bind(&items)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Process-local store, for tests and single-process use without Postgres
#[derive(Clone, Default)]
pub struct InMemorySiteContentStore {
    entries: Arc<RwLock<HashMap<String, SiteContentEntry>>>,
}

impl InMemorySiteContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob with an explicit timestamp.
    pub async fn insert_entry(&self, slug: &str, entry: SiteContentEntry) {
        self.entries.write().await.insert(slug.to_string(), entry);
    }
}

#[async_trait]
impl SiteContentStore for InMemorySiteContentStore {
    async fn get(&self, slug: &str) -> Result<Option<SiteContentEntry>, AppError> {
        Ok(self.entries.read().await.get(slug).cloned())
    }

    async fn upsert(&self, slug: &str, _name: &str, items: Value) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;
        // Timestamps only move forward, even when two writes share a clock tick.
        let now = Utc::now();
        let updated_at = match entries.get(slug) {
            Some(existing) if existing.updated_at >= now => {
                existing.updated_at + chrono::Duration::microseconds(1)
            }
            _ => now,
        };
        entries.insert(slug.to_string(), SiteContentEntry { items, updated_at });
        Ok(())
    }
}

/// Pick the site content store: Postgres when a pool is available, otherwise in-memory.
pub fn create_site_content_store(pool: Option<PgPool>) -> Arc<dyn SiteContentStore> {
    match pool {
        Some(pool) => {
            tracing::info!("Initializing PostgreSQL site content repository");
            Arc::new(PostgresSiteContentRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, site content is kept in memory only");
            Arc::new(InMemorySiteContentStore::new())
        }
    }
}
