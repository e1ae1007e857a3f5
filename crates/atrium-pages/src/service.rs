//! Visual page service: read, publish, save and roll back pages.

use std::sync::Arc;

use atrium_core::models::{
    PublishedVisualPage, VisualPageData, VisualPageInput, VisualPageKey, VisualPageRecord,
};
use atrium_core::AppError;
use atrium_db::{SiteContentEntry, SiteContentStore};
use chrono::{DateTime, Utc};

use crate::css::{normalize_css, normalize_style_hrefs};
use crate::html::{has_markup, normalize_visual_html};
use crate::templates::{
    default_template, is_default_css, is_default_html, references_marker_classes,
};

/// A stored record with the time it was last written.
struct StoredPage {
    record: VisualPageRecord,
    updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct VisualPageService {
    store: Arc<dyn SiteContentStore>,
}

impl VisualPageService {
    pub fn new(store: Arc<dyn SiteContentStore>) -> Self {
        Self { store }
    }

    /// Load and decode the record for `key`. Malformed blobs read as absent.
    async fn load(&self, key: VisualPageKey) -> Result<Option<StoredPage>, AppError> {
        let Some(entry) = self.store.get(key.storage_slug()).await? else {
            return Ok(None);
        };
        Ok(decode(key, entry))
    }

    /// Editor view of a page, falling back to the default template.
    #[tracing::instrument(skip(self), fields(page = %key))]
    pub async fn get_visual_page(&self, key: VisualPageKey) -> Result<VisualPageData, AppError> {
        let stored = self.load(key).await?;

        let previous = stored
            .as_ref()
            .and_then(|page| page.record.previous_version.as_ref());
        let has_previous_version = previous.is_some();
        let previous_saved_at = previous.map(|snapshot| snapshot.saved_at);
        let updated_at = stored.as_ref().map(|page| page.updated_at);

        let current = stored.as_ref().and_then(|page| {
            let html = normalize_visual_html(&page.record.html);
            (!html.is_empty()).then_some((html, &page.record))
        });

        let data = match current {
            Some((html, record)) => {
                let css = normalize_css(&record.css);
                let is_default = is_default_html(key, &html) && is_default_css(key, &css);
                VisualPageData {
                    key,
                    html,
                    css,
                    style_hrefs: normalize_style_hrefs(&record.style_hrefs),
                    is_published: record.is_published,
                    is_default,
                    has_previous_version,
                    previous_saved_at,
                    updated_at,
                }
            }
            None => {
                let template = default_template(key);
                VisualPageData {
                    key,
                    html: template.html.to_string(),
                    css: template.css.to_string(),
                    style_hrefs: Vec::new(),
                    is_published: false,
                    is_default: true,
                    has_previous_version,
                    previous_saved_at,
                    updated_at,
                }
            }
        };

        Ok(data)
    }

    /// Renderable payload, only for a published page with non-empty html.
    #[tracing::instrument(skip(self), fields(page = %key))]
    pub async fn get_published_visual_page(
        &self,
        key: VisualPageKey,
    ) -> Result<Option<PublishedVisualPage>, AppError> {
        let Some(StoredPage { record, .. }) = self.load(key).await? else {
            return Ok(None);
        };
        if !record.is_published {
            return Ok(None);
        }

        let html = normalize_visual_html(&record.html);
        if html.is_empty() {
            return Ok(None);
        }

        let mut css = normalize_css(&record.css);
        if is_default_css(key, &css) && !references_marker_classes(key, &html) {
            css.clear();
        }

        Ok(Some(PublishedVisualPage {
            html,
            css,
            style_hrefs: normalize_style_hrefs(&record.style_hrefs),
        }))
    }

    /// Save new content, rotating the current record into the previous slot.
    #[tracing::instrument(skip(self, input), fields(page = %key, is_published = input.is_published))]
    pub async fn upsert_visual_page(
        &self,
        key: VisualPageKey,
        input: VisualPageInput,
    ) -> Result<(), AppError> {
        let html = normalize_visual_html(&input.html);
        let html = if has_markup(&html) { html } else { String::new() };

        let previous_version = self
            .load(key)
            .await?
            .map(|page| page.record.to_snapshot(page.updated_at));
        let rotated = previous_version.is_some();

        let record = VisualPageRecord {
            html,
            css: normalize_css(&input.css),
            style_hrefs: normalize_style_hrefs(&input.style_hrefs),
            is_published: input.is_published,
            previous_version,
        };

        self.write(key, &record).await?;

        tracing::info!(
            page = %key,
            html_len = record.html.len(),
            css_len = record.css.len(),
            rotated,
            "Visual page saved"
        );

        Ok(())
    }

    /// Swap the previous version back in. Calling it twice restores the original state.
    ///
    /// Returns `false` without writing when there is no record or no previous version.
    #[tracing::instrument(skip(self), fields(page = %key))]
    pub async fn restore_previous_visual_page(&self, key: VisualPageKey) -> Result<bool, AppError> {
        let Some(StoredPage { record, updated_at }) = self.load(key).await? else {
            return Ok(false);
        };
        let Some(previous) = record.previous_version.clone() else {
            return Ok(false);
        };

        let restored = VisualPageRecord {
            html: previous.html,
            css: previous.css,
            style_hrefs: previous.style_hrefs,
            is_published: previous.is_published,
            previous_version: Some(record.to_snapshot(updated_at)),
        };

        self.write(key, &restored).await?;

        tracing::info!(page = %key, restored_from = %previous.saved_at, "Visual page restored");

        Ok(true)
    }

    async fn write(&self, key: VisualPageKey, record: &VisualPageRecord) -> Result<(), AppError> {
        let items = serde_json::to_value(record)?;
        self.store
            .upsert(key.storage_slug(), key.display_name(), items)
            .await
    }
}

fn decode(key: VisualPageKey, entry: SiteContentEntry) -> Option<StoredPage> {
    match serde_json::from_value::<VisualPageRecord>(entry.items) {
        Ok(record) => Some(StoredPage {
            record,
            updated_at: entry.updated_at,
        }),
        Err(e) => {
            tracing::warn!(page = %key, error = %e, "Ignoring malformed visual page record");
            None
        }
    }
}
