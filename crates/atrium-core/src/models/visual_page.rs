use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

/// Named visual pages, each backed by one persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VisualPageKey {
    Home,
    Connect,
}

impl VisualPageKey {
    pub const ALL: [VisualPageKey; 2] = [VisualPageKey::Home, VisualPageKey::Connect];

    pub fn as_str(&self) -> &'static str {
        match self {
            VisualPageKey::Home => "home",
            VisualPageKey::Connect => "connect",
        }
    }

    /// Slug under which the persistence collaborator stores this page.
    pub fn storage_slug(&self) -> &'static str {
        match self {
            VisualPageKey::Home => "visual-page-home",
            VisualPageKey::Connect => "visual-page-connect",
        }
    }

    /// Human-readable record name written alongside the blob.
    pub fn display_name(&self) -> &'static str {
        match self {
            VisualPageKey::Home => "Visual page: home",
            VisualPageKey::Connect => "Visual page: connect",
        }
    }
}

impl FromStr for VisualPageKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" => Ok(VisualPageKey::Home),
            "connect" => Ok(VisualPageKey::Connect),
            _ => Err(anyhow::anyhow!("Unknown visual page: {}", s)),
        }
    }
}

impl Display for VisualPageKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A retained prior version of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualPageSnapshot {
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub css: String,
    #[serde(default)]
    pub style_hrefs: Vec<String>,
    #[serde(default)]
    pub is_published: bool,
    pub saved_at: DateTime<Utc>,
}

/// The JSON blob persisted for one visual page.
///
/// History depth is exactly one: `previous_version` is a snapshot, and a
/// snapshot never carries its own previous version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisualPageRecord {
    pub html: String,
    pub css: String,
    pub style_hrefs: Vec<String>,
    pub is_published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<VisualPageSnapshot>,
}

impl VisualPageRecord {
    /// Freeze the current content of this record as a snapshot.
    pub fn to_snapshot(&self, saved_at: DateTime<Utc>) -> VisualPageSnapshot {
        VisualPageSnapshot {
            html: self.html.clone(),
            css: self.css.clone(),
            style_hrefs: self.style_hrefs.clone(),
            is_published: self.is_published,
            saved_at,
        }
    }
}

/// Content submitted by the editor for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct VisualPageInput {
    pub html: String,
    pub css: String,
    pub style_hrefs: Vec<String>,
    pub is_published: bool,
}

/// Editor-facing view of a visual page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisualPageData {
    pub key: VisualPageKey,
    pub html: String,
    pub css: String,
    pub style_hrefs: Vec<String>,
    pub is_published: bool,
    /// True when the built-in default template is what is being shown
    pub is_default: bool,
    pub has_previous_version: bool,
    pub previous_saved_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Renderable payload served to public pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishedVisualPage {
    pub html: String,
    pub css: String,
    pub style_hrefs: Vec<String>,
}
