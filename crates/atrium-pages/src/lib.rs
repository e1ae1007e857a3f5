//! Atrium Visual Pages
//!
//! Whole-page HTML/CSS blobs for a fixed set of named pages. Input may be a full
//! captured document; it is reduced to an embeddable fragment plus a stylesheet,
//! stored with exactly one retained previous version, and served to public
//! renderers only when published.
//!
//! # Sanitization
//!
//! The attribute sanitizer is a denylist, not a parsed-DOM allowlist. Authors
//! paste rich markup from a visual builder, so anything not known to be
//! dangerous is kept. Tags are scanned the way browsers tokenize them, but
//! there is no tree construction (foreign content, CDATA and misnested
//! formatting are not modelled); treat stored pages as trusted-author content.
//!
//! # Concurrency
//!
//! Saving is read-modify-write against the site content store without a version
//! token. Two concurrent saves lose one update, and the loser's rotation into
//! the previous slot is lost with it.

pub mod css;
pub mod html;
mod patterns;
pub mod sanitize;
pub mod service;
pub mod templates;

pub use atrium_core::models::{
    PublishedVisualPage, VisualPageData, VisualPageInput, VisualPageKey,
};
pub use css::{normalize_css, normalize_style_hrefs};
pub use html::{has_markup, normalize_visual_html};
pub use sanitize::sanitize_attributes;
pub use service::VisualPageService;
