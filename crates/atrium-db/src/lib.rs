//! Atrium persistence
//!
//! The site content store keeps opaque JSON blobs under fixed string slugs. The
//! visual page store is its only consumer; it never looks at the table layout.

pub mod db;
pub mod setup;

pub use db::{
    create_site_content_store, InMemorySiteContentStore, PostgresSiteContentRepository,
    SiteContentEntry, SiteContentStore,
};
pub use setup::setup_database;
