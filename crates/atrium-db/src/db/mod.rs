//! Database repositories
//
// Keyed JSON blobs (visual pages and other site content)
pub mod site_content;

pub use site_content::{
    create_site_content_store, InMemorySiteContentStore, PostgresSiteContentRepository,
    SiteContentEntry, SiteContentStore,
};
