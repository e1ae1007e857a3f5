//! Data models for the application
//!
//! Organized by domain: managed files for the scoped file store, visual page
//! records and views for the page content store.

mod file;
mod visual_page;

pub use file::*;
pub use visual_page::*;
