//! CLI command implementations.

pub mod build;
pub mod search;
pub mod tags;

pub use build::build_site;
pub use search::{search_feed, SearchOptions};
pub use tags::list_tags;
