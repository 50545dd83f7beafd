//! Types for the metadata cache.

use thiserror::Error;

/// A show/forum as cached locally. The site-assigned id is stable across
/// refreshes; every title (primary or alternate) maps to at most one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: u32,
    pub title: String,
    pub alt_titles: Vec<String>,
    pub url: String,
}

impl CatalogEntry {
    /// Primary title followed by alternates, in stored order.
    pub fn all_titles(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.title.as_str()).chain(self.alt_titles.iter().map(String::as_str))
    }
}

/// A topic/episode release under a catalog entry, unique by
/// `(entry_id, id)`. The title is kept raw and parsed on every resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEntry {
    pub id: u32,
    pub entry_id: u32,
    pub title: String,
    pub download_ref: String,
}

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("database error: {0}")]
    Database(String),
}
