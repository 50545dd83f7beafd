//! Local tracker metadata cache.
//!
//! Two related catalogs are cached to avoid re-scraping the site on every
//! query: catalog entries (shows/forums) and item entries (topics) scoped
//! to one catalog entry. Each scope carries a watermark — the minimum
//! `updated_at` across its rows — and is refreshed wholesale when the
//! watermark crosses its TTL.

mod sqlite;
mod types;

pub use sqlite::SqliteMetadataCache;
pub use types::*;

use chrono::{DateTime, Duration, Utc};

/// Trait for metadata cache storage.
pub trait MetadataCache: Send + Sync {
    /// Watermark of the whole catalog, `None` when never synced.
    fn catalog_watermark(&self) -> Result<Option<DateTime<Utc>>, CacheError>;

    /// Atomically replace the whole catalog: clear, then bulk insert with
    /// a single timestamp. A concurrent reader sees the old catalog or the
    /// new one, never a partially cleared state.
    fn replace_catalog(&self, entries: &[CatalogEntry]) -> Result<(), CacheError>;

    /// All catalog entries with their alternate titles.
    fn list_catalog(&self) -> Result<Vec<CatalogEntry>, CacheError>;

    /// Look up an entry by exact primary or alternate title.
    fn find_entry_by_title(&self, title: &str) -> Result<Option<CatalogEntry>, CacheError>;

    /// Look up an entry by id.
    fn entry_by_id(&self, id: u32) -> Result<Option<CatalogEntry>, CacheError>;

    /// Watermark of one entry's item list, `None` when never synced.
    fn items_watermark(&self, entry_id: u32) -> Result<Option<DateTime<Utc>>, CacheError>;

    /// Atomically replace one entry's items; siblings under other entries
    /// are untouched.
    fn replace_items(&self, entry_id: u32, items: &[ItemEntry]) -> Result<(), CacheError>;

    /// Items of one catalog entry.
    fn list_items(&self, entry_id: u32) -> Result<Vec<ItemEntry>, CacheError>;

    /// Drop all cached catalog and item state.
    fn clear(&self) -> Result<(), CacheError>;
}

/// Whether a scope needs a refresh. Never-synced data is stale; otherwise
/// the full age is compared against the TTL with a strict `>`, so data
/// aged exactly `ttl_days` is still fresh and one second past it is not.
pub fn is_stale(last_synced: Option<DateTime<Utc>>, ttl_days: i64, now: DateTime<Utc>) -> bool {
    match last_synced {
        None => true,
        Some(last) => now - last > Duration::days(ttl_days),
    }
}
