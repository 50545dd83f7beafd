//! Catalog and item refresh orchestration.
//!
//! The synchronizer keeps the local metadata cache warm: when a scope's
//! watermark crosses its TTL, the corresponding pages are fetched,
//! extracted through the site adapter and stored wholesale. A refresh that
//! fails part-way leaves the previous snapshot intact — resolution falls
//! back to cached (possibly stale) data instead of failing the search.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use chrono::Utc;

use crate::auth::Session;
use crate::cache::{is_stale, CatalogEntry, ItemEntry, MetadataCache};
use crate::config::CacheConfig;
use crate::fetch::{add_timestamp, FetchError, PageFetcher};
use crate::site::{CatalogRow, ExtractError, ItemRow, SiteAdapter};

/// A refresh attempt that could not complete.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Refreshes cached tracker metadata on demand.
pub struct CatalogSynchronizer {
    adapter: Arc<dyn SiteAdapter>,
    fetcher: Arc<dyn PageFetcher>,
    cache: Arc<dyn MetadataCache>,
    config: CacheConfig,
}

impl CatalogSynchronizer {
    pub fn new(
        adapter: Arc<dyn SiteAdapter>,
        fetcher: Arc<dyn PageFetcher>,
        cache: Arc<dyn MetadataCache>,
        config: CacheConfig,
    ) -> Self {
        Self {
            adapter,
            fetcher,
            cache,
            config,
        }
    }

    /// Refresh the whole catalog if its watermark crossed the TTL.
    /// Failures are logged and swallowed; the cached catalog stays in
    /// place for the caller to read.
    pub async fn ensure_catalog_fresh(&self, session: Option<&Session>) {
        let watermark = match self.cache.catalog_watermark() {
            Ok(watermark) => watermark,
            Err(e) => {
                warn!(error = %e, "failed to read catalog watermark");
                return;
            }
        };
        if !is_stale(watermark, self.config.catalog_ttl_days, Utc::now()) {
            return;
        }

        debug!(site = self.adapter.name(), "updating catalog");
        match self.fetch_catalog(session).await {
            Ok(rows) if !rows.is_empty() => {
                let entries: Vec<CatalogEntry> = rows.into_iter().filter_map(row_to_entry).collect();
                debug!(count = entries.len(), "catalog entries received");
                if let Err(e) = self.cache.replace_catalog(&entries) {
                    warn!(error = %e, "failed to store refreshed catalog");
                }
            }
            Ok(_) => {
                warn!("catalog page yielded no entries, keeping cached catalog");
            }
            Err(e) => {
                warn!(error = %e, "catalog refresh failed, falling back to cached data");
            }
        }
    }

    /// Refresh one entry's item list if its watermark crossed the TTL,
    /// following pagination to completion. Same fallback policy as
    /// [`Self::ensure_catalog_fresh`].
    pub async fn ensure_items_fresh(&self, entry: &CatalogEntry, session: Option<&Session>) {
        let watermark = match self.cache.items_watermark(entry.id) {
            Ok(watermark) => watermark,
            Err(e) => {
                warn!(error = %e, entry = entry.id, "failed to read items watermark");
                return;
            }
        };
        if !is_stale(watermark, self.config.items_ttl_days, Utc::now()) {
            return;
        }

        debug!(entry = entry.id, "updating topics");
        match self.fetch_items(entry, session).await {
            Ok(rows) if !rows.is_empty() => {
                let items: Vec<ItemEntry> = rows
                    .into_iter()
                    .map(|row| row_to_item(entry.id, row))
                    .collect();
                debug!(count = items.len(), entry = entry.id, "topics received");
                if let Err(e) = self.cache.replace_items(entry.id, &items) {
                    warn!(error = %e, entry = entry.id, "failed to store refreshed topics");
                }
            }
            Ok(_) => {
                warn!(entry = entry.id, "topic pages yielded no items, keeping cached topics");
            }
            Err(e) => {
                warn!(error = %e, entry = entry.id, "topic refresh failed, falling back to cached data");
            }
        }
    }

    async fn fetch_catalog(&self, session: Option<&Session>) -> Result<Vec<CatalogRow>, SyncError> {
        let url = self.adapter.catalog_url();
        let page = self.fetcher.get(&url, session).await?;
        Ok(self.adapter.extract_catalog(&page)?)
    }

    /// Fetch every page of an entry's topic list. The first page tells us
    /// the total page count; the rest follow sequentially, spaced by the
    /// fetcher's per-host limiter.
    async fn fetch_items(
        &self,
        entry: &CatalogEntry,
        session: Option<&Session>,
    ) -> Result<Vec<ItemRow>, SyncError> {
        let mut rows = Vec::new();
        let mut total_pages = 0u32;
        let mut page_index = 0u32;

        loop {
            let url = self.adapter.items_page_url(entry, page_index * self.config.page_size);
            let url = add_timestamp(&url)?;
            let page = self.fetcher.get(&url, session).await?;
            let item_page = self.adapter.extract_items(&page)?;

            if total_pages < 1 {
                total_pages = item_page.total_pages.unwrap_or(0);
            }
            rows.extend(item_page.rows);

            page_index += 1;
            if page_index >= total_pages {
                break;
            }
        }

        Ok(rows)
    }
}

fn row_to_entry(row: CatalogRow) -> Option<CatalogEntry> {
    let mut titles = row.titles.into_iter().filter(|t| !t.trim().is_empty());
    let title = titles.next()?;
    Some(CatalogEntry {
        id: row.id,
        title,
        alt_titles: titles.collect(),
        url: row.url,
    })
}

fn row_to_item(entry_id: u32, row: ItemRow) -> ItemEntry {
    ItemEntry {
        id: row.id,
        entry_id,
        title: row.title,
        download_ref: row.download_ref,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SqliteMetadataCache;
    use crate::testing::{fixtures, MockFetcher, ScriptedSite};

    fn cache_config() -> CacheConfig {
        CacheConfig {
            catalog_ttl_days: 3,
            items_ttl_days: 1,
            page_size: 50,
        }
    }

    fn synchronizer(
        site: Arc<ScriptedSite>,
        fetcher: Arc<MockFetcher>,
        cache: Arc<SqliteMetadataCache>,
    ) -> CatalogSynchronizer {
        CatalogSynchronizer::new(site, fetcher, cache, cache_config())
    }

    #[tokio::test]
    async fn test_catalog_refresh_populates_cache() {
        let site = Arc::new(ScriptedSite::new());
        let fetcher = Arc::new(MockFetcher::new());
        let cache = Arc::new(SqliteMetadataCache::in_memory().unwrap());

        site.script_catalog_page(
            "catalog:v1",
            vec![fixtures::catalog_row(12, &["Breaking Bad", "Во все тяжкие"])],
        );
        fetcher.respond("https://tracker.example.com/serials.php", "catalog:v1");

        let sync = synchronizer(site, fetcher.clone(), cache.clone());
        sync.ensure_catalog_fresh(None).await;

        let entries = cache.list_catalog().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Breaking Bad");
        assert_eq!(fetcher.get_count(), 1);
    }

    #[tokio::test]
    async fn test_second_refresh_within_ttl_fetches_nothing() {
        let site = Arc::new(ScriptedSite::new());
        let fetcher = Arc::new(MockFetcher::new());
        let cache = Arc::new(SqliteMetadataCache::in_memory().unwrap());

        site.script_catalog_page("catalog:v1", vec![fixtures::catalog_row(12, &["Fargo"])]);
        fetcher.respond("https://tracker.example.com/serials.php", "catalog:v1");

        let sync = synchronizer(site, fetcher.clone(), cache.clone());
        sync.ensure_catalog_fresh(None).await;
        sync.ensure_catalog_fresh(None).await;

        assert_eq!(fetcher.get_count(), 1);
        assert_eq!(cache.list_catalog().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_catalog() {
        let site = Arc::new(ScriptedSite::new());
        let fetcher = Arc::new(MockFetcher::new());
        let cache = Arc::new(SqliteMetadataCache::in_memory().unwrap());

        // Seed a catalog, then make every subsequent fetch fail.
        site.script_catalog_page("catalog:v1", vec![fixtures::catalog_row(12, &["Fargo"])]);
        fetcher.respond("https://tracker.example.com/serials.php", "catalog:v1");

        let sync = CatalogSynchronizer::new(
            site.clone(),
            fetcher.clone(),
            cache.clone(),
            CacheConfig {
                catalog_ttl_days: 0, // every call attempts a refresh
                ..cache_config()
            },
        );
        sync.ensure_catalog_fresh(None).await;
        assert_eq!(cache.list_catalog().unwrap().len(), 1);

        fetcher.fail_gets();
        sync.ensure_catalog_fresh(None).await;

        // Previous snapshot intact
        let entries = cache.list_catalog().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Fargo");
    }

    #[tokio::test]
    async fn test_extraction_failure_keeps_previous_catalog() {
        let site = Arc::new(ScriptedSite::new());
        let fetcher = Arc::new(MockFetcher::new());
        let cache = Arc::new(SqliteMetadataCache::in_memory().unwrap());

        site.script_catalog_page("catalog:v1", vec![fixtures::catalog_row(12, &["Fargo"])]);
        fetcher.respond("https://tracker.example.com/serials.php", "catalog:v1");

        let sync = CatalogSynchronizer::new(
            site.clone(),
            fetcher.clone(),
            cache.clone(),
            CacheConfig {
                catalog_ttl_days: 0,
                ..cache_config()
            },
        );
        sync.ensure_catalog_fresh(None).await;

        // Unscripted body -> ExtractError::NodeMissing
        fetcher.respond("https://tracker.example.com/serials.php", "garbage");
        sync.ensure_catalog_fresh(None).await;

        assert_eq!(cache.list_catalog().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_items_pagination_fetches_every_page() {
        let site = Arc::new(ScriptedSite::new());
        let fetcher = Arc::new(MockFetcher::new());
        let cache = Arc::new(SqliteMetadataCache::in_memory().unwrap());

        let entry = fixtures::catalog_entry(7, "Fargo");
        cache.replace_catalog(std::slice::from_ref(&entry)).unwrap();

        site.script_items_page(
            "items:p1",
            vec![fixtures::item_row(100, "Fargo / Фарго / s01e01 / HD")],
            Some(3),
        );
        site.script_items_page(
            "items:p2",
            vec![fixtures::item_row(101, "Fargo / Фарго / s01e02 / HD")],
            Some(3),
        );
        site.script_items_page(
            "items:p3",
            vec![fixtures::item_row(102, "Fargo / Фарго / s01e03 / HD")],
            Some(3),
        );
        fetcher.respond("https://tracker.example.com/viewforum.php?f=7", "items:p1");
        fetcher.respond(
            "https://tracker.example.com/viewforum.php?f=7&start=50",
            "items:p2",
        );
        fetcher.respond(
            "https://tracker.example.com/viewforum.php?f=7&start=100",
            "items:p3",
        );

        let sync = synchronizer(site, fetcher.clone(), cache.clone());
        sync.ensure_items_fresh(&entry, None).await;

        assert_eq!(fetcher.get_count(), 3);
        let items = cache.list_items(7).unwrap();
        assert_eq!(items.len(), 3);

        // One shared watermark for the whole pass
        assert!(cache.items_watermark(7).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_items_requests_carry_cache_buster() {
        let site = Arc::new(ScriptedSite::new());
        let fetcher = Arc::new(MockFetcher::new());
        let cache = Arc::new(SqliteMetadataCache::in_memory().unwrap());

        let entry = fixtures::catalog_entry(7, "Fargo");
        site.script_items_page(
            "items:p1",
            vec![fixtures::item_row(100, "Fargo / Фарго / s01e01 / HD")],
            None,
        );
        fetcher.respond("https://tracker.example.com/viewforum.php?f=7", "items:p1");

        let sync = synchronizer(site, fetcher.clone(), cache);
        sync.ensure_items_fresh(&entry, None).await;

        let requested = fetcher.recorded_gets();
        assert_eq!(requested.len(), 1);
        assert!(requested[0].contains("__ts="));
        assert!(requested[0].contains("f=7"));
    }

    #[tokio::test]
    async fn test_failed_page_mid_pagination_keeps_previous_items() {
        let site = Arc::new(ScriptedSite::new());
        let fetcher = Arc::new(MockFetcher::new());
        let cache = Arc::new(SqliteMetadataCache::in_memory().unwrap());

        let entry = fixtures::catalog_entry(7, "Fargo");
        cache.replace_catalog(std::slice::from_ref(&entry)).unwrap();
        cache
            .replace_items(
                7,
                &[crate::cache::ItemEntry {
                    id: 100,
                    entry_id: 7,
                    title: "Fargo / Фарго / s01e01 / HD".to_string(),
                    download_ref: "1000".to_string(),
                }],
            )
            .unwrap();

        // Page 1 resolves, page 2 was never scripted -> fetch error.
        site.script_items_page(
            "items:p1",
            vec![fixtures::item_row(200, "Fargo / Фарго / s01e02 / HD")],
            Some(2),
        );
        fetcher.respond("https://tracker.example.com/viewforum.php?f=7", "items:p1");

        let sync = CatalogSynchronizer::new(
            site,
            fetcher,
            cache.clone(),
            CacheConfig {
                items_ttl_days: 0,
                ..cache_config()
            },
        );
        sync.ensure_items_fresh(&entry, None).await;

        // Old snapshot intact, partial page 1 was not stored
        let items = cache.list_items(7).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 100);
    }
}
