//! Query resolution.
//!
//! Turns free-text queries like `"Breaking Bad s05e14"` into concrete
//! download descriptors, going through the cached catalog and refreshing
//! it when stale. Partial failures (unknown show, unparsable topic title,
//! failed refresh) are logged and skipped; the resolver returns whatever
//! it could resolve.

mod query;

pub use query::{parse_query, SearchRequest};

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::Session;
use crate::cache::MetadataCache;
use crate::parse::parse_title;
use crate::site::SiteAdapter;
use crate::sync::CatalogSynchronizer;

/// A resolved download descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    /// Site-assigned topic id; results are deduplicated and ordered by it.
    pub item_id: u32,
    /// Display title: `<queried title> / <episode id> / <quality>`.
    pub title: String,
    /// Absolute download URL.
    pub url: String,
    /// Rendered episode id, e.g. `s05e14` or `s01e03-10`.
    pub series_id: String,
}

/// Resolves search queries against the cached catalog.
pub struct SearchResolver {
    adapter: Arc<dyn SiteAdapter>,
    cache: Arc<dyn MetadataCache>,
    sync: CatalogSynchronizer,
}

impl SearchResolver {
    pub fn new(
        adapter: Arc<dyn SiteAdapter>,
        cache: Arc<dyn MetadataCache>,
        sync: CatalogSynchronizer,
    ) -> Self {
        Self {
            adapter,
            cache,
            sync,
        }
    }

    /// Resolve every query string. Unrecognized strings and unknown shows
    /// are skipped with a warning. Results are deduplicated by item id and
    /// returned in ascending item-id order, which is also the documented
    /// tie-break: when several releases cover the queried episode, the
    /// first result is the one with the lowest item id.
    pub async fn search(&self, queries: &[String], session: Option<&Session>) -> Vec<ResolvedItem> {
        let mut matches: BTreeMap<u32, ResolvedItem> = BTreeMap::new();

        for raw in queries {
            let Some(request) = parse_query(raw) else {
                warn!(query = %raw, "invalid search string");
                continue;
            };
            debug!(
                title = %request.title,
                season = request.season,
                episode = request.episode,
                "searching"
            );

            self.sync.ensure_catalog_fresh(session).await;

            let entry = match self.cache.find_entry_by_title(&request.title) {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    debug!(title = %request.title, "unknown show");
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, title = %request.title, "catalog lookup failed");
                    continue;
                }
            };

            self.sync.ensure_items_fresh(&entry, session).await;

            let items = match self.cache.list_items(entry.id) {
                Ok(items) => items,
                Err(e) => {
                    warn!(error = %e, entry = entry.id, "topic listing failed");
                    continue;
                }
            };

            for item in items {
                let parsed = match parse_title(self.adapter.title_patterns(), &item.title) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        warn!(error = %e, "skipping topic");
                        continue;
                    }
                };

                if parsed.season != request.season || !parsed.contains_episode(request.episode) {
                    continue;
                }

                let series_id = parsed.episode_id();
                let title = match &parsed.quality {
                    Some(quality) => format!("{} / {} / {}", request.title, series_id, quality),
                    None => format!("{} / {}", request.title, series_id),
                };

                matches.entry(item.id).or_insert_with(|| ResolvedItem {
                    item_id: item.id,
                    title,
                    url: self.adapter.download_url(&item.download_ref),
                    series_id,
                });
            }
        }

        matches.into_values().collect()
    }
}
