//! End-to-end resolution lifecycle tests.
//!
//! These tests drive the whole engine with a mock fetcher and a scripted
//! site adapter:
//! - Login, catalog refresh, topic refresh and resolution in one pass
//! - TTL-driven refresh idempotence (no re-fetch within the TTL)
//! - Fallback to cached data when the site stops answering
//! - Credential reuse across engine instances sharing one store
//! - Direct topic URL rewriting

use std::sync::Arc;

use tempfile::TempDir;

use showsync_core::auth::SqliteCredentialStore;
use showsync_core::cache::SqliteMetadataCache;
use showsync_core::MetadataCache;
use showsync_core::site::DownloadRef;
use showsync_core::testing::{fixtures, MockFetcher, PostScript, ScriptedSite};
use showsync_core::{AuthError, EngineError, TrackerEngine};

const LOGIN_URL: &str = "https://tracker.example.com/login.php";
const CATALOG_URL: &str = "https://tracker.example.com/serials.php";

/// Engine plus its collaborators, all hermetic.
struct TestHarness {
    engine: TrackerEngine,
    fetcher: Arc<MockFetcher>,
    site: Arc<ScriptedSite>,
    cache: Arc<SqliteMetadataCache>,
}

impl TestHarness {
    fn new() -> Self {
        let site = Arc::new(ScriptedSite::new());
        let fetcher = Arc::new(MockFetcher::new());
        let cache = Arc::new(SqliteMetadataCache::in_memory().expect("cache"));
        let credentials = Arc::new(SqliteCredentialStore::in_memory().expect("store"));

        let engine = TrackerEngine::new(
            fixtures::test_config(),
            site.clone(),
            fetcher.clone(),
            cache.clone(),
            credentials,
        )
        .expect("engine");

        Self {
            engine,
            fetcher,
            site,
            cache,
        }
    }

    /// Accept the next login and host one show with a handful of topics.
    fn seed_site(&self) {
        self.fetcher
            .enqueue_post(LOGIN_URL, PostScript::success_with_cookies(&[("uid", "42")]));

        self.site.script_catalog_page(
            "catalog:v1",
            vec![
                fixtures::catalog_row(12, &["Breaking Bad", "Во все тяжкие"]),
                fixtures::catalog_row(7, &["Fargo", "Фарго"]),
            ],
        );
        self.site.script_items_page(
            "items:bb",
            vec![
                fixtures::item_row(501, "Breaking Bad / Во все тяжкие / Сезон 5 / Серии 14-14, HD"),
                fixtures::item_row(502, "Breaking Bad / Во все тяжкие / Сезон 5 / Серии 1-8, HD"),
                fixtures::item_row(503, "Breaking Bad / Во все тяжкие / Сезон 4 / Серии 1-13, HD"),
            ],
            None,
        );
        self.fetcher.respond(CATALOG_URL, "catalog:v1");
        self.fetcher
            .respond("https://tracker.example.com/viewforum.php?f=12", "items:bb");
    }
}

#[tokio::test]
async fn test_search_resolves_episode_end_to_end() {
    let harness = TestHarness::new();
    harness.seed_site();

    let results = harness
        .engine
        .search(&["Breaking Bad s05e14".to_string()])
        .await
        .expect("search");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].series_id, "s05e14");
    assert_eq!(results[0].title, "Breaking Bad / s05e14 / HD");
    assert_eq!(
        results[0].url,
        "https://tracker.example.com/download.php?id=501"
    );

    // One login, one catalog page, one topic page.
    assert_eq!(harness.fetcher.post_count(), 1);
    assert_eq!(harness.fetcher.get_count(), 2);
}

#[tokio::test]
async fn test_second_search_within_ttl_uses_cache_only() {
    let harness = TestHarness::new();
    harness.seed_site();

    harness
        .engine
        .search(&["Breaking Bad s05e14".to_string()])
        .await
        .expect("first search");
    let fetches_after_first = harness.fetcher.get_count();

    let results = harness
        .engine
        .search(&["Breaking Bad s05e03".to_string()])
        .await
        .expect("second search");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].series_id, "s05e01-08");
    // Catalog and topics were fresh: zero additional fetches.
    assert_eq!(harness.fetcher.get_count(), fetches_after_first);
    // And still only the one login.
    assert_eq!(harness.fetcher.post_count(), 1);
}

#[tokio::test]
async fn test_search_falls_back_to_cached_data_when_site_is_down() {
    let harness = TestHarness::new();
    harness.seed_site();

    harness
        .engine
        .search(&["Breaking Bad s05e14".to_string()])
        .await
        .expect("warm-up search");

    // Site goes dark; cached catalog and topics still serve.
    harness.fetcher.fail_gets();
    let results = harness
        .engine
        .search(&["Breaking Bad s05e14".to_string()])
        .await
        .expect("search against cache");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].series_id, "s05e14");
}

#[tokio::test]
async fn test_unknown_show_is_empty_not_error() {
    let harness = TestHarness::new();
    harness.seed_site();

    let results = harness
        .engine
        .search(&["Nonexistent Show s01e01".to_string()])
        .await
        .expect("search");

    assert!(results.is_empty());
}

#[tokio::test]
async fn test_malformed_query_never_touches_network() {
    let harness = TestHarness::new();
    harness.seed_site();

    let results = harness
        .engine
        .search(&["not a valid query".to_string()])
        .await
        .expect("search");

    assert!(results.is_empty());
    assert_eq!(harness.fetcher.get_count(), 0);
    assert_eq!(harness.fetcher.post_count(), 0);
}

#[tokio::test]
async fn test_mixed_queries_resolve_the_valid_ones() {
    let harness = TestHarness::new();
    harness.seed_site();

    let results = harness
        .engine
        .search(&[
            "garbage".to_string(),
            "Breaking Bad s05e14".to_string(),
            "Unknown Show s01e01".to_string(),
        ])
        .await
        .expect("search");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].series_id, "s05e14");
}

#[tokio::test]
async fn test_both_query_shapes_resolve() {
    let harness = TestHarness::new();
    harness.seed_site();

    let sxe = harness
        .engine
        .search(&["Breaking Bad s05e14".to_string()])
        .await
        .expect("sNNeMM");
    let nxm = harness
        .engine
        .search(&["Breaking Bad 5x14".to_string()])
        .await
        .expect("NxM");

    assert_eq!(sxe, nxm);
    assert_eq!(sxe.len(), 1);
}

#[tokio::test]
async fn test_challenge_required_is_surfaced_distinctly() {
    let harness = TestHarness::new();
    harness
        .fetcher
        .enqueue_post(LOGIN_URL, PostScript::challenge());

    let err = harness
        .engine
        .search(&["Breaking Bad s05e14".to_string()])
        .await
        .expect_err("challenge must fail the search");

    assert!(matches!(
        err,
        EngineError::Auth(AuthError::ChallengeRequired(_))
    ));
    // No retries against a captcha.
    assert_eq!(harness.fetcher.post_count(), 1);
}

#[tokio::test]
async fn test_invalid_credentials_exhaust_retry_budget() {
    let harness = TestHarness::new();
    // Every login POST falls back to a rejection page.

    let err = harness
        .engine
        .search(&["Breaking Bad s05e14".to_string()])
        .await
        .expect_err("login must fail");

    assert!(matches!(
        err,
        EngineError::Auth(AuthError::InvalidCredentials(_))
    ));
    assert_eq!(harness.fetcher.post_count(), 5);
}

#[tokio::test]
async fn test_credential_survives_engine_restart() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("showsync.db");

    let site = Arc::new(ScriptedSite::new());
    site.script_catalog_page("catalog:v1", vec![fixtures::catalog_row(7, &["Fargo"])]);

    // First process: logs in once.
    let fetcher1 = Arc::new(MockFetcher::new());
    fetcher1.enqueue_post(LOGIN_URL, PostScript::success_with_cookies(&[("uid", "42")]));
    fetcher1.respond(CATALOG_URL, "catalog:v1");
    let engine1 = TrackerEngine::new(
        fixtures::test_config(),
        site.clone(),
        fetcher1.clone(),
        Arc::new(SqliteMetadataCache::new(&db_path)?),
        Arc::new(SqliteCredentialStore::new(&db_path)?),
    )?;
    engine1.search(&["Fargo s01e01".to_string()]).await?;
    assert_eq!(fetcher1.post_count(), 1);

    // Second process: reuses the stored credential, no login POST.
    let fetcher2 = Arc::new(MockFetcher::new());
    fetcher2.respond(CATALOG_URL, "catalog:v1");
    let engine2 = TrackerEngine::new(
        fixtures::test_config(),
        site,
        fetcher2.clone(),
        Arc::new(SqliteMetadataCache::new(&db_path)?),
        Arc::new(SqliteCredentialStore::new(&db_path)?),
    )?;
    engine2.search(&["Fargo s01e01".to_string()]).await?;
    assert_eq!(fetcher2.post_count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_rewrite_end_to_end() {
    let harness = TestHarness::new();
    harness
        .fetcher
        .enqueue_post(LOGIN_URL, PostScript::success_with_cookies(&[("uid", "42")]));
    harness.site.script_download_page(
        "topic:42",
        DownloadRef::Url("download.php?id=999".to_string()),
    );
    harness
        .fetcher
        .respond("https://tracker.example.com/viewtopic.php?t=42", "topic:42");

    let url = harness
        .engine
        .rewrite("https://tracker.example.com/viewtopic.php?t=42")
        .await
        .expect("rewrite");

    assert_eq!(url, "https://tracker.example.com/download.php?id=999");
    assert!(harness
        .engine
        .rewritable("https://tracker.example.com/viewtopic.php?t=42"));
    assert!(!harness.engine.rewritable("https://elsewhere.example.com/"));
}

#[tokio::test]
async fn test_rewrite_missing_link_is_typed_error() {
    let harness = TestHarness::new();
    harness
        .fetcher
        .enqueue_post(LOGIN_URL, PostScript::success_with_cookies(&[("uid", "42")]));
    harness
        .fetcher
        .respond("https://tracker.example.com/viewtopic.php?t=42", "bare page");

    let err = harness
        .engine
        .rewrite("https://tracker.example.com/viewtopic.php?t=42")
        .await
        .expect_err("no link on page");

    assert!(matches!(
        err,
        EngineError::Rewrite(showsync_core::RewriteError::ExtractionFailed { .. })
    ));
}

#[tokio::test]
async fn test_reset_cache_forces_full_resync() {
    let harness = TestHarness::new();
    harness.seed_site();

    harness
        .engine
        .search(&["Breaking Bad s05e14".to_string()])
        .await
        .expect("warm-up search");
    assert_eq!(harness.cache.list_catalog().expect("list").len(), 2);

    harness
        .engine
        .reset_cache(Some("alice"))
        .await
        .expect("reset");
    assert!(harness.cache.list_catalog().expect("list").is_empty());

    // Everything is refetched, including a fresh login.
    harness
        .fetcher
        .enqueue_post(LOGIN_URL, PostScript::success_with_cookies(&[("uid", "43")]));
    let results = harness
        .engine
        .search(&["Breaking Bad s05e14".to_string()])
        .await
        .expect("search after reset");

    assert_eq!(results.len(), 1);
    assert_eq!(harness.fetcher.post_count(), 2);
}
