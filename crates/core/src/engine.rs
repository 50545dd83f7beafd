//! Top-level engine wiring.
//!
//! [`TrackerEngine`] owns the durable stores, the session registry and the
//! resolution pipeline for one tracker site, and exposes the caller-facing
//! operations: `search`, `rewrite`, `session` and `reset_cache`.

use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::auth::{
    AuthError, CredentialStore, Session, SessionManager, SqliteCredentialStore, StoreError,
};
use crate::cache::{CacheError, MetadataCache, SqliteMetadataCache};
use crate::config::{validate_config, Config, ConfigError};
use crate::fetch::{HttpPageFetcher, PageFetcher};
use crate::resolver::{parse_query, ResolvedItem, SearchResolver};
use crate::rewrite::{RewriteError, UrlRewriter};
use crate::site::SiteAdapter;
use crate::sync::CatalogSynchronizer;

/// Fatal engine-level failures. Partial failures inside a search never
/// surface here; they are logged and skipped.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One tracker site, fully wired.
pub struct TrackerEngine {
    config: Config,
    credentials: Arc<dyn CredentialStore>,
    cache: Arc<dyn MetadataCache>,
    sessions: SessionManager,
    resolver: SearchResolver,
    rewriter: UrlRewriter,
}

impl TrackerEngine {
    /// Wire an engine from explicit collaborators. Fails fast on a
    /// configuration without credentials.
    pub fn new(
        config: Config,
        adapter: Arc<dyn SiteAdapter>,
        fetcher: Arc<dyn PageFetcher>,
        cache: Arc<dyn MetadataCache>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, EngineError> {
        validate_config(&config)?;

        let sessions = SessionManager::new(
            adapter.clone(),
            fetcher.clone(),
            credentials.clone(),
            &config.auth,
        );
        let sync = CatalogSynchronizer::new(
            adapter.clone(),
            fetcher.clone(),
            cache.clone(),
            config.cache.clone(),
        );
        let resolver = SearchResolver::new(adapter.clone(), cache.clone(), sync);
        let rewriter = UrlRewriter::new(adapter, fetcher);

        Ok(Self {
            config,
            credentials,
            cache,
            sessions,
            resolver,
            rewriter,
        })
    }

    /// Open an engine over SQLite stores at the configured database path
    /// and a reqwest-backed fetcher.
    pub fn open(config: Config, adapter: Arc<dyn SiteAdapter>) -> Result<Self, EngineError> {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpPageFetcher::new(&config.http));
        let cache: Arc<dyn MetadataCache> =
            Arc::new(SqliteMetadataCache::new(&config.database.path)?);
        let credentials: Arc<dyn CredentialStore> =
            Arc::new(SqliteCredentialStore::new(&config.database.path)?);
        Self::new(config, adapter, fetcher, cache, credentials)
    }

    /// The authenticated session for the configured account, creating it
    /// on first use.
    pub async fn session(&self) -> Result<Arc<Session>, AuthError> {
        self.sessions
            .session(&self.config.auth.username, &self.config.auth.password)
            .await
    }

    /// Resolve search queries into download descriptors.
    ///
    /// Authentication happens once per call, and only when at least one
    /// query string is recognized — malformed input never touches the
    /// network. Partial failures are logged and skipped; an authentication
    /// failure is total and surfaces as an error.
    pub async fn search(&self, queries: &[String]) -> Result<Vec<ResolvedItem>, EngineError> {
        if !queries.iter().any(|q| parse_query(q).is_some()) {
            return Ok(self.resolver.search(queries, None).await);
        }

        let session = self.session().await?;
        Ok(self.resolver.search(queries, Some(&session)).await)
    }

    /// Whether a URL can be rewritten by [`Self::rewrite`].
    pub fn rewritable(&self, url: &str) -> bool {
        self.rewriter.rewritable(url)
    }

    /// Resolve a direct topic URL to its download URL.
    pub async fn rewrite(&self, topic_url: &str) -> Result<String, EngineError> {
        let session = self.session().await?;
        Ok(self.rewriter.rewrite(topic_url, Some(&session)).await?)
    }

    /// Clear all cached catalog and item state, and when a username is
    /// given, that username's stored credential as well.
    pub async fn reset_cache(&self, username: Option<&str>) -> Result<(), EngineError> {
        self.cache.clear()?;
        if let Some(username) = username {
            self.credentials.delete(username)?;
            self.sessions.invalidate(username).await;
        }
        info!(username = username.unwrap_or("-"), "cache reset");
        Ok(())
    }
}
