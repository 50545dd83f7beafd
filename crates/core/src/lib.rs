//! Tracker metadata synchronization and episode resolution engine.
//!
//! One generic engine replaces the near-identical per-site integrations
//! found in tracker plugins: an authenticated session layer over
//! short-lived cookies, a TTL-invalidated local catalog cache (shows and
//! their topics), a tolerant topic-title parser and a deterministic query
//! resolver that turns `"Show s05e14"` into a concrete download URL.
//! Per-site specifics live behind the [`site::SiteAdapter`] trait.

pub mod auth;
pub mod cache;
pub mod config;
pub mod engine;
pub mod fetch;
pub mod parse;
pub mod resolver;
pub mod rewrite;
pub mod site;
pub mod sync;
pub mod testing;

pub use auth::{AuthError, Credential, Session, SessionManager};
pub use cache::{CacheError, CatalogEntry, ItemEntry, MetadataCache, SqliteMetadataCache};
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use engine::{EngineError, TrackerEngine};
pub use fetch::{FetchError, HttpPageFetcher, Page, PageFetcher};
pub use parse::{ParseError, ParsedTitle, TitlePattern};
pub use resolver::{ResolvedItem, SearchResolver};
pub use rewrite::{RewriteError, UrlRewriter};
pub use site::SiteAdapter;
pub use sync::CatalogSynchronizer;
