use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Tracker account credentials and login retry policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
    /// Login attempts before giving up (default: 5)
    #[serde(default = "default_login_attempts")]
    pub login_attempts: u32,
    /// Fixed delay between login attempts in seconds (default: 3)
    #[serde(default = "default_login_retry_secs")]
    pub login_retry_secs: u64,
}

fn default_login_attempts() -> u32 {
    5
}

fn default_login_retry_secs() -> u64 {
    3
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("showsync.db")
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Timeout for requests routed through a challenge-solving proxy,
    /// which can take over a minute to clear (default: 80)
    #[serde(default = "default_challenge_timeout")]
    pub challenge_timeout_secs: u64,
    /// Minimum spacing between requests to the same host in seconds
    /// (default: 3)
    #[serde(default = "default_min_interval")]
    pub min_request_interval_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            challenge_timeout_secs: default_challenge_timeout(),
            min_request_interval_secs: default_min_interval(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_challenge_timeout() -> u64 {
    80
}

fn default_min_interval() -> u64 {
    3
}

/// Cache TTLs and pagination
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Days before the show catalog is considered stale (default: 3)
    #[serde(default = "default_catalog_ttl")]
    pub catalog_ttl_days: i64,
    /// Days before a show's topic list is considered stale (default: 1)
    #[serde(default = "default_items_ttl")]
    pub items_ttl_days: i64,
    /// Topics per list page, used to compute pagination offsets
    /// (default: 50)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            catalog_ttl_days: default_catalog_ttl(),
            items_ttl_days: default_items_ttl(),
            page_size: default_page_size(),
        }
    }
}

fn default_catalog_ttl() -> i64 {
    3
}

fn default_items_ttl() -> i64 {
    1
}

fn default_page_size() -> u32 {
    50
}

/// Sanitized config for logs and diagnostics (password redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub username: String,
    pub password_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                username: config.auth.username.clone(),
                password_configured: !config.auth.password.is_empty(),
            },
            database: config.database.clone(),
            http: config.http.clone(),
            cache: config.cache.clone(),
        }
    }
}
