//! Shared test fixtures.

use crate::cache::CatalogEntry;
use crate::config::Config;
use crate::site::{CatalogRow, ItemRow};

/// A catalog row hosted by the scripted site; the first title is primary.
pub fn catalog_row(id: u32, titles: &[&str]) -> CatalogRow {
    CatalogRow {
        id,
        titles: titles.iter().map(|t| t.to_string()).collect(),
        url: format!("https://tracker.example.com/viewforum.php?f={}", id),
    }
}

/// A cached catalog entry with no alternate titles.
pub fn catalog_entry(id: u32, title: &str) -> CatalogEntry {
    CatalogEntry {
        id,
        title: title.to_string(),
        alt_titles: vec![],
        url: format!("https://tracker.example.com/viewforum.php?f={}", id),
    }
}

/// A topic row whose download reference is its own id.
pub fn item_row(id: u32, title: &str) -> ItemRow {
    ItemRow {
        id,
        title: title.to_string(),
        download_ref: id.to_string(),
    }
}

/// Engine configuration for tests: real TTLs, no login retry delay.
pub fn test_config() -> Config {
    crate::config::load_config_from_str(
        r#"
[auth]
username = "alice"
password = "secret"
login_retry_secs = 0

[http]
min_request_interval_secs = 0
"#,
    )
    .expect("test config must parse")
}
