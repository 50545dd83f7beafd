//! Search string parsing.

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// A recognized `<title> <season>/<episode>` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub title: String,
    pub season: u32,
    pub episode: u32,
}

/// Recognized query shapes, tried in order: `Title 5x14`, `Title s05e14`.
static QUERY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)^(.*?)\s*(\d+)x(\d+)$").unwrap(),
        Regex::new(r"(?i)^(.*?)\s*s(\d+)e(\d+)$").unwrap(),
    ]
});

/// Parse a free-text search string. `None` means the string fits no
/// recognized shape — the caller skips it with a warning, not an error.
pub fn parse_query(raw: &str) -> Option<SearchRequest> {
    let trimmed = raw.trim();
    for pattern in QUERY_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(trimmed) {
            let title = caps.get(1)?.as_str().trim().to_string();
            let season = caps.get(2)?.as_str().parse().ok()?;
            let episode = caps.get(3)?.as_str().parse().ok()?;
            if title.is_empty() {
                return None;
            }
            return Some(SearchRequest {
                title,
                season,
                episode,
            });
        }
    }
    None
}
