//! Types crossing the site adapter boundary.

use std::collections::HashMap;
use thiserror::Error;

/// A login POST prepared by the adapter.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub url: String,
    pub form: Vec<(String, String)>,
}

/// What the adapter read out of a login response.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Cookies scoped to the site's cookie domain.
    Success(HashMap<String, String>),
    /// Credentials not accepted; worth retrying.
    Rejected,
    /// The site demands a captcha or similar manual step. Not retryable.
    ChallengeRequired(String),
}

/// A show/forum row extracted from the catalog page.
///
/// The first title is the primary one; the rest are alternate titles
/// (most sites list `Localized / Original`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRow {
    pub id: u32,
    pub titles: Vec<String>,
    pub url: String,
}

/// A topic row extracted from a topic-list page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRow {
    pub id: u32,
    pub title: String,
    pub download_ref: String,
}

/// One page of a catalog entry's topic list.
#[derive(Debug, Clone, Default)]
pub struct ItemPage {
    pub rows: Vec<ItemRow>,
    /// Total page count as shown by the pagination widget, when present.
    pub total_pages: Option<u32>,
}

/// A download reference found on a topic page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadRef {
    /// Possibly relative link to a `.torrent` download.
    Url(String),
    /// Magnet URI, used verbatim.
    Magnet(String),
}

/// Expected page structure was missing or unreadable.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("expected node not found: {0}")]
    NodeMissing(String),

    #[error("malformed page fragment: {0}")]
    Malformed(String),
}
