//! Site adapter abstraction.
//!
//! Everything that differs between tracker sites — login payloads, URL
//! shapes, page extraction — is concentrated in the [`SiteAdapter`] trait.
//! The engine itself never touches HTML; adapters receive fetched pages
//! and return structured rows, so they can be mocked entirely in tests.

mod types;

pub use types::*;

use crate::cache::CatalogEntry;
use crate::fetch::Page;
use crate::parse::TitlePattern;

/// Per-site strategy object. One implementation per tracker.
pub trait SiteAdapter: Send + Sync {
    /// Site name for logging.
    fn name(&self) -> &str;

    /// Site root, e.g. `https://tracker.example.com`.
    fn base_url(&self) -> &str;

    /// Domain the session cookies are scoped to, e.g. `.tracker.example.com`.
    /// Cookies are never injected into requests for other hosts.
    fn cookie_domain(&self) -> &str;

    /// Build the login POST for the given account.
    fn login_request(&self, username: &str, password: &str) -> LoginRequest;

    /// Interpret the login response.
    ///
    /// The default reads nothing site-specific: a response that set cookies
    /// is a success, anything else is a rejection. Sites that signal a
    /// bot challenge explicitly should override this and return
    /// [`LoginOutcome::ChallengeRequired`].
    fn interpret_login(&self, page: &Page) -> LoginOutcome {
        if page.set_cookies.is_empty() {
            LoginOutcome::Rejected
        } else {
            LoginOutcome::Success(page.set_cookies.clone())
        }
    }

    /// URL of the page listing every show/forum.
    fn catalog_url(&self) -> String;

    /// URL of one page of a catalog entry's topic list. `start` is the
    /// zero-based item offset; `0` means the first page.
    fn items_page_url(&self, entry: &CatalogEntry, start: u32) -> String;

    /// Extract the topic id from a topic URL, if the URL has the site's
    /// topic shape. `None` means the URL is not rewritable.
    fn topic_id(&self, url: &str) -> Option<u32>;

    /// Canonical URL of a topic page.
    fn topic_url(&self, topic_id: u32) -> String;

    /// Turn a stored download reference into an absolute download URL.
    fn download_url(&self, download_ref: &str) -> String;

    /// Title patterns to try, in order, when parsing topic titles.
    fn title_patterns(&self) -> &[TitlePattern];

    /// Extract `{id, titles, url}` rows from the catalog page.
    fn extract_catalog(&self, page: &Page) -> Result<Vec<CatalogRow>, ExtractError>;

    /// Extract topic rows plus the total page count from a topic-list page.
    fn extract_items(&self, page: &Page) -> Result<ItemPage, ExtractError>;

    /// Extract the single download link or magnet URI from a topic page.
    fn extract_download(&self, page: &Page) -> Result<DownloadRef, ExtractError>;
}
