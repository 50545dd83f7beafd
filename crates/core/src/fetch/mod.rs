//! Page fetching abstraction.
//!
//! The engine talks to tracker sites through the [`PageFetcher`] trait:
//! plain GET/POST returning the response body together with the final
//! (post-redirect) URL and any cookies the response set. The production
//! implementation is [`HttpPageFetcher`]; tests use the in-crate mock.

mod http;
mod rate_limiter;
mod urls;

pub use http::HttpPageFetcher;
pub use rate_limiter::HostRateLimiter;
pub use urls::{add_timestamp, add_url_params, host_of};

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

use crate::auth::Session;

/// MIME type of a `.torrent` payload.
pub const TORRENT_CONTENT_TYPE: &str = "application/x-bittorrent";

/// A fetched page.
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects; relative links resolve against this.
    pub url: Url,
    /// Response body as text.
    pub body: String,
    /// Cookies set by the response, name to value.
    pub set_cookies: HashMap<String, String>,
}

/// Errors raised by page fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected content type `{0}`, expected `{TORRENT_CONTENT_TYPE}`")]
    UnexpectedContentType(String),
}

/// Fetches pages, injecting the session's cookies into requests whose host
/// belongs to the session's cookie domain.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn get(&self, url: &str, session: Option<&Session>) -> Result<Page, FetchError>;

    async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        session: Option<&Session>,
    ) -> Result<Page, FetchError>;
}

/// Whether a `Content-Type` header value denotes a torrent payload.
/// Parameters (`; name=...`) are ignored.
pub fn is_torrent_content_type(header: &str) -> bool {
    header
        .split(';')
        .next()
        .map(|mime| mime.trim().eq_ignore_ascii_case(TORRENT_CONTENT_TYPE))
        .unwrap_or(false)
}

/// Check a downloaded payload's `Content-Type`, rejecting anything that is
/// not a torrent (trackers serve an HTML error page when a session died).
pub fn ensure_torrent_content_type(header: &str) -> Result<(), FetchError> {
    if is_torrent_content_type(header) {
        return Ok(());
    }
    Err(FetchError::UnexpectedContentType(header.to_string()))
}
