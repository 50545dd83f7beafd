//! Direct topic URL rewriting.
//!
//! When the caller already holds a tracker topic URL, the rewriter
//! resolves it to the final download URL without going through search:
//! validate the URL shape, fetch the topic page, extract the single
//! download link (or magnet URI) and resolve it against the page's final
//! URL.

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::auth::Session;
use crate::fetch::{add_timestamp, FetchError, PageFetcher};
use crate::site::{DownloadRef, SiteAdapter};

/// Errors raised while rewriting a topic URL.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("`{0}` does not match the tracker topic URL format")]
    InvalidTopicUrl(String),

    #[error("failed to fetch topic page: {0}")]
    Fetch(#[from] FetchError),

    #[error("no download link found on `{url}`: {reason}")]
    ExtractionFailed { url: String, reason: String },
}

/// Resolves a topic URL to its download URL.
pub struct UrlRewriter {
    adapter: Arc<dyn SiteAdapter>,
    fetcher: Arc<dyn PageFetcher>,
}

impl UrlRewriter {
    pub fn new(adapter: Arc<dyn SiteAdapter>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { adapter, fetcher }
    }

    /// Whether the URL has the site's topic shape at all.
    pub fn rewritable(&self, url: &str) -> bool {
        self.adapter.topic_id(url).is_some()
    }

    /// Rewrite a topic URL into an absolute download URL or magnet URI.
    pub async fn rewrite(
        &self,
        topic_url: &str,
        session: Option<&Session>,
    ) -> Result<String, RewriteError> {
        let topic_id = self
            .adapter
            .topic_id(topic_url)
            .ok_or_else(|| RewriteError::InvalidTopicUrl(topic_url.to_string()))?;

        let url = add_timestamp(&self.adapter.topic_url(topic_id))?;
        let page = self.fetcher.get(&url, session).await?;

        match self.adapter.extract_download(&page) {
            Ok(DownloadRef::Url(href)) => {
                let resolved =
                    page.url
                        .join(&href)
                        .map_err(|e| RewriteError::ExtractionFailed {
                            url: page.url.to_string(),
                            reason: format!("unresolvable download link `{}`: {}", href, e),
                        })?;
                debug!(topic = topic_id, url = %resolved, "topic rewritten");
                Ok(resolved.to_string())
            }
            Ok(DownloadRef::Magnet(uri)) => {
                debug!(topic = topic_id, "topic rewritten to magnet");
                Ok(uri)
            }
            Err(e) => Err(RewriteError::ExtractionFailed {
                url: page.url.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
