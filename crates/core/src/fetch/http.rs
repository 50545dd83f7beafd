//! reqwest-backed page fetcher.

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::{Client, RequestBuilder, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::auth::Session;
use crate::config::HttpConfig;

use super::rate_limiter::HostRateLimiter;
use super::urls::host_of;
use super::{FetchError, Page, PageFetcher};

/// Production [`PageFetcher`] over a shared reqwest client and a shared
/// per-host rate limiter.
pub struct HttpPageFetcher {
    client: Client,
    limiter: Arc<HostRateLimiter>,
}

impl HttpPageFetcher {
    /// Fetcher with the standard request timeout.
    pub fn new(config: &HttpConfig) -> Self {
        Self::with_timeout(config, Duration::from_secs(config.timeout_secs))
    }

    /// Fetcher for sites fronted by a challenge-solving proxy, which needs
    /// a much longer timeout while the proxy works through the challenge.
    pub fn for_challenge_transport(config: &HttpConfig) -> Self {
        Self::with_timeout(config, Duration::from_secs(config.challenge_timeout_secs))
    }

    fn with_timeout(config: &HttpConfig, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        let limiter = Arc::new(HostRateLimiter::new(Duration::from_secs(
            config.min_request_interval_secs,
        )));
        Self { client, limiter }
    }

    /// Share an existing limiter (all fetchers for one process should).
    pub fn with_limiter(mut self, limiter: Arc<HostRateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    fn apply_session(
        request: RequestBuilder,
        host: &str,
        session: Option<&Session>,
    ) -> RequestBuilder {
        match session {
            Some(session) if session.matches_host(host) => {
                request.header(COOKIE, session.cookie_header())
            }
            _ => request,
        }
    }

    async fn execute(&self, request: RequestBuilder, url: &str) -> Result<Page, FetchError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        into_page(response, url).await
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn get(&self, url: &str, session: Option<&Session>) -> Result<Page, FetchError> {
        let host = host_of(url)?;
        self.limiter.acquire(&host).await;
        debug!(url = %url, "GET");

        let request = Self::apply_session(self.client.get(url), &host, session);
        self.execute(request, url).await
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        session: Option<&Session>,
    ) -> Result<Page, FetchError> {
        let host = host_of(url)?;
        self.limiter.acquire(&host).await;
        debug!(url = %url, "POST");

        let request = Self::apply_session(self.client.post(url).form(form), &host, session);
        self.execute(request, url).await
    }
}

fn map_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_connect() {
        FetchError::Connection(e.to_string())
    } else {
        FetchError::Transport(e.to_string())
    }
}

async fn into_page(response: Response, requested: &str) -> Result<Page, FetchError> {
    if !response.status().is_success() {
        return Err(FetchError::Status {
            status: response.status().as_u16(),
            url: requested.to_string(),
        });
    }

    let url = response.url().clone();
    let set_cookies = response
        .cookies()
        .map(|c| (c.name().to_string(), c.value().to_string()))
        .collect();
    let body = response.text().await.map_err(map_reqwest_error)?;

    Ok(Page {
        url,
        body,
        set_cookies,
    })
}
