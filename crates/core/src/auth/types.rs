//! Types for the authentication system.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

use crate::fetch::FetchError;

use super::store::StoreError;

/// A durable login record: the cookies a site handed out and when they
/// stop being trusted. Replaced wholesale on every re-authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub cookies: HashMap<String, String>,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// A live authenticated calling context for one site.
///
/// The session injects its cookies only into requests whose host belongs
/// to the site's own cookie domain; credentials never leak cross-host.
#[derive(Debug, Clone)]
pub struct Session {
    username: String,
    cookies: HashMap<String, String>,
    cookie_domain: String,
}

impl Session {
    pub fn new(
        username: impl Into<String>,
        cookies: HashMap<String, String>,
        cookie_domain: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            cookies,
            cookie_domain: cookie_domain.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Whether `host` is the cookie domain itself or a subdomain of it.
    pub fn matches_host(&self, host: &str) -> bool {
        let domain = self.cookie_domain.trim_start_matches('.');
        let host = host.to_ascii_lowercase();
        host == domain
            || host
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    }

    /// Render the `Cookie` header value. Keys are sorted so the header is
    /// deterministic.
    pub fn cookie_header(&self) -> String {
        let mut pairs: Vec<_> = self.cookies.iter().collect();
        pairs.sort_by_key(|(name, _)| name.as_str());
        pairs
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }
}

/// Errors raised while obtaining a session.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password for `{0}`")]
    InvalidCredentials(String),

    #[error("manual login required: {0}")]
    ChallengeRequired(String),

    #[error("login transport failure: {0}")]
    Transport(#[from] FetchError),

    #[error("credential store failure: {0}")]
    Store(#[from] StoreError),
}
