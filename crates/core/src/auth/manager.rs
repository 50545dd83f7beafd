//! Session acquisition and reuse.

use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::fetch::PageFetcher;
use crate::site::{LoginOutcome, SiteAdapter};

use super::store::CredentialStore;
use super::types::{AuthError, Credential, Session};

/// How long freshly obtained cookies are trusted before re-login.
const CREDENTIAL_LIFETIME_DAYS: i64 = 1;

/// Obtains and caches authenticated sessions.
///
/// The registry is an explicit object guarded by a mutex, constructed once
/// per process and shared by reference; the lock is held across a login so
/// concurrent callers for the same site wait for one authentication
/// instead of racing their own.
pub struct SessionManager {
    adapter: Arc<dyn SiteAdapter>,
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn CredentialStore>,
    attempts: u32,
    retry_delay: Duration,
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    pub fn new(
        adapter: Arc<dyn SiteAdapter>,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn CredentialStore>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            adapter,
            fetcher,
            store,
            attempts: config.login_attempts.max(1),
            retry_delay: Duration::from_secs(config.login_retry_secs),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Get a usable session for the account, idempotent per username for
    /// the process lifetime. Order of preference: live session from the
    /// registry, stored non-expired cookies, fresh login.
    pub async fn session(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Arc<Session>, AuthError> {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get(username) {
            return Ok(session.clone());
        }

        let cookies = match self.store.find_valid(username, Utc::now())? {
            Some(credential) => {
                debug!(username = username, "using previously saved cookies");
                credential.cookies
            }
            None => {
                debug!(username = username, "no valid cookies stored, logging in");
                self.login(username, password).await?
            }
        };

        let session = Arc::new(Session::new(
            username,
            cookies,
            self.adapter.cookie_domain(),
        ));
        sessions.insert(username.to_string(), session.clone());
        Ok(session)
    }

    /// Drop the live session for a username, forcing the next call to go
    /// back through the store (or a fresh login).
    pub async fn invalidate(&self, username: &str) {
        self.sessions.lock().await.remove(username);
    }

    async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<HashMap<String, String>, AuthError> {
        let request = self.adapter.login_request(username, password);

        for attempt in 1..=self.attempts {
            let page = self
                .fetcher
                .post_form(&request.url, &request.form, None)
                .await?;

            match self.adapter.interpret_login(&page) {
                LoginOutcome::Success(cookies) if !cookies.is_empty() => {
                    let credential = Credential {
                        username: username.to_string(),
                        cookies: cookies.clone(),
                        expires_at: Utc::now() + ChronoDuration::days(CREDENTIAL_LIFETIME_DAYS),
                    };
                    self.store.save(&credential)?;
                    debug!(username = username, attempt = attempt, "login succeeded");
                    return Ok(cookies);
                }
                LoginOutcome::ChallengeRequired(message) => {
                    // Retrying cannot clear a captcha; surface it distinctly.
                    return Err(AuthError::ChallengeRequired(message));
                }
                LoginOutcome::Success(_) | LoginOutcome::Rejected => {
                    warn!(
                        username = username,
                        attempt = attempt,
                        "login rejected, no cookies received"
                    );
                    if attempt < self.attempts {
                        sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(AuthError::InvalidCredentials(username.to_string()))
    }
}
