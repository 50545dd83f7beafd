//! Mock page fetcher for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use url::Url;

use crate::auth::Session;
use crate::fetch::{FetchError, Page, PageFetcher};

/// Scripted outcome for one POST.
#[derive(Debug, Clone)]
pub enum PostScript {
    /// Login accepted: a page that set the given cookies.
    Success {
        body: String,
        cookies: HashMap<String, String>,
    },
    /// Login rejected: a page with no cookies.
    Reject,
    /// The site demands a captcha.
    Challenge,
    /// Transport-level failure.
    Error,
}

impl PostScript {
    pub fn success_with_cookies(cookies: &[(&str, &str)]) -> Self {
        Self::Success {
            body: "welcome".to_string(),
            cookies: cookies
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }

    pub fn reject() -> Self {
        Self::Reject
    }

    pub fn challenge() -> Self {
        Self::Challenge
    }

    pub fn error() -> Self {
        Self::Error
    }
}

/// Mock implementation of [`PageFetcher`].
///
/// GETs are answered from a URL-to-body table (the `__ts` cache-buster is
/// ignored when matching); POSTs pop scripted outcomes from a per-URL
/// queue, defaulting to a rejection page. Every request is recorded for
/// assertions.
#[derive(Default)]
pub struct MockFetcher {
    pages: Mutex<HashMap<String, String>>,
    posts: Mutex<HashMap<String, VecDeque<PostScript>>>,
    recorded_gets: Mutex<Vec<String>>,
    recorded_posts: Mutex<Vec<String>>,
    fail_gets: AtomicBool,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for GETs of `url` (compared without `__ts`).
    pub fn respond(&self, url: &str, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(normalize(url), body.to_string());
    }

    /// Queue one POST outcome for `url`.
    pub fn enqueue_post(&self, url: &str, script: PostScript) {
        self.posts
            .lock()
            .unwrap()
            .entry(normalize(url))
            .or_default()
            .push_back(script);
    }

    /// Make every subsequent GET fail with a connection error.
    pub fn fail_gets(&self) {
        self.fail_gets.store(true, Ordering::SeqCst);
    }

    /// Let GETs succeed again.
    pub fn restore_gets(&self) {
        self.fail_gets.store(false, Ordering::SeqCst);
    }

    /// Raw URLs of every GET made, in order.
    pub fn recorded_gets(&self) -> Vec<String> {
        self.recorded_gets.lock().unwrap().clone()
    }

    pub fn get_count(&self) -> usize {
        self.recorded_gets.lock().unwrap().len()
    }

    pub fn post_count(&self) -> usize {
        self.recorded_posts.lock().unwrap().len()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn get(&self, url: &str, _session: Option<&Session>) -> Result<Page, FetchError> {
        self.recorded_gets.lock().unwrap().push(url.to_string());

        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(FetchError::Connection("simulated failure".to_string()));
        }

        let body = self
            .pages
            .lock()
            .unwrap()
            .get(&normalize(url))
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 404,
                url: url.to_string(),
            })?;

        Ok(Page {
            url: Url::parse(url).expect("mock fetcher got an invalid URL"),
            body,
            set_cookies: HashMap::new(),
        })
    }

    async fn post_form(
        &self,
        url: &str,
        _form: &[(String, String)],
        _session: Option<&Session>,
    ) -> Result<Page, FetchError> {
        self.recorded_posts.lock().unwrap().push(url.to_string());

        let script = self
            .posts
            .lock()
            .unwrap()
            .get_mut(&normalize(url))
            .and_then(|queue| queue.pop_front())
            .unwrap_or(PostScript::Reject);

        let parsed = Url::parse(url).expect("mock fetcher got an invalid URL");
        match script {
            PostScript::Success { body, cookies } => Ok(Page {
                url: parsed,
                body,
                set_cookies: cookies,
            }),
            PostScript::Reject => Ok(Page {
                url: parsed,
                body: "invalid login".to_string(),
                set_cookies: HashMap::new(),
            }),
            PostScript::Challenge => Ok(Page {
                url: parsed,
                body: r#"{"need_captcha": true}"#.to_string(),
                set_cookies: HashMap::new(),
            }),
            PostScript::Error => Err(FetchError::Connection(
                "simulated login failure".to_string(),
            )),
        }
    }
}

/// Drop the `__ts` cache-buster so scripted URLs match fetched ones.
fn normalize(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(name, _)| name != "__ts")
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    if pairs.is_empty() {
        parsed.set_query(None);
    } else {
        let mut serializer = parsed.query_pairs_mut();
        serializer.clear();
        for (name, value) in &pairs {
            serializer.append_pair(name, value);
        }
        drop(serializer);
    }

    parsed.into()
}
