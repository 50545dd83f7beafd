//! Scripted site adapter for testing.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::cache::CatalogEntry;
use crate::fetch::Page;
use crate::parse::{default_patterns, TitlePattern};
use crate::site::{
    CatalogRow, DownloadRef, ExtractError, ItemPage, ItemRow, LoginOutcome, LoginRequest,
    SiteAdapter,
};

static TOPIC_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"viewtopic\.php\?t=(\d+)").unwrap());

/// A [`SiteAdapter`] whose extraction is driven by scripted page bodies.
///
/// Tests register a body marker (the fake "HTML") together with the rows
/// it should extract to; a fetched page whose body was never scripted
/// extracts to [`ExtractError::NodeMissing`], mimicking a layout change.
pub struct ScriptedSite {
    base: String,
    cookie_domain: String,
    catalog_pages: Mutex<HashMap<String, Vec<CatalogRow>>>,
    item_pages: Mutex<HashMap<String, ItemPage>>,
    download_pages: Mutex<HashMap<String, DownloadRef>>,
}

impl Default for ScriptedSite {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSite {
    pub fn new() -> Self {
        Self {
            base: "https://tracker.example.com".to_string(),
            cookie_domain: ".tracker.example.com".to_string(),
            catalog_pages: Mutex::new(HashMap::new()),
            item_pages: Mutex::new(HashMap::new()),
            download_pages: Mutex::new(HashMap::new()),
        }
    }

    /// Script the catalog rows a page body extracts to.
    pub fn script_catalog_page(&self, body: &str, rows: Vec<CatalogRow>) {
        self.catalog_pages
            .lock()
            .unwrap()
            .insert(body.to_string(), rows);
    }

    /// Script the item rows and page count a page body extracts to.
    pub fn script_items_page(&self, body: &str, rows: Vec<ItemRow>, total_pages: Option<u32>) {
        self.item_pages
            .lock()
            .unwrap()
            .insert(body.to_string(), ItemPage { rows, total_pages });
    }

    /// Script the download reference a topic page body extracts to.
    pub fn script_download_page(&self, body: &str, download: DownloadRef) {
        self.download_pages
            .lock()
            .unwrap()
            .insert(body.to_string(), download);
    }
}

impl SiteAdapter for ScriptedSite {
    fn name(&self) -> &str {
        "scripted"
    }

    fn base_url(&self) -> &str {
        &self.base
    }

    fn cookie_domain(&self) -> &str {
        &self.cookie_domain
    }

    fn login_request(&self, username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            url: format!("{}/login.php", self.base),
            form: vec![
                ("login_username".to_string(), username.to_string()),
                ("login_password".to_string(), password.to_string()),
                ("autologin".to_string(), "1".to_string()),
                ("login".to_string(), "1".to_string()),
            ],
        }
    }

    fn interpret_login(&self, page: &Page) -> LoginOutcome {
        if page.body.contains("need_captcha") {
            return LoginOutcome::ChallengeRequired(
                "captcha required; log in from a browser and try again".to_string(),
            );
        }
        if page.set_cookies.is_empty() {
            LoginOutcome::Rejected
        } else {
            LoginOutcome::Success(page.set_cookies.clone())
        }
    }

    fn catalog_url(&self) -> String {
        format!("{}/serials.php", self.base)
    }

    fn items_page_url(&self, entry: &CatalogEntry, start: u32) -> String {
        if start > 0 {
            format!("{}/viewforum.php?f={}&start={}", self.base, entry.id, start)
        } else {
            format!("{}/viewforum.php?f={}", self.base, entry.id)
        }
    }

    fn topic_id(&self, url: &str) -> Option<u32> {
        TOPIC_ID
            .captures(url)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    fn topic_url(&self, topic_id: u32) -> String {
        format!("{}/viewtopic.php?t={}", self.base, topic_id)
    }

    fn download_url(&self, download_ref: &str) -> String {
        format!(
            "{}/download.php?id={}",
            self.base,
            urlencoding::encode(download_ref)
        )
    }

    fn title_patterns(&self) -> &[TitlePattern] {
        default_patterns()
    }

    fn extract_catalog(&self, page: &Page) -> Result<Vec<CatalogRow>, ExtractError> {
        self.catalog_pages
            .lock()
            .unwrap()
            .get(&page.body)
            .cloned()
            .ok_or_else(|| ExtractError::NodeMissing("catalog list".to_string()))
    }

    fn extract_items(&self, page: &Page) -> Result<ItemPage, ExtractError> {
        self.item_pages
            .lock()
            .unwrap()
            .get(&page.body)
            .cloned()
            .ok_or_else(|| ExtractError::NodeMissing("topic list".to_string()))
    }

    fn extract_download(&self, page: &Page) -> Result<DownloadRef, ExtractError> {
        self.download_pages
            .lock()
            .unwrap()
            .get(&page.body)
            .cloned()
            .ok_or_else(|| ExtractError::NodeMissing("download link".to_string()))
    }
}
