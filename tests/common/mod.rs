//! Scripted in-memory driver for exercising the orchestration core without
//! a network. Pages are keyed by URL; login state, failure injection and
//! call counters are programmable per test.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use company_harvester::infrastructure::browser::{BrowserDriver, DriverError, ElementSnapshot};

const LOGGED_OUT_MARKER: &str = "input[type='email']";
const SUBMIT_BUTTON: &str = "button[type='submit']";
const HOME_URL: &str = "https://www.crunchbase.com/home";

#[derive(Default)]
struct Page {
    texts: HashMap<String, String>,
    attrs: HashMap<(String, String), String>,
}

#[derive(Default)]
struct State {
    current_url: Option<String>,
    pages: HashMap<String, Page>,
    search_hits: HashMap<String, Vec<ElementSnapshot>>,
    failing_urls: HashSet<String>,
    logged_in: bool,
    login_succeeds: bool,
    expire_at_navigation: Option<u32>,
    navigations: u32,
    login_submissions: u32,
    filled: HashMap<String, String>,
}

pub struct ScriptedDriver {
    state: Mutex<State>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                logged_in: true,
                login_succeeds: true,
                ..State::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Register a profile page with text fields.
    pub fn add_page(&self, url: &str, texts: &[(&str, &str)]) {
        let mut state = self.lock();
        let page = state.pages.entry(url.to_string()).or_default();
        for (selector, text) in texts {
            page.texts.insert(selector.to_string(), text.to_string());
        }
    }

    /// Register attribute values on an already-known page.
    pub fn add_page_attrs(&self, url: &str, attrs: &[(&str, &str, &str)]) {
        let mut state = self.lock();
        let page = state.pages.entry(url.to_string()).or_default();
        for (selector, attr, value) in attrs {
            page.attrs
                .insert((selector.to_string(), attr.to_string()), value.to_string());
        }
    }

    /// Script one search hit for a query string.
    pub fn add_search_hit(&self, query: &str, name: &str, href: &str) {
        self.lock()
            .search_hits
            .entry(query.to_string())
            .or_default()
            .push(ElementSnapshot {
                text: name.to_string(),
                href: Some(href.to_string()),
            });
    }

    /// Every navigation to this exact URL fails.
    pub fn fail_url(&self, url: &str) {
        self.lock().failing_urls.insert(url.to_string());
    }

    /// Drop the session right after the N-th navigation completes.
    pub fn expire_at_navigation(&self, n: u32) {
        self.lock().expire_at_navigation = Some(n);
    }

    pub fn set_login_succeeds(&self, succeeds: bool) {
        self.lock().login_succeeds = succeeds;
    }

    pub fn navigations(&self) -> u32 {
        self.lock().navigations
    }

    pub fn login_submissions(&self) -> u32 {
        self.lock().login_submissions
    }
}

impl Default for ScriptedDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let mut state = self.lock();
        if state.failing_urls.contains(url) {
            return Err(DriverError::Navigation {
                url: url.to_string(),
                message: "connection reset".to_string(),
            });
        }
        state.navigations += 1;
        if state.expire_at_navigation == Some(state.navigations) {
            state.logged_in = false;
        }
        state.current_url = Some(url.to_string());
        Ok(())
    }

    async fn find_text(&self, selector: &str) -> Result<Option<String>, DriverError> {
        let state = self.lock();
        let Some(url) = &state.current_url else {
            return Err(DriverError::NoPage);
        };
        Ok(state
            .pages
            .get(url)
            .and_then(|page| page.texts.get(selector).cloned()))
    }

    async fn find_attr(
        &self,
        selector: &str,
        attr: &str,
    ) -> Result<Option<String>, DriverError> {
        let state = self.lock();
        let Some(url) = &state.current_url else {
            return Err(DriverError::NoPage);
        };
        Ok(state.pages.get(url).and_then(|page| {
            page.attrs
                .get(&(selector.to_string(), attr.to_string()))
                .cloned()
        }))
    }

    async fn find_all(
        &self,
        _selector: &str,
        _label_selector: Option<&str>,
    ) -> Result<Vec<ElementSnapshot>, DriverError> {
        let state = self.lock();
        let Some(url) = &state.current_url else {
            return Err(DriverError::NoPage);
        };
        let query = Url::parse(url)
            .ok()
            .and_then(|u| {
                u.query_pairs()
                    .find(|(k, _)| k == "q")
                    .map(|(_, v)| v.into_owned())
            })
            .unwrap_or_default();
        Ok(state.search_hits.get(&query).cloned().unwrap_or_default())
    }

    async fn is_present(&self, selector: &str) -> Result<bool, DriverError> {
        let state = self.lock();
        if selector == LOGGED_OUT_MARKER {
            return Ok(!state.logged_in);
        }
        let Some(url) = &state.current_url else {
            return Ok(false);
        };
        Ok(state
            .pages
            .get(url)
            .is_some_and(|page| page.texts.contains_key(selector)))
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), DriverError> {
        self.lock()
            .filled
            .insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        let mut state = self.lock();
        if selector == SUBMIT_BUTTON {
            state.login_submissions += 1;
            if state.login_succeeds && !state.filled.is_empty() {
                state.logged_in = true;
                state.current_url = Some(HOME_URL.to_string());
            }
        }
        Ok(())
    }

    async fn current_url(&self) -> Option<String> {
        self.lock().current_url.clone()
    }

    // Batches under test must finish instantly.
    async fn wait(&self, _duration: Duration) {}
}
