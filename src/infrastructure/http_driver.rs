//! HTTP-backed implementation of the browser capability.
//!
//! Keeps a cookie session and the raw HTML of the current page; CSS queries
//! are answered by re-parsing that snapshot per call so no parsed DOM lives
//! across an await point. Form fills are buffered and flushed as one request
//! when the submit control is clicked, which is how the login flow works
//! without a real browser. Requests are rate limited to stay polite.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{direct::NotKeyed, InMemoryState},
    Quota, RateLimiter,
};
use reqwest::{
    header::{HeaderMap, HeaderValue, USER_AGENT},
    Client, Method,
};
use scraper::{ElementRef, Html, Selector};
use std::num::NonZeroU32;
use tokio::sync::Mutex;
use url::Url;

use super::browser::{BrowserDriver, DriverError, ElementSnapshot};

/// Driver tuning knobs, kept separate from the pacing policy: this is the
/// floor that protects the server, pacing is the humanlike jitter on top.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HttpBrowserConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
}

impl Default for HttpBrowserConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/120.0 Safari/537.36"
                .to_string(),
            timeout_seconds: 30,
            max_requests_per_second: 2,
        }
    }
}

#[derive(Debug)]
struct PageState {
    url: Url,
    body: String,
}

pub struct HttpBrowser {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    page: Mutex<Option<PageState>>,
    /// Field values entered since the last navigation, keyed by input name.
    pending_form: Mutex<HashMap<String, String>>,
}

impl HttpBrowser {
    pub fn new(config: &HttpBrowserConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(quota),
            page: Mutex::new(None),
            pending_form: Mutex::new(HashMap::new()),
        })
    }

    async fn request(
        &self,
        method: Method,
        url: Url,
        form: Option<&HashMap<String, String>>,
    ) -> Result<(), DriverError> {
        self.rate_limiter.until_ready().await;

        let mut builder = self.client.request(method.clone(), url.clone());
        if let Some(fields) = form {
            builder = if method == Method::GET {
                builder.query(fields)
            } else {
                builder.form(fields)
            };
        }

        let response = builder
            .send()
            .await
            .map_err(|e| request_error(url.as_str(), &e))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(DriverError::Http {
                status,
                url: url.to_string(),
            });
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| request_error(url.as_str(), &e))?;

        tracing::debug!(url = %final_url, bytes = body.len(), "page loaded");

        *self.page.lock().await = Some(PageState {
            url: final_url,
            body,
        });
        self.pending_form.lock().await.clear();
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for HttpBrowser {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let parsed = Url::parse(url).map_err(|e| DriverError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        self.request(Method::GET, parsed, None).await
    }

    async fn find_text(&self, selector: &str) -> Result<Option<String>, DriverError> {
        let page = self.page.lock().await;
        let state = page.as_ref().ok_or(DriverError::NoPage)?;
        let sel = parse_selector(selector)?;
        let doc = Html::parse_document(&state.body);
        let text = doc.select(&sel).next().map(|el| {
            let text = element_text(el);
            if text.is_empty() {
                el.value().attr("title").unwrap_or_default().to_string()
            } else {
                text
            }
        });
        Ok(text.filter(|t| !t.is_empty()))
    }

    async fn find_attr(
        &self,
        selector: &str,
        attr: &str,
    ) -> Result<Option<String>, DriverError> {
        let page = self.page.lock().await;
        let state = page.as_ref().ok_or(DriverError::NoPage)?;
        let sel = parse_selector(selector)?;
        let doc = Html::parse_document(&state.body);
        let value = doc
            .select(&sel)
            .next()
            .and_then(|el| el.value().attr(attr).map(str::to_string));
        Ok(value)
    }

    async fn find_all(
        &self,
        selector: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<ElementSnapshot>, DriverError> {
        let page = self.page.lock().await;
        let state = page.as_ref().ok_or(DriverError::NoPage)?;
        let sel = parse_selector(selector)?;
        let label_sel = label_selector.map(parse_selector).transpose()?;
        let doc = Html::parse_document(&state.body);

        let snapshots = doc
            .select(&sel)
            .map(|el| {
                let text = match &label_sel {
                    Some(label) => el.select(label).next().map(element_text).unwrap_or_default(),
                    None => element_text(el),
                };
                let href = el
                    .value()
                    .attr("href")
                    .map(|raw| resolve_href(&state.url, raw));
                ElementSnapshot { text, href }
            })
            .collect();
        Ok(snapshots)
    }

    async fn is_present(&self, selector: &str) -> Result<bool, DriverError> {
        let page = self.page.lock().await;
        let state = match page.as_ref() {
            Some(state) => state,
            None => return Ok(false),
        };
        let sel = parse_selector(selector)?;
        let doc = Html::parse_document(&state.body);
        Ok(doc.select(&sel).next().is_some())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), DriverError> {
        let field_name = {
            let page = self.page.lock().await;
            let state = page.as_ref().ok_or(DriverError::NoPage)?;
            let sel = parse_selector(selector)?;
            let doc = Html::parse_document(&state.body);
            doc.select(&sel)
                .next()
                .and_then(|el| el.value().attr("name").map(str::to_string))
                .ok_or_else(|| DriverError::Interaction {
                    selector: selector.to_string(),
                    message: "no named form field matches".to_string(),
                })?
        };
        self.pending_form
            .lock()
            .await
            .insert(field_name, value.to_string());
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        // Resolve the enclosing form and its inputs before any await so the
        // parsed document never crosses a suspension point.
        let (action, method, mut fields) = {
            let page = self.page.lock().await;
            let state = page.as_ref().ok_or(DriverError::NoPage)?;
            let sel = parse_selector(selector)?;
            let form_sel = parse_selector("form")?;
            let input_sel = parse_selector("input")?;
            let doc = Html::parse_document(&state.body);

            if doc.select(&sel).next().is_none() {
                return Err(DriverError::Interaction {
                    selector: selector.to_string(),
                    message: "no such element".to_string(),
                });
            }

            let form = doc
                .select(&form_sel)
                .find(|form| form.select(&sel).next().is_some())
                .ok_or_else(|| DriverError::Interaction {
                    selector: selector.to_string(),
                    message: "element is not inside a form".to_string(),
                })?;

            let mut fields = HashMap::new();
            for input in form.select(&input_sel) {
                if let Some(name) = input.value().attr("name") {
                    fields.insert(
                        name.to_string(),
                        input.value().attr("value").unwrap_or_default().to_string(),
                    );
                }
            }

            let action = match form.value().attr("action") {
                Some(action) if !action.is_empty() => {
                    state.url.join(action).map_err(|e| DriverError::Navigation {
                        url: action.to_string(),
                        message: e.to_string(),
                    })?
                }
                _ => state.url.clone(),
            };
            let method = match form.value().attr("method") {
                Some(m) if m.eq_ignore_ascii_case("get") => Method::GET,
                _ => Method::POST,
            };
            (action, method, fields)
        };

        // Values typed since the last navigation win over markup defaults.
        let pending = std::mem::take(&mut *self.pending_form.lock().await);
        fields.extend(pending);

        tracing::debug!(action = %action, "submitting form");
        self.request(method, action, Some(&fields)).await
    }

    async fn current_url(&self) -> Option<String> {
        self.page
            .lock()
            .await
            .as_ref()
            .map(|state| state.url.to_string())
    }
}

fn parse_selector(selector: &str) -> Result<Selector, DriverError> {
    Selector::parse(selector).map_err(|e| DriverError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{e:?}"),
    })
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn resolve_href(base: &Url, raw: &str) -> String {
    base.join(raw)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn request_error(url: &str, e: &reqwest::Error) -> DriverError {
    if e.is_timeout() {
        DriverError::Timeout {
            what: format!("request to {url}"),
        }
    } else {
        DriverError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_hrefs_resolve_against_the_page_url() {
        let base = Url::parse("https://example.com/search?q=acme").unwrap();
        assert_eq!(
            resolve_href(&base, "/organization/acme-inc"),
            "https://example.com/organization/acme-inc"
        );
        assert_eq!(
            resolve_href(&base, "https://other.example/x"),
            "https://other.example/x"
        );
    }

    #[test]
    fn invalid_selectors_are_reported_not_panicked() {
        let err = parse_selector(":::nope").unwrap_err();
        assert!(matches!(err, DriverError::InvalidSelector { .. }));
    }
}
