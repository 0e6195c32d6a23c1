//! Browser capability consumed by the orchestration core.
//!
//! The core never constructs a concrete driver; it receives this trait by
//! injection. Besides read-only page queries, the trait carries the two
//! write operations (`fill`, `click`) the login flow needs.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Failures a driver can report. All of them are transient from the
/// orchestration core's point of view; classification into the retry
/// taxonomy happens in `domain::errors`.
#[derive(Error, Debug, Clone)]
pub enum DriverError {
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("timed out waiting for {what}")]
    Timeout { what: String },

    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("no page loaded")]
    NoPage,

    #[error("cannot interact with '{selector}': {message}")]
    Interaction { selector: String, message: String },
}

/// Detached snapshot of one matched element, enough for search-result
/// triage without handing out live DOM handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    pub text: String,
    pub href: Option<String>,
}

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Load `url` and make it the current page.
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// Text content of the first element matching `selector` on the current
    /// page, `None` when nothing matches.
    async fn find_text(&self, selector: &str) -> Result<Option<String>, DriverError>;

    /// Attribute value of the first element matching `selector`.
    async fn find_attr(&self, selector: &str, attr: &str)
        -> Result<Option<String>, DriverError>;

    /// Snapshots of every element matching `selector`, in document order.
    /// When `label_selector` is given, each snapshot's text comes from the
    /// first descendant matching it instead of the whole element.
    async fn find_all(
        &self,
        selector: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<ElementSnapshot>, DriverError>;

    /// Whether at least one element matches `selector` on the current page.
    async fn is_present(&self, selector: &str) -> Result<bool, DriverError>;

    /// Enter `value` into the form field matching `selector`.
    async fn fill(&self, selector: &str, value: &str) -> Result<(), DriverError>;

    /// Activate the element matching `selector` (submit buttons included).
    async fn click(&self, selector: &str) -> Result<(), DriverError>;

    /// URL of the current page, if any page is loaded.
    async fn current_url(&self) -> Option<String>;

    /// Suspend for `duration`. Drivers backed by fakes may override this to
    /// return immediately.
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
