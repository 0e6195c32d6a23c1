//! Declarative description of the target site.
//!
//! Everything location-specific lives here as data: login selectors, search
//! selectors and the markers the liveness probe checks. Selector maintenance
//! is a data change, not a logic change.

#[derive(Debug, Clone)]
pub struct LoginSelectors {
    pub login_path: &'static str,
    pub email_field: &'static str,
    pub password_field: &'static str,
    pub submit_button: &'static str,
}

#[derive(Debug, Clone)]
pub struct SearchSelectors {
    pub search_path: &'static str,
    pub query_param: &'static str,
    /// Anchor of one search hit. Excludes the "people also viewed" sections.
    pub result_link: &'static str,
    /// Company name inside a hit anchor.
    pub result_name: &'static str,
    pub max_results: usize,
}

/// Markers the session liveness probe inspects.
#[derive(Debug, Clone)]
pub struct SessionMarkers {
    /// Substring of the current URL that means we got bounced to login.
    pub login_url_fragment: &'static str,
    /// Element only present when logged out (the login form's email input).
    pub logged_out_marker: &'static str,
}

#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub base_url: &'static str,
    pub login: LoginSelectors,
    pub search: SearchSelectors,
    pub session: SessionMarkers,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            base_url: "https://www.crunchbase.com",
            login: LoginSelectors {
                login_path: "/login",
                email_field: "input[type='email']",
                password_field: "input[type='password']",
                submit_button: "button[type='submit']",
            },
            search: SearchSelectors {
                search_path: "/textsearch",
                query_param: "q",
                result_link: "search-results-section:not(.not-initial-search-results) mat-card a",
                result_name: "span.row-name",
                max_results: 5,
            },
            session: SessionMarkers {
                login_url_fragment: "/login",
                logged_out_marker: "input[type='email']",
            },
        }
    }
}
