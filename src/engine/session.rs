//! Session lifecycle: liveness probing, automatic login and the bounded
//! manual-login fallback.
//!
//! The manager owns the only state machine in the core. Everything else asks
//! it one question (`ensure_authenticated`) and reacts to one signal
//! (`mark_expired`).

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::ScrapeError;
use crate::engine::site::SiteProfile;
use crate::infrastructure::browser::{BrowserDriver, DriverError};
use crate::infrastructure::config::Credentials;

/// How often the manual-login fallback re-probes the page.
const MANUAL_LOGIN_POLL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Expired,
}

pub struct SessionManager {
    state: SessionState,
    credentials: Credentials,
    site: Arc<SiteProfile>,
    login_timeout: Duration,
    cancel: CancellationToken,
    logins_performed: u32,
}

impl SessionManager {
    pub fn new(
        credentials: Credentials,
        site: Arc<SiteProfile>,
        login_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            state: SessionState::Unauthenticated,
            credentials,
            site,
            login_timeout,
            cancel,
            logins_performed: 0,
        }
    }

    /// Start in the `Authenticated` state. Used by harnesses that stub the
    /// login flow away.
    pub fn preauthenticated(
        credentials: Credentials,
        site: Arc<SiteProfile>,
        login_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            state: SessionState::Authenticated,
            ..Self::new(credentials, site, login_timeout, cancel)
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// How many times a login flow actually ran. One re-authentication per
    /// retry attempt, never one per field.
    pub fn logins_performed(&self) -> u32 {
        self.logins_performed
    }

    /// Force the next `ensure_authenticated` to re-login.
    pub fn mark_expired(&mut self) {
        if self.state == SessionState::Authenticated {
            info!("session marked expired");
        }
        self.state = SessionState::Expired;
    }

    /// Make sure a live session exists, logging in if necessary. The only
    /// error this returns is `Authentication`, which is fatal to the batch.
    pub async fn ensure_authenticated(
        &mut self,
        driver: &dyn BrowserDriver,
    ) -> Result<(), ScrapeError> {
        if self.state == SessionState::Authenticated {
            match self.probe(driver).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "session probe failed, treating as expired");
                    self.state = SessionState::Expired;
                }
            }
        }

        self.state = SessionState::Authenticating;
        info!("logging in");

        match self.automatic_login(driver).await {
            Ok(true) => {
                self.state = SessionState::Authenticated;
                self.logins_performed += 1;
                info!("automatic login succeeded");
                return Ok(());
            }
            Ok(false) => {
                warn!("automatic login did not produce a session, waiting for manual login");
            }
            Err(e) => {
                warn!(error = %e, "automatic login failed, waiting for manual login");
            }
        }

        if self.manual_login_wait(driver).await? {
            self.state = SessionState::Authenticated;
            self.logins_performed += 1;
            info!("manual login detected");
            Ok(())
        } else {
            self.state = SessionState::Unauthenticated;
            Err(ScrapeError::authentication(format!(
                "no session after automatic login and {}s manual window",
                self.login_timeout.as_secs()
            )))
        }
    }

    /// Check whether the current session is still live. A bounce to the
    /// login URL or a visible login form means it is not; an authenticated
    /// state is downgraded to `Expired` on a negative probe.
    pub async fn probe(&mut self, driver: &dyn BrowserDriver) -> Result<bool, DriverError> {
        let bounced = driver
            .current_url()
            .await
            .map(|url| url.contains(self.site.session.login_url_fragment))
            .unwrap_or(false);
        let logged_out =
            bounced || driver.is_present(self.site.session.logged_out_marker).await?;

        if logged_out {
            if self.state == SessionState::Authenticated {
                self.state = SessionState::Expired;
            }
            return Ok(false);
        }
        Ok(true)
    }

    /// Submit the login form with the configured credentials. Returns whether
    /// a live session resulted.
    async fn automatic_login(&mut self, driver: &dyn BrowserDriver) -> Result<bool, DriverError> {
        let login_url = format!("{}{}", self.site.base_url, self.site.login.login_path);
        driver.navigate(&login_url).await?;

        driver
            .fill(self.site.login.email_field, &self.credentials.email)
            .await?;
        driver
            .fill(self.site.login.password_field, &self.credentials.password)
            .await?;
        driver.click(self.site.login.submit_button).await?;
        driver.wait(Duration::from_secs(2)).await;

        self.probe(driver).await
    }

    /// Poll for an operator-completed login until the timeout or a cancel.
    /// The batch is allowed to block here and nowhere else.
    async fn manual_login_wait(
        &mut self,
        driver: &dyn BrowserDriver,
    ) -> Result<bool, ScrapeError> {
        let deadline = tokio::time::Instant::now() + self.login_timeout;
        info!(
            timeout_secs = self.login_timeout.as_secs(),
            "waiting for manual login to complete"
        );

        loop {
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Err(ScrapeError::authentication("cancelled while waiting for login"));
                }
                _ = driver.wait(MANUAL_LOGIN_POLL) => {}
            }
            match self.probe(driver).await {
                Ok(true) => return Ok(true),
                Ok(false) => continue,
                Err(e) => {
                    warn!(error = %e, "probe failed during manual login wait");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            email: "user@example.com".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[test]
    fn starts_unauthenticated_and_expiry_is_sticky() {
        let mut session = SessionManager::new(
            credentials(),
            Arc::new(SiteProfile::default()),
            Duration::from_secs(1),
            CancellationToken::new(),
        );
        assert_eq!(session.state(), SessionState::Unauthenticated);
        session.mark_expired();
        assert_eq!(session.state(), SessionState::Expired);
        assert_eq!(session.logins_performed(), 0);
    }

    #[test]
    fn preauthenticated_skips_the_login_flow_state() {
        let session = SessionManager::preauthenticated(
            credentials(),
            Arc::new(SiteProfile::default()),
            Duration::from_secs(1),
            CancellationToken::new(),
        );
        assert_eq!(session.state(), SessionState::Authenticated);
    }
}
