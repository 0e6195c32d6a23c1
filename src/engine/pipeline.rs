//! Per-company pipeline: resolve, navigate, extract, retry.
//!
//! Retries happen at whole-company granularity. A recoverable failure on any
//! step restarts the company from the search, after re-checking the session
//! and waiting out a retry delay. Only `Authentication` escapes to the
//! caller; everything else ends in a terminal `CompanyOutcome`.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{
    CompanyOutcome, CompanyRecord, FieldError, RecoverableKind, ScrapeError,
};
use crate::engine::fields::{self, AbsentReason, FieldResult, PROFILE_NAME, TRACKED_FIELDS};
use crate::engine::normalize::CurrencyConverter;
use crate::engine::pacing::PacingPolicy;
use crate::engine::search;
use crate::engine::session::SessionManager;
use crate::engine::site::SiteProfile;
use crate::infrastructure::browser::BrowserDriver;

pub struct CompanyPipeline {
    driver: Arc<dyn BrowserDriver>,
    fx: Arc<dyn CurrencyConverter>,
    site: Arc<SiteProfile>,
    max_retries: u32,
}

impl CompanyPipeline {
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        fx: Arc<dyn CurrencyConverter>,
        site: Arc<SiteProfile>,
        max_retries: u32,
    ) -> Self {
        Self {
            driver,
            fx,
            site,
            max_retries,
        }
    }

    /// Process one company through to a terminal outcome. `Err` is reserved
    /// for authentication failures raised while re-establishing the session
    /// between retries.
    pub async fn process(
        &self,
        name: &str,
        session: &mut SessionManager,
        pacing: &PacingPolicy,
    ) -> Result<CompanyOutcome, ScrapeError> {
        let mut attempts: u32 = 0;

        loop {
            match self.attempt(name, session, pacing).await {
                Ok(record) => {
                    if record.is_partial() {
                        info!(
                            company = name,
                            missing = record.extraction_errors.len(),
                            "extracted with gaps"
                        );
                    } else {
                        info!(company = name, "extracted");
                    }
                    return Ok(CompanyOutcome::Scraped(record));
                }
                Err(ScrapeError::NotFound { .. }) => {
                    info!(company = name, "no acceptable match, recording as not found");
                    return Ok(CompanyOutcome::NotFound {
                        name: name.to_string(),
                    });
                }
                Err(err @ ScrapeError::Recoverable { .. }) => {
                    attempts += 1;
                    let kind = err.recoverable_kind();
                    warn!(
                        company = name,
                        attempt = attempts,
                        max = self.max_retries,
                        error = %err,
                        "attempt failed"
                    );
                    if attempts > self.max_retries {
                        return Ok(CompanyOutcome::Failed {
                            name: name.to_string(),
                            attempts,
                            error: err.to_string(),
                        });
                    }
                    if kind == Some(RecoverableKind::SessionExpired) {
                        session.mark_expired();
                    }
                    // Re-establish the session once per retry, then back off.
                    session.ensure_authenticated(self.driver.as_ref()).await?;
                    self.driver.wait(pacing.retry_delay()).await;
                }
                Err(fatal @ ScrapeError::Authentication { .. }) => return Err(fatal),
            }
        }
    }

    /// One attempt: search, open the profile, extract every tracked field.
    async fn attempt(
        &self,
        name: &str,
        session: &mut SessionManager,
        pacing: &PacingPolicy,
    ) -> Result<CompanyRecord, ScrapeError> {
        let driver = self.driver.as_ref();
        let profile_url = search::resolve_profile_url(driver, &self.site, name).await?;

        driver
            .navigate(&profile_url)
            .await
            .map_err(|e| ScrapeError::from_driver(e, format!("opening profile of '{name}'")))?;

        // A bounce to login here means the session died between companies.
        let live = session
            .probe(driver)
            .await
            .map_err(|e| ScrapeError::from_driver(e, format!("probing session for '{name}'")))?;
        if !live {
            return Err(ScrapeError::recoverable(
                RecoverableKind::SessionExpired,
                format!("opening profile of '{name}'"),
                "redirected to login",
            ));
        }

        let mut record = CompanyRecord::new(name);

        driver.wait(pacing.field_delay()).await;
        match fields::extract(driver, &PROFILE_NAME, &mut record, self.fx.as_ref()).await {
            FieldResult::Present(_) => {}
            FieldResult::Absent(reason) => {
                // The profile header is the liveness anchor: a page without
                // it is stale or half-rendered, so the whole attempt retries.
                return Err(ScrapeError::recoverable(
                    RecoverableKind::Navigation,
                    format!("reading profile header of '{name}'"),
                    reason.describe(),
                ));
            }
        }

        for descriptor in TRACKED_FIELDS {
            driver.wait(pacing.field_delay()).await;
            match fields::extract(driver, descriptor, &mut record, self.fx.as_ref()).await {
                FieldResult::Present(_) => {}
                FieldResult::Absent(AbsentReason::Timeout) => {
                    // Slow page, not a missing field. Retry the company.
                    return Err(ScrapeError::recoverable(
                        RecoverableKind::Timeout,
                        format!("reading {} of '{name}'", descriptor.name),
                        "field read timed out",
                    ));
                }
                FieldResult::Absent(reason) => {
                    record.extraction_errors.push(FieldError {
                        field: descriptor.name.to_string(),
                        reason: reason.describe(),
                    });
                }
            }
        }

        Ok(record)
    }
}
