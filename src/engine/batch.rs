//! Batch runner: drives the pipeline over an input list in order.
//!
//! Invariants it owns: one outcome per input, in input order; the batch
//! stops early only for an authentication failure or an operator abort, and
//! both preserve the outcomes gathered so far.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::domain::{BatchResult, CompanyOutcome};
use crate::engine::pacing::PacingPolicy;
use crate::engine::pipeline::CompanyPipeline;
use crate::engine::session::SessionManager;
use crate::infrastructure::browser::BrowserDriver;

/// Receives the outcomes gathered so far after every company, so an
/// interrupted run still leaves usable output behind.
pub trait ProgressSink: Send + Sync {
    fn save(&self, outcomes: &[CompanyOutcome]) -> anyhow::Result<()>;
}

pub struct BatchRunner {
    pipeline: CompanyPipeline,
    session: SessionManager,
    pacing: PacingPolicy,
    driver: Arc<dyn BrowserDriver>,
    cancel: CancellationToken,
    progress: Option<Box<dyn ProgressSink>>,
}

impl BatchRunner {
    pub fn new(
        pipeline: CompanyPipeline,
        session: SessionManager,
        pacing: PacingPolicy,
        driver: Arc<dyn BrowserDriver>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            pipeline,
            session,
            pacing,
            driver,
            cancel,
            progress: None,
        }
    }

    pub fn with_progress_sink(mut self, sink: Box<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Run the whole batch. Always returns a `BatchResult`; fatal conditions
    /// are recorded on it rather than thrown.
    pub async fn run(&mut self, names: &[String]) -> BatchResult {
        let mut result = BatchResult::new();
        info!(batch_id = %result.batch_id, companies = names.len(), "batch started");

        for (index, name) in names.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(processed = result.outcomes.len(), "batch aborted by operator");
                result.aborted = true;
                break;
            }

            if let Err(e) = self.session.ensure_authenticated(self.driver.as_ref()).await {
                error!(error = %e, "authentication failed, stopping batch");
                result.fatal_error = Some(e.to_string());
                break;
            }

            match self.pipeline.process(name, &mut self.session, &self.pacing).await {
                Ok(outcome) => {
                    result.push(outcome);
                    self.save_progress(&result);
                }
                Err(e) => {
                    error!(company = %name, error = %e, "fatal error, stopping batch");
                    result.fatal_error = Some(e.to_string());
                    break;
                }
            }

            let processed = index + 1;
            if processed < names.len() {
                if self.pacing.should_cooldown(processed) {
                    let cooldown = self.pacing.cooldown();
                    info!(processed, secs = cooldown.as_secs(), "cooldown");
                    if !self.sleep_cancellable(cooldown).await {
                        result.aborted = true;
                        break;
                    }
                }
                if !self.sleep_cancellable(self.pacing.company_delay()).await {
                    result.aborted = true;
                    break;
                }
            }
        }

        result.finish();
        let summary = result.summary();
        info!(
            batch_id = %result.batch_id,
            total = summary.total,
            succeeded = summary.succeeded,
            partial = summary.partial,
            failed = summary.failed,
            not_found = summary.not_found,
            aborted = result.aborted,
            "batch finished"
        );
        result
    }

    fn save_progress(&self, result: &BatchResult) {
        if let Some(sink) = &self.progress {
            if let Err(e) = sink.save(&result.outcomes) {
                warn!(error = %e, "progress save failed");
            }
        }
    }

    /// Sleep that an abort interrupts. Returns false when cancelled.
    async fn sleep_cancellable(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = self.driver.wait(duration) => true,
        }
    }
}
