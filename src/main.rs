//! Binary entry point: wire configuration, driver and engine, run one batch.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use company_harvester::engine::{
    BatchRunner, CompanyPipeline, FixedRateConverter, PacingPolicy, SessionManager, SiteProfile,
};
use company_harvester::infrastructure::{
    config::{defaults, ConfigManager, Credentials},
    input_loader,
    logging::init_logging,
    CsvExporter, HttpBrowser,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_manager = ConfigManager::new()?;
    let config = config_manager.load_config().await?;
    init_logging(&config.logging)?;

    let credentials = Credentials::from_env().with_context(|| {
        format!(
            "credentials missing: set {} and {}",
            defaults::EMAIL_ENV,
            defaults::PASSWORD_ENV
        )
    })?;

    let list_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("company_list.txt"));
    let names = input_loader::read_company_list(&list_path).await?;
    if names.is_empty() {
        bail!("no company names in {}", list_path.display());
    }
    info!(companies = names.len(), list = %list_path.display(), "input loaded");

    let site = Arc::new(SiteProfile::default());
    let driver = Arc::new(HttpBrowser::new(&config.driver)?);
    let fx = Arc::new(FixedRateConverter::default());

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing the current company then stopping");
            cancel_on_signal.cancel();
        }
    });

    let session = SessionManager::new(
        credentials,
        Arc::clone(&site),
        Duration::from_secs(config.retry.login_timeout_secs),
        cancel.clone(),
    );
    let pipeline = CompanyPipeline::new(
        driver.clone(),
        fx,
        Arc::clone(&site),
        config.retry.max_retries_per_company,
    );
    let pacing = PacingPolicy::new(config.pacing.clone());

    let progress = CsvExporter::new(&config.output.progress_csv_path);
    let mut runner = BatchRunner::new(pipeline, session, pacing, driver, cancel)
        .with_progress_sink(Box::new(progress));

    let result = runner.run(&names).await;

    let exporter = CsvExporter::new(&config.output.csv_path);
    let written = exporter.write_all(&result.outcomes)?;
    info!(rows = written, path = %config.output.csv_path.display(), "results written");

    let summary = result.summary();
    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        partial = summary.partial,
        failed = summary.failed,
        not_found = summary.not_found,
        "done"
    );

    if let Some(fatal) = result.fatal_error {
        bail!("batch stopped early: {fatal}");
    }
    Ok(())
}
