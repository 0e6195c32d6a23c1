//! Company Harvester - authenticated company-profile scrape orchestration.
//!
//! Layers: `domain` holds the entities and the error taxonomy, `engine` the
//! orchestration core (session, pacing, extraction, batching), and
//! `infrastructure` the concrete driver, configuration, logging and output.

pub mod domain;
pub mod engine;
pub mod infrastructure;

pub use domain::{BatchResult, BatchSummary, CompanyOutcome, CompanyRecord, ScrapeError};
pub use engine::{
    BatchRunner, CompanyPipeline, CurrencyConverter, FixedRateConverter, PacingPolicy,
    SessionManager, SiteProfile,
};
pub use infrastructure::{
    AppConfig, BrowserDriver, ConfigManager, Credentials, CsvExporter, DriverError, HttpBrowser,
};
