//! Infrastructure module - drivers, configuration, logging and output.

pub mod browser;
pub mod config;
pub mod csv_export;
pub mod http_driver;
pub mod input_loader;
pub mod logging;

pub use browser::{BrowserDriver, DriverError, ElementSnapshot};
pub use config::{AppConfig, ConfigManager, Credentials, PacingConfig, RetryConfig};
pub use csv_export::CsvExporter;
pub use http_driver::{HttpBrowser, HttpBrowserConfig};
