//! Configuration loading and management.
//!
//! All pacing ranges, retry limits and driver knobs live in a JSON config
//! file created with defaults on first run. Credentials deliberately do
//! not: they come from the environment so they never land on disk.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use super::http_driver::HttpBrowserConfig;

/// Default values for every tunable.
pub mod defaults {
    pub const MIN_FIELD_DELAY_MS: u64 = 300;
    pub const MAX_FIELD_DELAY_MS: u64 = 1_200;
    pub const MIN_COMPANY_DELAY_MS: u64 = 4_000;
    pub const MAX_COMPANY_DELAY_MS: u64 = 12_000;
    pub const COOLDOWN_EVERY_N: usize = 10;
    pub const COOLDOWN_DURATION_SECS: u64 = 120;
    pub const MAX_RETRIES_PER_COMPANY: u32 = 3;
    pub const LOGIN_TIMEOUT_SECS: u64 = 180;

    pub const CSV_PATH: &str = "companies.csv";
    pub const PROGRESS_CSV_PATH: &str = "companies_progress.csv";

    pub const EMAIL_ENV: &str = "CB_EMAIL";
    pub const PASSWORD_ENV: &str = "CB_PASSWORD";
}

/// Randomized delay ranges and the cooldown cadence. Fixed delays are
/// trivially fingerprinted, so every category is a min/max pair the
/// operator can tune without code changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    pub min_field_delay_ms: u64,
    pub max_field_delay_ms: u64,
    pub min_company_delay_ms: u64,
    pub max_company_delay_ms: u64,
    /// Take a longer pause after every N companies. Zero disables cooldowns.
    pub cooldown_every_n: usize,
    pub cooldown_duration_secs: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_field_delay_ms: defaults::MIN_FIELD_DELAY_MS,
            max_field_delay_ms: defaults::MAX_FIELD_DELAY_MS,
            min_company_delay_ms: defaults::MIN_COMPANY_DELAY_MS,
            max_company_delay_ms: defaults::MAX_COMPANY_DELAY_MS,
            cooldown_every_n: defaults::COOLDOWN_EVERY_N,
            cooldown_duration_secs: defaults::COOLDOWN_DURATION_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Whole-company retries on recoverable failures before the company is
    /// recorded as failed.
    pub max_retries_per_company: u32,
    /// Upper bound on the manual-login fallback wait.
    pub login_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries_per_company: defaults::MAX_RETRIES_PER_COMPANY,
            login_timeout_secs: defaults::LOGIN_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "company_harvester=debug".
    pub level: String,
    pub log_to_file: bool,
    pub log_directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_directory: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub csv_path: PathBuf,
    /// Rewritten after every company so an aborted batch leaves a usable file.
    pub progress_csv_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from(defaults::CSV_PATH),
            progress_csv_path: PathBuf::from(defaults::PROGRESS_CSV_PATH),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pacing: PacingConfig,
    pub retry: RetryConfig,
    pub driver: HttpBrowserConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
}

/// Login credentials, read from the environment only.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn from_env() -> Option<Self> {
        let email = std::env::var(defaults::EMAIL_ENV).ok()?;
        let password = std::env::var(defaults::PASSWORD_ENV).ok()?;
        if email.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self { email, password })
    }
}

/// Loads and saves the JSON config file, creating defaults on first run.
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("company-harvester");
        Ok(config_dir)
    }

    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join("config.json");
        Ok(Self { config_path })
    }

    /// Use an explicit path instead of the platform config directory.
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Load the configuration, writing the defaults first if no file exists.
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!(path = %self.config_path.display(), "config file not found, writing defaults");
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", self.config_path.display()))?;
        info!(path = %self.config_path.display(), "loaded configuration");
        Ok(config)
    }

    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create config directory")?;
            }
        }
        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_load_writes_defaults_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("config.json"));

        let config = manager.load_config().await.unwrap();
        assert_eq!(config.pacing.cooldown_every_n, defaults::COOLDOWN_EVERY_N);
        assert!(manager.config_path.exists());

        let reloaded = manager.load_config().await.unwrap();
        assert_eq!(
            reloaded.retry.max_retries_per_company,
            config.retry.max_retries_per_company
        );
    }

    #[tokio::test]
    async fn missing_sections_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(
            &path,
            r#"{"retry":{"max_retries_per_company":7,"login_timeout_secs":10}}"#,
        )
        .await
        .unwrap();

        let config = ConfigManager::with_path(path).load_config().await.unwrap();
        assert_eq!(config.retry.max_retries_per_company, 7);
        assert_eq!(
            config.pacing.min_field_delay_ms,
            defaults::MIN_FIELD_DELAY_MS
        );
    }
}
