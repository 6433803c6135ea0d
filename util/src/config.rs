//! Application configuration.
//!
//! `AppConfig` is loaded once from `.env` and the process environment and then
//! handed to whatever needs it (database connection, grading client, batch
//! dispatcher). Nothing reads the environment after start-up.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default scoring-service timeout: ten minutes, model inference is slow.
pub const DEFAULT_ML_TIMEOUT_MS: u64 = 10 * 60 * 1000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    /// Directory that stored portfolio links (`/uploads/...`) are relative to.
    pub storage_root: String,
    pub ml_service_url: String,
    pub ml_timeout_ms: u64,
    /// Maximum number of grading calls in flight at once.
    pub grading_concurrency: usize,
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Only `DATABASE_PATH` is mandatory; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let grading_concurrency = parse_var("GRADING_CONCURRENCY", 1usize)?;
        if grading_concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "GRADING_CONCURRENCY",
                value: "0".into(),
            });
        }
        let ml_timeout_ms = parse_var("ML_TIMEOUT_MS", DEFAULT_ML_TIMEOUT_MS)?;
        if ml_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "ML_TIMEOUT_MS",
                value: "0".into(),
            });
        }

        Ok(Self {
            env: env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            project_name: env::var("PROJECT_NAME").unwrap_or_else(|_| "portfolio-grader".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "grader=info".into()),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "grader.log".into()),
            log_to_stdout: env::var("LOG_TO_STDOUT").unwrap_or_else(|_| "false".into()) == "true",
            database_path: env::var("DATABASE_PATH")
                .map_err(|_| ConfigError::Missing("DATABASE_PATH"))?,
            storage_root: env::var("STORAGE_ROOT").unwrap_or_else(|_| ".".into()),
            ml_service_url: env::var("ML_SERVICE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8000".into()),
            ml_timeout_ms,
            grading_concurrency,
        })
    }

    pub fn ml_timeout(&self) -> Duration {
        Duration::from_millis(self.ml_timeout_ms)
    }

    pub fn storage_root_path(&self) -> PathBuf {
        crate::paths::absolute_root(&self.storage_root)
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}
