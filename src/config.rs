//! Runtime settings: CLI flag, then environment variable, then default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::content::HttpContentFetcherBuilder;

pub const DATABASE_ENV: &str = "CLINOTES_DB";
pub const HTTP_TIMEOUT_ENV: &str = "CLINOTES_HTTP_TIMEOUT_SECS";
pub const LOG_LEVEL_ENV: &str = "CLINOTES_LOG";
pub const LOG_FILE_ENV: &str = "CLINOTES_LOG_FILE";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
    pub http_timeout: Duration,
    pub log_level: String,
    /// Append log output here instead of stderr.
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Builds a content fetcher with the configured timeout.
    pub fn fetcher_builder(&self) -> HttpContentFetcherBuilder {
        HttpContentFetcherBuilder::new().timeout(self.http_timeout)
    }
}

/// Builder for `Config`. Unset values come from the environment, then defaults.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use clinotes::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .database_path("/tmp/healthcare.db")
///     .http_timeout(Duration::from_secs(10))
///     .log_level("debug")
///     .build()
///     .expect("valid configuration");
/// assert_eq!(config.http_timeout, Duration::from_secs(10));
/// ```
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    database_path: Option<PathBuf>,
    http_timeout: Option<Duration>,
    log_level: Option<String>,
    log_file: Option<PathBuf>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Resolves every setting.
    ///
    /// Fails when no database path can be determined or when the timeout
    /// variable is not a whole number of seconds.
    pub fn build(self) -> Result<Config> {
        let database_path = match self.database_path.or_else(|| env_var(DATABASE_ENV).map(PathBuf::from)) {
            Some(path) => path,
            None => default_database_path()?,
        };

        let http_timeout = match self.http_timeout {
            Some(timeout) => timeout,
            None => match env_var(HTTP_TIMEOUT_ENV) {
                Some(raw) => Duration::from_secs(raw.trim().parse().with_context(|| {
                    format!("{HTTP_TIMEOUT_ENV} must be a number of seconds, got {raw:?}")
                })?),
                None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            },
        };

        let log_level = self
            .log_level
            .or_else(|| env_var(LOG_LEVEL_ENV))
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let log_file = self
            .log_file
            .or_else(|| env_var(LOG_FILE_ENV).map(PathBuf::from));

        Ok(Config {
            database_path,
            http_timeout,
            log_level,
            log_file,
        })
    }
}

/// Non-empty value of an environment variable.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Gets the cross-platform database path.
///
/// Returns the path as `{data_dir}/clinotes/healthcare.db` where `data_dir` is:
/// - Linux: `~/.local/share`
/// - macOS: `~/Library/Application Support`
/// - Windows: `C:\Users\<user>\AppData\Roaming`
pub fn default_database_path() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Failed to determine data directory"))?;

    Ok(data_dir.join("clinotes").join("healthcare.db"))
}

/// Ensures the parent directory of the database file exists.
pub fn ensure_database_directory(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }
    Ok(())
}
