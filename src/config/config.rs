use crate::error::ConfigError;
use log::{info, warn};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_DASHBOARD_URL: &str = "DASHBOARD_URL";
pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_ALERTS_FILE: &str = "ALERTS_FILE";
pub const ENV_POLL_SLEEP: &str = "POLL_SLEEP";
pub const ENV_REQ_TIMEOUT: &str = "REQ_TIMEOUT";

const DEFAULT_DASHBOARD_URL: &str = "http://127.0.0.1:5000/api/wazuh";
const DEFAULT_API_KEY: &str = "CHANGE_ME";
const DEFAULT_ALERTS_FILE: &str = "/var/ossec/logs/alerts/alerts.json";
const DEFAULT_POLL_SLEEP_SECS: f64 = 0.2;
const DEFAULT_REQ_TIMEOUT_SECS: f64 = 3.0;

/// Immutable settings shared by the tailer and the forwarder
///
/// Built once at startup from defaults, an optional TOML file, an optional
/// dotenv file and the process environment, in increasing precedence.
#[derive(Clone, PartialEq)]
pub struct Config {
    /// Collector endpoint every alert is POSTed to
    pub dashboard_url: String,
    /// Sent as the `X-API-Key` header
    pub api_key: String,
    /// File to tail
    pub alerts_file: PathBuf,
    /// Wait between unsuccessful reads of the alerts file
    pub poll_sleep: Duration,
    /// Upper bound on one delivery attempt
    pub req_timeout: Duration,
}

/// On-disk TOML layout; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    dashboard_url: Option<String>,
    api_key: Option<String>,
    alerts_file: Option<PathBuf>,
    poll_sleep: Option<f64>,
    req_timeout: Option<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            alerts_file: PathBuf::from(DEFAULT_ALERTS_FILE),
            poll_sleep: Duration::from_secs_f64(DEFAULT_POLL_SLEEP_SECS),
            req_timeout: Duration::from_secs_f64(DEFAULT_REQ_TIMEOUT_SECS),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("dashboard_url", &self.dashboard_url)
            .field("api_key", &"<redacted>")
            .field("alerts_file", &self.alerts_file)
            .field("poll_sleep", &self.poll_sleep)
            .field("req_timeout", &self.req_timeout)
            .finish()
    }
}

impl Config {
    /// Load a TOML configuration file on top of the defaults
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read, and a
    /// TOML or validation error if a value cannot be parsed. The merged
    /// snapshot is checked later with [`Config::validate`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parse TOML text on top of the defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(contents)?;
        let mut config = Self::default();

        if let Some(url) = file.dashboard_url {
            config.dashboard_url = url;
        }
        if let Some(key) = file.api_key {
            config.api_key = key;
        }
        if let Some(path) = file.alerts_file {
            config.alerts_file = path;
        }
        if let Some(secs) = file.poll_sleep {
            config.poll_sleep = seconds("poll_sleep", secs)?;
        }
        if let Some(secs) = file.req_timeout {
            config.req_timeout = seconds("req_timeout", secs)?;
        }

        Ok(config)
    }

    /// Override fields from environment-style variables
    ///
    /// `lookup` maps a variable name to its value; unset variables keep the
    /// current value. Numeric values are seconds and may be fractional.
    pub fn apply_vars<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_DASHBOARD_URL) {
            self.dashboard_url = url;
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api_key = key;
        }
        if let Some(path) = lookup(ENV_ALERTS_FILE) {
            self.alerts_file = PathBuf::from(path);
        }
        if let Some(raw) = lookup(ENV_POLL_SLEEP) {
            self.poll_sleep = parse_seconds(ENV_POLL_SLEEP, &raw)?;
        }
        if let Some(raw) = lookup(ENV_REQ_TIMEOUT) {
            self.req_timeout = parse_seconds(ENV_REQ_TIMEOUT, &raw)?;
        }

        Ok(self)
    }

    /// Check that the snapshot is usable
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for a zero request timeout, an
    /// empty alerts path or a collector URL that is not http(s).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.req_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "req_timeout must be greater than zero".to_string(),
            ));
        }

        if self.alerts_file.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "alerts_file must not be empty".to_string(),
            ));
        }

        let url = reqwest::Url::parse(&self.dashboard_url).map_err(|e| {
            ConfigError::ValidationError(format!(
                "dashboard_url '{}' is not a valid URL: {}",
                self.dashboard_url, e
            ))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::ValidationError(format!(
                "dashboard_url must use http or https, got '{}'",
                url.scheme()
            )));
        }

        Ok(())
    }

    /// Log the effective settings, without the API key
    pub fn log_summary(&self) {
        info!("Collector endpoint: {}", self.dashboard_url);
        info!("Alerts file: {}", self.alerts_file.display());
        info!(
            "Poll interval: {:?}, request timeout: {:?}",
            self.poll_sleep, self.req_timeout
        );
        if self.api_key == DEFAULT_API_KEY {
            warn!("API key is still the placeholder value '{}'", DEFAULT_API_KEY);
        }
    }
}

fn parse_seconds(name: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: f64 = raw.trim().parse().map_err(|e| {
        ConfigError::ParseError(format!("{} must be a number of seconds, got '{}': {}", name, raw, e))
    })?;
    seconds(name, secs)
}

fn seconds(name: &str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        ConfigError::ValidationError(format!(
            "{} must be a finite, non-negative number of seconds, got {}",
            name, secs
        ))
    })
}
