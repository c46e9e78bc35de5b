use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while tailing the alerts file
///
/// Every variant is fatal for the process: the tailer has no recovery path
/// once the file handle stops being readable.
#[derive(Error, Debug)]
pub enum TailError {
    #[error("Failed to open alerts file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Alerts path is not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while delivering one alert to the collector
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to encode alert body: {0}")]
    Encode(String),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DeliveryError::Timeout(e.to_string())
        } else if e.is_connect() {
            DeliveryError::Connect(e.to_string())
        } else if e.is_builder() || e.is_body() {
            DeliveryError::Encode(e.to_string())
        } else {
            DeliveryError::Request(e.to_string())
        }
    }
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}
