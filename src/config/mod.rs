/// Configuration management
pub mod config;
pub mod dotenv;

pub use config::Config;
pub use dotenv::DotEnv;

use crate::error::ConfigError;
use log::{info, warn};
use std::path::Path;

/// Build the startup configuration snapshot
///
/// Layers, lowest precedence first: built-in defaults, the optional TOML
/// file, the dotenv file, then the process environment. A missing TOML file
/// falls back to defaults with a warning; an invalid one is an error.
///
/// The result is not validated: command-line overrides still apply on top of
/// it, so callers run `Config::validate` once everything is merged.
pub fn load(config_path: Option<&Path>, env_file: &Path) -> Result<Config, ConfigError> {
    let base = match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            match Config::from_file(path) {
                Ok(config) => config,
                Err(ConfigError::ReadError(e)) => {
                    warn!("Configuration file not found or unreadable ({}), using defaults", e);
                    Config::default()
                }
                Err(e) => return Err(e),
            }
        }
        None => Config::default(),
    };

    let dotenv = DotEnv::load(env_file)?;
    resolve(base, &dotenv, |key| std::env::var(key).ok())
}

/// Apply dotenv and environment variables on top of `base`
///
/// A variable present in the environment always wins over the same key in
/// the dotenv file. Only unparseable numbers are rejected here.
pub fn resolve<F>(base: Config, dotenv: &DotEnv, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    base.apply_vars(|key| env(key).or_else(|| dotenv.get(key).map(str::to_string)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    #[test]
    fn test_environment_wins_over_dotenv() {
        let dotenv = DotEnv::parse("API_KEY=from-dotenv\nPOLL_SLEEP=1\n").unwrap();
        let config = resolve(Config::default(), &dotenv, |key| {
            (key == "API_KEY").then(|| "from-env".to_string())
        })
        .unwrap();

        assert_eq!(config.api_key, "from-env");
        assert_eq!(config.poll_sleep, Duration::from_secs(1));
    }

    #[test]
    fn test_dotenv_wins_over_toml() {
        let base = Config::from_toml_str("api_key = \"from-toml\"\nreq_timeout = 7\n").unwrap();
        let dotenv = DotEnv::parse("API_KEY=from-dotenv\n").unwrap();
        let config = resolve(base, &dotenv, |_| None).unwrap();

        assert_eq!(config.api_key, "from-dotenv");
        assert_eq!(config.req_timeout, Duration::from_secs(7));
    }

    #[test]
    fn test_resolve_leaves_validation_to_caller() {
        let dotenv = DotEnv::parse("DASHBOARD_URL=nowhere\n").unwrap();
        let config = resolve(Config::default(), &dotenv, |_| None).unwrap();

        assert_eq!(config.dashboard_url, "nowhere");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_resolve_rejects_unparseable_numbers() {
        let dotenv = DotEnv::parse("REQ_TIMEOUT=soon\n").unwrap();
        let result = resolve(Config::default(), &dotenv, |_| None);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_missing_toml_falls_back_to_defaults() {
        let config = load(
            Some(Path::new("/nonexistent/alertpush.toml")),
            Path::new("/nonexistent/.env"),
        );
        assert!(config.is_ok());
    }

    #[test]
    fn test_load_invalid_toml_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "poll_sleep = \"soon\"").unwrap();
        file.flush().unwrap();

        let result = load(Some(file.path()), Path::new("/nonexistent/.env"));
        assert!(result.is_err());
    }
}
