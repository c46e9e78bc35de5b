use alertpush::collectors::FileTailer;
use alertpush::config::{self, Config};
use alertpush::forward::Forwarder;
use alertpush::AlertPump;
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::atomic::Ordering;

/// Command-line arguments for the alert forwarder
#[derive(Parser)]
#[command(
    name = "alertpush",
    about = "Tail a JSON-lines alerts file and POST each new line to a collector",
    long_about = "Follows a continuously appended JSON-lines file (such as Wazuh's alerts.json) \
                  from its current end and forwards every new line as one HTTP POST. Settings \
                  come from DASHBOARD_URL, API_KEY, ALERTS_FILE, POLL_SLEEP and REQ_TIMEOUT, \
                  optionally defaulted from a .env file and a TOML file."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Path to a KEY=VALUE file with default environment values
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "dotenv file path (defaults to .env next to the executable)"
    )]
    env_file: Option<PathBuf>,

    /// Alerts file to tail, overriding ALERTS_FILE
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Collector endpoint, overriding DASHBOARD_URL
    #[arg(short, long, value_name = "URL")]
    url: Option<String>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults in config::load
            if config_path.exists() {
                if !config_path.is_file() {
                    return Err(format!(
                        "Configuration path is not a file: {}",
                        config_path.display()
                    ));
                }

                if let Some(extension) = config_path.extension() {
                    if extension != "toml" {
                        warn!(
                            "Configuration file does not have .toml extension: {}",
                            config_path.display()
                        );
                    }
                }
            }
        }

        if let Some(ref env_file) = self.env_file {
            if env_file.is_dir() {
                return Err(format!("dotenv path is a directory: {}", env_file.display()));
            }
        }

        Ok(())
    }

    /// Resolve the dotenv location
    fn env_file_path(&self) -> PathBuf {
        if let Some(ref path) = self.env_file {
            return path.clone();
        }

        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(".env")))
            .unwrap_or_else(|| PathBuf::from(".env"))
    }

    /// Apply command-line overrides, which take precedence over every other layer
    fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(ref file) = self.file {
            config.alerts_file = file.clone();
        }
        if let Some(ref url) = self.url {
            config.dashboard_url = url.clone();
        }
        config
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting alertpush");

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let config = match config::load(cli.config.as_deref(), &cli.env_file_path()) {
        Ok(config) => cli.apply_overrides(config),
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }
    config.log_summary();

    let forwarder = match Forwarder::from_config(&config) {
        Ok(forwarder) => forwarder,
        Err(e) => {
            error!("Failed to initialize forwarder: {}", e);
            std::process::exit(1);
        }
    };

    let tailer = match FileTailer::open(&config.alerts_file, config.poll_sleep) {
        Ok(tailer) => tailer,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let mut pump = AlertPump::new(tailer, forwarder);

    let running = pump.running_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received interrupt signal, stopping after the current alert...");
        running.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to install interrupt handler: {}", e);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    match runtime.block_on(pump.run()) {
        Ok(summary) => {
            info!(
                "alertpush stopped: {} lines, {} delivered, {} non-2xx, {} invalid JSON, {} failed",
                summary.lines,
                summary.delivered,
                summary.non_success,
                summary.parse_errors,
                summary.failed
            );
        }
        Err(e) => {
            error!("Stopped reading alerts file: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli() -> Cli {
        Cli {
            config: None,
            env_file: None,
            file: None,
            url: None,
            verbose: false,
        }
    }

    #[test]
    fn test_cli_validation_with_existing_file() {
        let temp_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();

        let cli = Cli {
            config: Some(temp_file.path().to_path_buf()),
            ..cli()
        };

        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_cli_validation_with_missing_file() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/config.toml")),
            ..cli()
        };

        // Missing files are handled by falling back to defaults
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_cli_validation_with_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli {
            config: Some(dir.path().to_path_buf()),
            ..cli()
        };
        assert!(cli.validate().is_err());

        let cli = Cli {
            env_file: Some(dir.path().to_path_buf()),
            ..self::cli()
        };
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_env_file_path_explicit() {
        let cli = Cli {
            env_file: Some(PathBuf::from("/etc/alertpush/.env")),
            ..cli()
        };
        assert_eq!(cli.env_file_path(), PathBuf::from("/etc/alertpush/.env"));
    }

    #[test]
    fn test_env_file_path_defaults_to_dotenv() {
        assert!(cli().env_file_path().ends_with(".env"));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let cli = Cli {
            file: Some(PathBuf::from("/tmp/alerts.json")),
            url: Some("http://10.0.0.9/api/wazuh".to_string()),
            ..cli()
        };

        let config = cli.apply_overrides(Config::default());
        assert_eq!(config.alerts_file, PathBuf::from("/tmp/alerts.json"));
        assert_eq!(config.dashboard_url, "http://10.0.0.9/api/wazuh");
        assert_eq!(config.api_key, Config::default().api_key);
    }

    #[test]
    fn test_url_flag_replaces_invalid_environment_url() {
        let dotenv = config::DotEnv::parse("DASHBOARD_URL=nowhere\nALERTS_FILE=\n").unwrap();
        let merged = config::resolve(Config::default(), &dotenv, |_| None).unwrap();
        assert!(merged.validate().is_err());

        let cli = Cli {
            file: Some(PathBuf::from("/tmp/alerts.json")),
            url: Some("http://10.0.0.9/api/wazuh".to_string()),
            ..cli()
        };
        let config = cli.apply_overrides(merged);

        assert!(config.validate().is_ok());
        assert_eq!(config.dashboard_url, "http://10.0.0.9/api/wazuh");
    }
}
