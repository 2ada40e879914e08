use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

use crate::models::RequestStatus;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_BACKEND_URL: &str = "http://localhost:3001";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PAGE_SIZE: u32 = 5;
const DEFAULT_AUTO_COMPLETE_INTERVAL_SECS: u64 = 30;
const DEFAULT_ELIGIBLE_STATUSES: &str = "Approved";
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;
const CONFIG_DIR: &str = "config";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Base URL of the JSON document backend
    #[validate(custom = "validate_backend_url")]
    pub backend_url: String,

    /// Per-request timeout for backend calls
    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1, message = "request_timeout_secs must be greater than 0"))]
    pub request_timeout_secs: u64,

    /// Application environment
    #[validate(length(min = 1))]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Rows per page in list views
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100))]
    pub page_size: u32,

    /// How often the auto-completion scheduler looks for finished runs
    #[serde(default = "default_auto_complete_interval_secs")]
    #[validate(range(min = 1))]
    pub auto_complete_interval_secs: u64,

    /// Comma-separated request statuses a run may be started from
    #[serde(default = "default_eligible_statuses")]
    #[validate(custom = "validate_eligible_statuses")]
    pub sterilization_eligible_statuses: String,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            environment: DEFAULT_ENV.to_string(),
            log_level: default_log_level(),
            log_json: false,
            page_size: DEFAULT_PAGE_SIZE,
            auto_complete_interval_secs: DEFAULT_AUTO_COMPLETE_INTERVAL_SECS,
            sterilization_eligible_statuses: default_eligible_statuses(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Request statuses from which sterilization may start, in config order.
    pub fn eligible_statuses(&self) -> Vec<RequestStatus> {
        parse_status_list(&self.sterilization_eligible_statuses).unwrap_or_else(|_| {
            vec![RequestStatus::Approved]
        })
    }

    pub fn auto_complete_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.auto_complete_interval_secs)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}
fn default_auto_complete_interval_secs() -> u64 {
    DEFAULT_AUTO_COMPLETE_INTERVAL_SECS
}
fn default_eligible_statuses() -> String {
    DEFAULT_ELIGIBLE_STATUSES.to_string()
}
fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}

fn parse_status_list(raw: &str) -> Result<Vec<RequestStatus>, crate::errors::ServiceError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(RequestStatus::parse)
        .collect()
}

fn validate_backend_url(value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
        _ => {
            let mut err = ValidationError::new("backend_url");
            err.message = Some("Must be an http:// or https:// URL".into());
            Err(err)
        }
    }
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_eligible_statuses(value: &str) -> Result<(), ValidationError> {
    match parse_status_list(value) {
        Ok(statuses) if statuses.is_empty() => {
            let mut err = ValidationError::new("sterilization_eligible_statuses");
            err.message = Some("At least one request status is required".into());
            Err(err)
        }
        Ok(statuses) => match statuses.iter().find(|s| !s.can_start_sterilization()) {
            None => Ok(()),
            Some(status) => {
                let mut err = ValidationError::new("sterilization_eligible_statuses");
                err.message = Some(format!("'{}' cannot move to In Progress", status).into());
                Err(err)
            }
        },
        Err(e) => {
            let mut err = ValidationError::new("sterilization_eligible_statuses");
            err.message = Some(e.to_string().into());
            Err(err)
        }
    }
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("event_channel_capacity");
        err.message = Some("event_channel_capacity must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("cssd_api={}", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    load_config_from(Path::new(CONFIG_DIR), &run_env, None)
}

/// Same layering as [`load_config`] with an explicit config directory.
/// `env_vars` replaces the process environment when given.
pub fn load_config_from(
    dir: &Path,
    run_env: &str,
    env_vars: Option<HashMap<String, String>>,
) -> Result<AppConfig, AppConfigError> {
    info!("Loading configuration for environment: {}", run_env);

    if !dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            dir.display()
        );
    }

    let config = Config::builder()
        .set_default("backend_url", DEFAULT_BACKEND_URL)?
        .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS)?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(dir.join("default")).required(false))
        .add_source(File::from(dir.join(run_env)).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .separator("__")
                .source(env_vars),
        )
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File as StdFile};
    use std::io::Write;
    use tempfile::TempDir;

    fn setup_test_config(content: &str, filename: &str) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join(filename);
        let mut file = StdFile::create(file_path).unwrap();
        writeln!(file, "{}", content).unwrap();
        temp_dir
    }

    fn no_env() -> Option<HashMap<String, String>> {
        Some(HashMap::new())
    }

    #[test]
    fn defaults_apply_without_files() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(dir.path(), "development", no_env()).unwrap();
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.page_size, 5);
        assert_eq!(config.auto_complete_interval_secs, 30);
        assert_eq!(config.eligible_statuses(), vec![RequestStatus::Approved]);
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn environment_file_overrides_default_file() {
        let dir = setup_test_config(
            r#"
            backend_url = "http://backend.local:3001"
            page_size = 10
            "#,
            "default.toml",
        );
        fs::write(
            dir.path().join("production.toml"),
            "page_size = 20\nenvironment = \"production\"\n",
        )
        .unwrap();

        let config = load_config_from(dir.path(), "production", no_env()).unwrap();
        assert_eq!(config.backend_url, "http://backend.local:3001");
        assert_eq!(config.page_size, 20);
        assert!(config.is_production());
    }

    #[test]
    fn env_vars_win() {
        let dir = setup_test_config("page_size = 10", "default.toml");
        let vars = HashMap::from([
            ("APP__PAGE_SIZE".to_string(), "25".to_string()),
            (
                "APP__STERILIZATION_ELIGIBLE_STATUSES".to_string(),
                " APPROVED ".to_string(),
            ),
        ]);
        let config = load_config_from(dir.path(), "development", Some(vars)).unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.eligible_statuses(), vec![RequestStatus::Approved]);
    }

    #[rstest::rstest]
    #[case("Approved, Completed")]
    #[case("Requested")]
    #[case("Rejected")]
    #[case("In Progress")]
    fn statuses_without_a_move_to_in_progress_are_rejected(#[case] statuses: &str) {
        let dir = setup_test_config(
            &format!("sterilization_eligible_statuses = \"{}\"", statuses),
            "default.toml",
        );

        match load_config_from(dir.path(), "development", no_env()) {
            Err(AppConfigError::Validation(errors)) => {
                assert!(errors
                    .field_errors()
                    .contains_key("sterilization_eligible_statuses"));
            }
            other => panic!("expected a validation error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_validation_failure() {
        let dir = setup_test_config(
            r#"
            backend_url = "ftp://files.local"
            page_size = 0
            request_timeout_secs = 0
            log_level = "loud"
            sterilization_eligible_statuses = "Shipped"
            "#,
            "default.toml",
        );

        let result = load_config_from(dir.path(), "development", no_env());
        assert!(matches!(result, Err(AppConfigError::Validation(_))));

        if let Err(AppConfigError::Validation(errors)) = result {
            let fields = errors.field_errors();
            assert!(fields.contains_key("backend_url"));
            assert!(fields.contains_key("page_size"));
            assert!(fields.contains_key("request_timeout_secs"));
            assert!(fields.contains_key("log_level"));
            assert!(fields.contains_key("sterilization_eligible_statuses"));
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = setup_test_config("database_url = \"sqlite://x\"", "default.toml");
        assert!(matches!(
            load_config_from(dir.path(), "development", no_env()),
            Err(AppConfigError::Load(_))
        ));
    }
}
