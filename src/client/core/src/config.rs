//! Configuration management.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::telemetry::LoggingConfig;

/// Main client configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoyageConfig {
    /// Remote booking API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Dashboard aggregation configuration
    #[serde(default)]
    pub aggregator: AggregatorConfig,

    /// Authentication gate configuration
    #[serde(default)]
    pub gate: GateConfig,

    /// Session persistence configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Gateway base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Path prefix of the package service
    #[serde(default = "default_package_service_path")]
    pub package_service_path: String,

    /// Path prefix of the agent/customer API
    #[serde(default = "default_user_api_path")]
    pub user_api_path: String,

    /// Path prefix of the admin API
    #[serde(default = "default_admin_api_path")]
    pub admin_api_path: String,

    /// Path of the booking endpoint
    #[serde(default = "default_booking_path")]
    pub booking_path: String,

    /// Path of the login endpoint
    #[serde(default = "default_login_path")]
    pub login_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            package_service_path: default_package_service_path(),
            user_api_path: default_user_api_path(),
            admin_api_path: default_admin_api_path(),
            booking_path: default_booking_path(),
            login_path: default_login_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Upper bound for a single aggregated fetch; `None` disables the bound
    #[serde(default = "default_fetch_timeout", with = "humantime_serde")]
    pub fetch_timeout: Option<Duration>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: default_fetch_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GateConfig {
    /// Auto-cancel pending intents older than this; off when unset
    #[serde(default, with = "humantime_serde")]
    pub idle_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
    /// Session file location; defaults to `~/.voyage/session.json`
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
}

impl SessionConfig {
    /// Resolve the session file path.
    pub fn resolve_storage_path(&self) -> Option<PathBuf> {
        self.storage_path
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".voyage").join("session.json")))
    }
}

// Default value functions
fn default_base_url() -> String { "http://localhost:9999".to_string() }
fn default_request_timeout() -> Duration { Duration::from_secs(10) }
fn default_package_service_path() -> String { "/api/packages".to_string() }
fn default_user_api_path() -> String { "/user-api".to_string() }
fn default_admin_api_path() -> String { "/admin-api".to_string() }
fn default_booking_path() -> String { "/api/bookings".to_string() }
fn default_login_path() -> String { "/api/auth/login".to_string() }
fn default_fetch_timeout() -> Option<Duration> { Some(Duration::from_secs(10)) }

impl VoyageConfig {
    /// Load configuration from `.env` and `VOYAGE__*` environment variables.
    pub fn load() -> crate::Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("VOYAGE").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Load from a specific file path, with environment overrides.
    pub fn from_file(path: &str) -> crate::Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("VOYAGE").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = VoyageConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:9999");
        assert_eq!(config.api.request_timeout, Duration::from_secs(10));
        assert_eq!(config.aggregator.fetch_timeout, Some(Duration::from_secs(10)));
        assert!(config.gate.idle_timeout.is_none());
    }

    #[test]
    fn test_from_file_with_human_durations() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[api]
base_url = "https://gateway.example.com"
request_timeout = "3s"

[aggregator]
fetch_timeout = "1500ms"

[gate]
idle_timeout = "15m"
"#
        )
        .unwrap();

        let config = VoyageConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.api.base_url, "https://gateway.example.com");
        assert_eq!(config.api.request_timeout, Duration::from_secs(3));
        assert_eq!(config.api.user_api_path, "/user-api");
        assert_eq!(config.aggregator.fetch_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.gate.idle_timeout, Some(Duration::from_secs(900)));
    }

    #[test]
    fn test_explicit_storage_path() {
        let session = SessionConfig {
            storage_path: Some(PathBuf::from("/tmp/voyage-session.json")),
        };
        assert_eq!(
            session.resolve_storage_path(),
            Some(PathBuf::from("/tmp/voyage-session.json"))
        );
    }
}
