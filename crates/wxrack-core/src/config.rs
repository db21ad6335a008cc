use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;
use wxrack_weather::provider::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT};
use wxrack_weather::{Site, DEFAULT_FETCH_INTERVAL};

use crate::error::ConfigError;

/// Environment variable that overrides `provider.api_key`.
pub const API_KEY_ENV: &str = "WXRACK_API_KEY";

const PLACEHOLDER_API_KEY: &str = "YOUR_OPENWEATHER_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Weather provider endpoint and credential
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Fetch cycle settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Snapshot persistence settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Sites to fetch weather for
    #[serde(default)]
    pub sites: Vec<Site>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the OpenWeather API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key (`WXRACK_API_KEY` takes precedence when set)
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_key() -> String {
    PLACEHOLDER_API_KEY.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: default_api_key(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    /// Check if the API key is set (not empty or the placeholder)
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty() && self.api_key != PLACEHOLDER_API_KEY
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Milliseconds between fetch cycles (default: 15 minutes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
}

impl FetchConfig {
    pub fn interval(&self) -> Duration {
        self.interval_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_FETCH_INTERVAL)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file for the snapshot cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn effective_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| default_config_dir().join("openweather.db"))
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wxrack")
}

impl Config {
    /// Load configuration.
    ///
    /// With an explicit path the file must exist. Without one the default
    /// location is used and a default config is written there if missing.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) if !p.exists() => {
                return Err(ConfigError::NotFound(p.display().to_string()));
            }
            Some(p) => p.to_path_buf(),
            None => Self::default_path(),
        };

        if !config_path.exists() {
            let config = Self::default();
            config.save(&config_path)?;
            tracing::info!("Wrote default config to {}", config_path.display());
            return Ok(config.with_env_overrides());
        }

        let contents = std::fs::read_to_string(&config_path)?;
        Ok(Self::from_toml_str(&contents)?.with_env_overrides())
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult), ConfigError> {
        let config = Self::load(path)?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.provider.api_key = key;
            }
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        validate_url(&self.provider.base_url, "provider.base_url", &mut result);

        if !self.provider.has_api_key() {
            result.add_warning(
                "provider.api_key",
                "API key not configured - every fetch will fail",
            );
        }

        if self.provider.request_timeout_secs == 0 {
            result.add_error(
                "provider.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        }

        if self.fetch.interval_ms == Some(0) {
            result.add_error("fetch.interval_ms", "Fetch interval must be greater than 0");
        }

        if self.sites.is_empty() {
            result.add_warning("sites", "No sites configured - nothing will be fetched");
        }

        let mut seen = HashSet::new();
        for (i, site) in self.sites.iter().enumerate() {
            let field = format!("sites[{}]", i);

            if site.name.trim().is_empty() {
                result.add_error(format!("{}.name", field), "Site name must not be empty");
            } else if !seen.insert(site.name.as_str()) {
                result.add_error(
                    format!("{}.name", field),
                    format!("Duplicate site name: {}", site.name),
                );
            }

            if !(-90.0..=90.0).contains(&site.lat) {
                result.add_error(
                    format!("{}.lat", field),
                    format!("Latitude out of range: {}", site.lat),
                );
            }
            if !(-180.0..=180.0).contains(&site.lon) {
                result.add_error(
                    format!("{}.lon", field),
                    format!("Longitude out of range: {}", site.lon),
                );
            }
        }

        result
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Default configuration file location
    pub fn default_path() -> PathBuf {
        default_config_dir().join("config.toml")
    }
}

fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }

            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}
