//! Configuration management for chatrelay
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables (optionally seeded from a local `.env` file). The
//! API key only ever comes from the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Environment variable holding the completion API key (required)
pub const API_KEY_ENV: &str = "MCP_API_KEY";
/// Environment variable overriding the listening port
pub const PORT_ENV: &str = "PORT";

/// Upper bound for the outbound request timeout
const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Default inbound body limit (64 MiB)
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 64 * 1024 * 1024;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served at `/` for everything that is not an API route
    pub static_dir: PathBuf,
    /// Largest accepted request body; the full history is resent every turn
    pub max_request_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            static_dir: PathBuf::from("public"),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }
}

/// Remote completion API settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    #[serde(skip)]
    api_key: ApiKey,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.mcp.ai/chat/completions".to_string(),
            model: "gpt-4".to_string(),
            max_tokens: 1000,
            timeout_seconds: 30,
            api_key: ApiKey::default(),
        }
    }
}

impl UpstreamConfig {
    /// Get the API key used for bearer authorization
    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    /// Get the outbound request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Bearer credential for the completion API
///
/// `Debug` is redacted so the key never ends up in logs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Raw key, for building the Authorization header only
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            f.write_str("ApiKey(<unset>)")
        } else {
            f.write_str("ApiKey(<redacted>)")
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Outcome of looking for a local `.env` file
#[derive(Debug)]
pub enum DotenvStatus {
    Loaded(PathBuf),
    NotFound,
}

/// Load a `.env` file from the working directory (or a parent) if one exists
///
/// A missing file is not an error. A file that exists but cannot be parsed is.
pub fn load_dotenv() -> AppResult<DotenvStatus> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(DotenvStatus::Loaded(path)),
        Err(e) if e.not_found() => Ok(DotenvStatus::NotFound),
        Err(e) => Err(AppError::Config(format!("Failed to load .env file: {}", e))),
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Only file-level settings are validated here; the API key is applied
    /// afterwards from the environment.
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        config
            .validate_settings()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Build the complete runtime configuration
    ///
    /// Reads the optional config file, applies environment overrides through
    /// `lookup`, then validates the result. `main` passes a lookup backed by
    /// `std::env::var`; tests pass a closure over a fixed map.
    pub fn load<F>(path: Option<&Path>, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `MCP_API_KEY` and `PORT` from the environment
    pub fn apply_env<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV) {
            self.upstream.api_key = ApiKey::new(key);
        }

        if let Some(port) = lookup(PORT_ENV).filter(|p| !p.trim().is_empty()) {
            self.server.port = port.trim().parse().map_err(|e| {
                AppError::Config(format!(
                    "{} must be a valid port number, got '{}': {}",
                    PORT_ENV, port, e
                ))
            })?;
        }

        Ok(())
    }

    /// Replace the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.upstream.api_key = ApiKey::new(key);
        self
    }

    /// Validate the full configuration, including the API key
    pub fn validate(&self) -> AppResult<()> {
        if self.upstream.api_key.is_blank() {
            return Err(AppError::Config(format!(
                "{} environment variable is required",
                API_KEY_ENV
            )));
        }
        self.validate_settings()
    }

    /// Validate everything that can come from the config file
    fn validate_settings(&self) -> AppResult<()> {
        if self.server.max_request_bytes == 0 {
            return Err(AppError::Config(
                "server.max_request_bytes must be greater than 0".to_string(),
            ));
        }

        let upstream = &self.upstream;

        if !upstream.endpoint.starts_with("http://") && !upstream.endpoint.starts_with("https://")
        {
            return Err(AppError::Config(format!(
                "upstream.endpoint '{}' must start with 'http://' or 'https://'",
                upstream.endpoint
            )));
        }

        if upstream.model.trim().is_empty() {
            return Err(AppError::Config(
                "upstream.model cannot be empty".to_string(),
            ));
        }

        if upstream.max_tokens == 0 {
            return Err(AppError::Config(
                "upstream.max_tokens must be greater than 0".to_string(),
            ));
        }

        if upstream.timeout_seconds == 0 {
            return Err(AppError::Config(
                "upstream.timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if upstream.timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(AppError::Config(format!(
                "upstream.timeout_seconds cannot exceed {} seconds, got {}",
                MAX_TIMEOUT_SECONDS, upstream.timeout_seconds
            )));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate_settings()?;
        Ok(config)
    }
}
