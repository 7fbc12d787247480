//! Configuration management for the DocPortal client
//!
//! This module handles loading and validating configuration from environment
//! variables, with support for different environments (development, staging,
//! production).

use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Application environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Get the environment name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the portal REST backend
    pub api_base_url: String,

    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Storage key under which the access token is persisted
    pub access_token_key: String,

    /// Storage key under which the refresh token is persisted
    pub refresh_token_key: String,

    /// Path of the persistent token file, if any
    pub token_file: Option<PathBuf>,

    /// Current environment
    pub environment: Environment,

    /// Log level (RUST_LOG)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let environment = env::var("PORTAL_ENV")
            .map(|s| Environment::from_str(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let api_base_url = env::var("PORTAL_API_BASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("PORTAL_API_BASE_URL".to_string()))?;

        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidBaseUrl(api_base_url));
        }

        let request_timeout_ms = env::var("PORTAL_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".to_string())
            .parse::<u64>()
            .unwrap_or(30000);

        let access_token_key =
            env::var("PORTAL_ACCESS_TOKEN_KEY").unwrap_or_else(|_| "access_token".to_string());

        let refresh_token_key =
            env::var("PORTAL_REFRESH_TOKEN_KEY").unwrap_or_else(|_| "refresh_token".to_string());

        let token_file = env::var("PORTAL_TOKEN_FILE").ok().map(PathBuf::from);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Config {
            api_base_url,
            request_timeout_ms,
            access_token_key,
            refresh_token_key,
            token_file,
            environment,
            log_level,
        })
    }

    /// Build a configuration for a given backend URL with defaults everywhere
    /// else. Used by tests and embedding applications that configure in code.
    pub fn for_base_url(api_base_url: impl Into<String>) -> Self {
        Config {
            api_base_url: api_base_url.into(),
            request_timeout_ms: 30000,
            access_token_key: "access_token".to_string(),
            refresh_token_key: "refresh_token".to_string(),
            token_file: None,
            environment: Environment::Development,
            log_level: "info".to_string(),
        }
    }

    /// Join an endpoint path onto the configured base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Initialize tracing for an embedding application.
///
/// Honors `RUST_LOG` when set, falling back to the configured level.
pub fn init_tracing(config: &Config) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();
}
