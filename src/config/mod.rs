use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::funnel::service::FeatureAccessPolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub generation: GenerationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let generation = GenerationConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            generation,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Connection and policy settings for the generation backends.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub primary_endpoint: String,
    pub fallback_endpoint: String,
    pub compliance_endpoint: Option<String>,
    pub api_key: Option<String>,
    pub attempt_timeout: Duration,
    pub retries: u32,
    pub access: FeatureAccessPolicy,
}

impl GenerationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let primary_endpoint = env::var("GENERATION_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:8787/v1/funnels".to_string());
        let fallback_endpoint = env::var("GENERATION_FALLBACK_ENDPOINT")
            .unwrap_or_else(|_| format!("{primary_endpoint}/simple"));
        let compliance_endpoint = env::var("COMPLIANCE_ENDPOINT").ok();
        let api_key = env::var("GENERATION_API_KEY").ok();

        let attempt_timeout_ms = env::var("GENERATION_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout)?;

        let retries = env::var("GENERATION_RETRIES")
            .unwrap_or_else(|_| "2".to_string())
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidRetries)?;

        let access = match env::var("PLAN_INCLUDED_GENERATIONS") {
            Ok(raw) => FeatureAccessPolicy::Metered {
                included_generations: raw
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidPlanAllowance)?,
            },
            Err(_) => FeatureAccessPolicy::Free,
        };

        Ok(Self {
            primary_endpoint,
            fallback_endpoint,
            compliance_endpoint,
            api_key,
            attempt_timeout: Duration::from_millis(attempt_timeout_ms),
            retries,
            access,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InvalidRetries,
    InvalidPlanAllowance,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "GENERATION_TIMEOUT_MS must be a whole number of milliseconds")
            }
            ConfigError::InvalidRetries => write!(f, "GENERATION_RETRIES must be a valid u32"),
            ConfigError::InvalidPlanAllowance => {
                write!(f, "PLAN_INCLUDED_GENERATIONS must be a valid u64")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
