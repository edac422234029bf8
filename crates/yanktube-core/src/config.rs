//! Configuration module
//!
//! Process-wide settings are read once at startup, validated, and then passed explicitly
//! to the upstream client and the HTTP layer. Nothing reads the environment per request.

use std::env;
use std::time::Duration;

use url::Url;

use crate::models::TimeoutTier;

// Common constants
const SERVER_PORT: u16 = 8000;
const UPSTREAM_BASE_URL: &str = "http://127.0.0.1:8001";
const METADATA_TIMEOUT_SECS: u64 = 30;
const SINGLE_ITEM_TIMEOUT_SECS: u64 = 300;
const COLLECTION_TIMEOUT_SECS: u64 = 600;
const CONNECT_TIMEOUT_SECS: u64 = 10;
const HTTP_CONCURRENCY_LIMIT: usize = 1024;
const CORS_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173";

/// Server-side settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub http_concurrency_limit: usize,
}

/// Settings for the processing backend
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    pub base_url: Url,
    pub metadata_timeout: Duration,
    pub single_item_timeout: Duration,
    pub collection_timeout: Duration,
    pub connect_timeout: Duration,
    /// Disabled only for local/development deployments
    pub verify_tls: bool,
}

impl UpstreamConfig {
    /// Defaults pointing at `base_url`, with certificate verification on.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            metadata_timeout: Duration::from_secs(METADATA_TIMEOUT_SECS),
            single_item_timeout: Duration::from_secs(SINGLE_ITEM_TIMEOUT_SECS),
            collection_timeout: Duration::from_secs(COLLECTION_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            verify_tls: true,
        }
    }

    /// Hard ceiling on one upstream call of the given tier.
    pub fn timeout_for(&self, tier: TimeoutTier) -> Duration {
        match tier {
            TimeoutTier::Metadata => self.metadata_timeout,
            TimeoutTier::SingleItem => self.single_item_timeout,
            TimeoutTier::Collection => self.collection_timeout,
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(anyhow::anyhow!(
                "UPSTREAM_BASE_URL must use http or https, got '{}'",
                self.base_url.scheme()
            ));
        }

        for (name, timeout) in [
            ("UPSTREAM_METADATA_TIMEOUT_SECS", self.metadata_timeout),
            ("UPSTREAM_SINGLE_TIMEOUT_SECS", self.single_item_timeout),
            ("UPSTREAM_COLLECTION_TIMEOUT_SECS", self.collection_timeout),
            ("UPSTREAM_CONNECT_TIMEOUT_SECS", self.connect_timeout),
        ] {
            if timeout.is_zero() {
                return Err(anyhow::anyhow!("{} cannot be 0", name));
            }
        }

        Ok(())
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub base: BaseConfig,
    pub upstream: UpstreamConfig,
}

/// `local` and `development` deployments relax TLS verification towards the upstream.
pub fn is_local_environment(environment: &str) -> bool {
    matches!(
        environment.to_lowercase().as_str(),
        "local" | "development" | "dev"
    )
}

fn is_production_environment(environment: &str) -> bool {
    matches!(environment.to_lowercase().as_str(), "production" | "prod")
}

fn parse_secs(name: &str, default: u64) -> Result<Duration, anyhow::Error> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| anyhow::anyhow!("{} must be a whole number of seconds", name)),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

fn parse_limit(name: &str, raw: Option<String>, default: usize) -> Result<usize, anyhow::Error> {
    match raw {
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| anyhow::anyhow!("{} must be a whole number, got '{}'", name, raw)),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "production".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| CORS_ORIGINS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            http_concurrency_limit: parse_limit(
                "HTTP_CONCURRENCY_LIMIT",
                env::var("HTTP_CONCURRENCY_LIMIT").ok(),
                HTTP_CONCURRENCY_LIMIT,
            )?,
            environment,
        };

        let raw_base_url = env::var("UPSTREAM_BASE_URL")
            .or_else(|_| env::var("FASTAPI_URL"))
            .unwrap_or_else(|_| UPSTREAM_BASE_URL.to_string());
        let base_url = Url::parse(raw_base_url.trim()).map_err(|e| {
            anyhow::anyhow!("UPSTREAM_BASE_URL '{}' is not a valid URL: {}", raw_base_url, e)
        })?;

        let upstream = UpstreamConfig {
            base_url,
            metadata_timeout: parse_secs("UPSTREAM_METADATA_TIMEOUT_SECS", METADATA_TIMEOUT_SECS)?,
            single_item_timeout: parse_secs(
                "UPSTREAM_SINGLE_TIMEOUT_SECS",
                SINGLE_ITEM_TIMEOUT_SECS,
            )?,
            collection_timeout: parse_secs(
                "UPSTREAM_COLLECTION_TIMEOUT_SECS",
                COLLECTION_TIMEOUT_SECS,
            )?,
            connect_timeout: parse_secs("UPSTREAM_CONNECT_TIMEOUT_SECS", CONNECT_TIMEOUT_SECS)?,
            verify_tls: !is_local_environment(&base.environment),
        };

        let config = Config { base, upstream };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.base.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.base.http_concurrency_limit == 0 {
            return Err(anyhow::anyhow!("HTTP_CONCURRENCY_LIMIT cannot be 0"));
        }

        self.upstream.validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_environment(&self.base.environment)
    }

    pub fn is_local(&self) -> bool {
        is_local_environment(&self.base.environment)
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.base.environment
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.base.http_concurrency_limit
    }

    pub fn upstream(&self) -> &UpstreamConfig {
        &self.upstream
    }
}
