//! Configuration validation
//!
//! Validates critical configuration values at startup to catch misconfigurations early.

use anyhow::Result;
use yanktube_core::{Config, TimeoutTier};

/// Validate critical configuration values
///
/// Hard errors come from [`Config::validate`]; this adds the checks that only deserve a
/// warning.
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    let upstream = config.upstream();
    if upstream.timeout_for(TimeoutTier::Collection) < upstream.timeout_for(TimeoutTier::SingleItem)
    {
        tracing::warn!(
            collection_timeout_secs = upstream.collection_timeout.as_secs(),
            single_timeout_secs = upstream.single_item_timeout.as_secs(),
            "Collection timeout is shorter than the single-item timeout - playlists will time out first"
        );
    }

    if !upstream.verify_tls && config.is_production() {
        return Err(anyhow::anyhow!(
            "TLS verification towards the processing backend cannot be disabled in production"
        ));
    }

    if config.cors_origins().is_empty() {
        tracing::warn!("CORS_ORIGINS is empty - browser clients will be rejected");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;
    use yanktube_core::{BaseConfig, UpstreamConfig};

    fn config(environment: &str) -> Config {
        Config {
            base: BaseConfig {
                server_port: 8000,
                cors_origins: vec!["http://localhost:5173".to_string()],
                environment: environment.to_string(),
                http_concurrency_limit: 16,
            },
            upstream: UpstreamConfig::new(Url::parse("http://127.0.0.1:8001").unwrap()),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&config("production")).is_ok());
    }

    #[test]
    fn test_tls_cannot_be_disabled_in_production() {
        let mut cfg = config("production");
        cfg.upstream.verify_tls = false;
        assert!(validate_config(&cfg).is_err());

        let mut cfg = config("local");
        cfg.upstream.verify_tls = false;
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn test_core_validation_is_applied() {
        let mut cfg = config("development");
        cfg.base.http_concurrency_limit = 0;
        assert!(validate_config(&cfg).is_err());
    }
}
