//! Configuration loading
//!
//! Sources, lowest priority first:
//! 1. embedded `config/default.toml`
//! 2. `config/{ERNI_ENV}.toml` and `config/local.toml`, when present
//! 3. `ERNI_*` environment variables, e.g. `ERNI_GUARDRAILS__CACHE_SIZE=500`

use super::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Deployment name from `ERNI_ENV`
pub fn environment_name() -> String {
    std::env::var("ERNI_ENV").unwrap_or_else(|_| "development".to_string())
}

/// Load configuration from files and environment
pub fn load_config() -> Result<AppConfig> {
    let environment = environment_name();
    let config = Config::builder()
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        .add_source(File::with_name(&format!("config/{environment}")).required(false))
        .add_source(File::with_name("config/local").required(false))
        .set_default("server.environment", environment)
        .context("Failed to set environment default")?
        // ERNI_STORE__BACKEND, not ERNI__STORE__BACKEND
        .add_source(
            Environment::with_prefix("ERNI")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults_parse() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.guardrails.cache_ttl_secs, 3600);
        assert_eq!(config.replication.context_ttl_secs, 86400);
        assert!(config.replication.redis_url.is_none());
    }
}
