//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::RealIpConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::retrieval::Strategy;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RealIpConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<RealIpConfig, ConfigError> {
    let config: RealIpConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    let retriever = &config.retriever;
    if retriever.strategy == Strategy::ProxyCount {
        if let Some(count) = retriever.proxy_count.filter(|count| *count <= 0) {
            tracing::warn!(
                proxy_count = count,
                "Non-positive proxy_count: no client address will ever be resolved"
            );
        }
    }

    Ok(config)
}
