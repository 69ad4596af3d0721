//! Structured logging.
//!
//! `RUST_LOG` takes precedence; otherwise the configured level applies to
//! this crate and `tower_http`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Build the filter used when `RUST_LOG` is not set.
pub fn default_filter(config: &ObservabilityConfig) -> EnvFilter {
    let level = config.log_level.trim().to_ascii_lowercase();
    EnvFilter::try_new(format!("real_ip={level},tower_http={level}"))
        .unwrap_or_else(|_| EnvFilter::new("real_ip=info,tower_http=info"))
}

/// Install the global subscriber. Call once, at startup.
pub fn init_logging(config: &ObservabilityConfig) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(config)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        let mut config = ObservabilityConfig::default();
        config.log_level = "DEBUG".to_string();
        let rendered = default_filter(&config).to_string();
        assert!(rendered.contains("real_ip=debug"), "{}", rendered);
        assert!(rendered.contains("tower_http=debug"), "{}", rendered);

        config.log_level = "very loud".to_string();
        let rendered = default_filter(&config).to_string();
        assert!(rendered.contains("real_ip=info"), "{}", rendered);
    }
}
