//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check strategy parameters (proxy count present, networks parse)
//! - Validate header names and socket addresses
//! - Validate the upstream URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RealIpConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderName;
use url::Url;

use crate::config::schema::RealIpConfig;
use crate::retrieval::{parse_cidr, Strategy};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyHeader { field: &'static str },

    #[error("{field} is not a valid header name: {value:?}")]
    InvalidHeaderName { field: &'static str, value: String },

    #[error("retriever.proxy_count is required for strategy proxy-count")]
    MissingProxyCount,

    #[error("retriever.proxy_cidrs contains an invalid network: {0:?}")]
    InvalidCidr(String),

    #[error("{field} is not a valid socket address: {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("upstream.url {url:?} is invalid: {reason}")]
    InvalidUpstream { url: String, reason: String },
}

/// Validate a parsed configuration, collecting every error found.
pub fn validate_config(config: &RealIpConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let retriever = &config.retriever;

    check_header(&mut errors, "retriever.header", &retriever.header);
    check_header(&mut errors, "retriever.target_header", &retriever.target_header);

    match retriever.strategy {
        Strategy::ProxyCount if retriever.proxy_count.is_none() => {
            errors.push(ValidationError::MissingProxyCount);
        }
        Strategy::ProxyCidr => {
            for cidr in &retriever.proxy_cidrs {
                if parse_cidr(cidr).is_err() {
                    errors.push(ValidationError::InvalidCidr(cidr.clone()));
                }
            }
        }
        _ => {}
    }

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if let Some(url) = &config.upstream.url {
        if let Err(reason) = check_upstream(url) {
            errors.push(ValidationError::InvalidUpstream {
                url: url.clone(),
                reason,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_header(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        errors.push(ValidationError::EmptyHeader { field });
    } else if HeaderName::from_bytes(value.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidHeaderName {
            field,
            value: value.to_string(),
        });
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

/// Upstreams are reached over plain HTTP and must name a host.
pub(crate) fn check_upstream(url: &str) -> Result<Url, String> {
    let parsed = Url::parse(url).map_err(|e| e.to_string())?;
    if parsed.scheme() != "http" {
        return Err(format!("unsupported scheme {:?}, only http is supported", parsed.scheme()));
    }
    if parsed.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err("query and fragment are not allowed".to_string());
    }
    Ok(parsed)
}
