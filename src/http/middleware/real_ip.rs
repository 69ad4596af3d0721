//! Real client address middleware.
//!
//! Runs the active retriever over the incoming headers and hands the result
//! to everything behind it:
//! - found: the target header is overwritten and [`ClientIp`] is attached to
//!   the request extensions
//! - absent: any client-supplied target header is removed
//!
//! Either way a [`Resolution`] records which header and strategy decided.

use std::net::IpAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use crate::config::RetrieverConfig;
use crate::http::request::request_id_of;
use crate::observability::metrics;
use crate::retrieval::{RetrievalError, Retriever, Strategy};

/// Resolved client address, attached to request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

/// Outcome of one resolution, tied to the policy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub client_ip: Option<IpAddr>,
    pub header: String,
    pub strategy: Strategy,
}

/// Error raised while building a policy from configuration.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error("invalid target header: {0:?}")]
    InvalidTargetHeader(String),
}

/// A retriever together with the header its result is written to.
#[derive(Debug, Clone)]
pub struct RealIpPolicy {
    retriever: Retriever,
    target_header: HeaderName,
}

impl RealIpPolicy {
    pub fn new(retriever: Retriever, target_header: HeaderName) -> Self {
        Self {
            retriever,
            target_header,
        }
    }

    pub fn from_config(config: &RetrieverConfig) -> Result<Self, PolicyError> {
        let retriever = Retriever::from_config(config)?;
        let target = config.target_header.trim();
        let target_header = HeaderName::from_bytes(target.as_bytes())
            .map_err(|_| PolicyError::InvalidTargetHeader(target.to_string()))?;
        Ok(Self::new(retriever, target_header))
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn target_header(&self) -> &HeaderName {
        &self.target_header
    }
}

/// Policy shared between the middleware and the reload task.
pub type SharedPolicy = Arc<ArcSwap<RealIpPolicy>>;

pub fn shared_policy(policy: RealIpPolicy) -> SharedPolicy {
    Arc::new(ArcSwap::from_pointee(policy))
}

pub async fn real_ip_middleware(
    State(policy): State<SharedPolicy>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    // Pin one policy for the whole request, even across a reload.
    let policy = policy.load_full();
    let retriever = policy.retriever();
    let resolved = retriever.retrieve(req.headers());

    metrics::record_resolution(retriever.strategy(), resolved.is_some());
    req.extensions_mut().insert(Resolution {
        client_ip: resolved,
        header: retriever.header_name().to_string(),
        strategy: retriever.strategy(),
    });

    match resolved.and_then(|ip| HeaderValue::try_from(ip.to_string()).ok().map(|v| (ip, v))) {
        Some((ip, value)) => {
            tracing::debug!(
                request_id = %request_id_of(&req),
                client_ip = %ip,
                header = %retriever.header_name(),
                strategy = %retriever.strategy(),
                "Client address resolved"
            );
            req.headers_mut().insert(policy.target_header().clone(), value);
            req.extensions_mut().insert(ClientIp(ip));
        }
        None => {
            tracing::debug!(
                request_id = %request_id_of(&req),
                header = %retriever.header_name(),
                strategy = %retriever.strategy(),
                "No client address in chain"
            );
            req.headers_mut().remove(policy.target_header());
        }
    }

    next.run(req).await
}
