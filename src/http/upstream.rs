//! Upstream forwarding.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the configured upstream
//! - Strip hop-by-hop headers
//! - Stream the upstream response back unchanged
//!
//! # Design Decisions
//! - The original `Host` header is preserved
//! - Upstream failures map to 502, they are never retried here

use axum::{
    body::Body,
    http::{
        header,
        uri::{Authority, Scheme},
        Request, StatusCode, Uri, Version,
    },
    response::{IntoResponse, Response},
};
use hyper_util::client::legacy::{connect::HttpConnector, Client};

use crate::config::validation::check_upstream;
use crate::http::request::request_id_of;
use crate::http::server::ServerError;

/// Client used for upstream requests.
pub type UpstreamClient = Client<HttpConnector, Body>;

const HOP_BY_HOP: [&str; 7] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// A parsed upstream base URL.
#[derive(Debug, Clone)]
pub struct Upstream {
    scheme: Scheme,
    authority: Authority,
    base_path: String,
}

impl Upstream {
    pub fn parse(url: &str) -> Result<Self, ServerError> {
        let invalid = |reason: String| ServerError::InvalidUpstream {
            url: url.to_string(),
            reason,
        };

        let parsed = check_upstream(url).map_err(invalid)?;
        let host = parsed
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| invalid("missing port".to_string()))?;
        let authority = format!("{}:{}", host, port)
            .parse::<Authority>()
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            scheme: Scheme::HTTP,
            authority,
            base_path: parsed.path().trim_end_matches('/').to_string(),
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Upstream URI for an incoming path and query.
    pub fn uri_for(&self, path_and_query: &str) -> Result<Uri, axum::http::Error> {
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(format!("{}{}", self.base_path, path_and_query))
            .build()
    }
}

/// Forward `request` to the upstream and relay its response.
pub async fn forward(client: &UpstreamClient, upstream: &Upstream, request: Request<Body>) -> Response {
    let request_id = request_id_of(&request);
    let (mut parts, body) = request.into_parts();

    let path_and_query = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let uri = match upstream.uri_for(path_and_query) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to build upstream URI");
            return (StatusCode::BAD_GATEWAY, "Invalid upstream URI").into_response();
        }
    };
    parts.uri = uri;
    parts.version = Version::HTTP_11;

    if let Some(connection) = parts.headers.get(header::CONNECTION).cloned() {
        // Headers named in Connection are hop-by-hop too.
        if let Ok(names) = connection.to_str() {
            for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                parts.headers.remove(name);
            }
        }
    }
    for name in HOP_BY_HOP {
        parts.headers.remove(name);
    }

    tracing::debug!(request_id = %request_id, uri = %parts.uri, "Forwarding request");

    match client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
