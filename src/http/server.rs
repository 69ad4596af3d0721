//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all handler
//! - Wire up middleware (request ID, tracing, timeout, real client address)
//! - Bind server to listener
//! - Forward requests upstream, or echo the resolved address
//! - Apply retriever changes from config reloads

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::RealIpConfig;
use crate::http::middleware::{
    real_ip_middleware, shared_policy, PolicyError, RealIpPolicy, Resolution, SharedPolicy,
};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::upstream::{forward, Upstream, UpstreamClient};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::retrieval::Strategy;

/// Error type for server setup and operation.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error("invalid upstream {url:?}: {reason}")]
    InvalidUpstream { url: String, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub policy: SharedPolicy,
    pub upstream: Option<Arc<Upstream>>,
    pub client: UpstreamClient,
}

/// Body returned when no upstream is configured.
#[derive(Debug, Serialize)]
pub struct EchoResponse {
    pub real_ip: Option<String>,
    pub header: String,
    pub strategy: Strategy,
}

/// HTTP server resolving the client address of every request.
pub struct HttpServer {
    router: Router,
    config: RealIpConfig,
    policy: SharedPolicy,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails if the retriever or upstream cannot be built.
    pub fn new(config: RealIpConfig) -> Result<Self, ServerError> {
        let policy = shared_policy(RealIpPolicy::from_config(&config.retriever)?);
        let upstream = config
            .upstream
            .url
            .as_deref()
            .map(Upstream::parse)
            .transpose()?
            .map(Arc::new);

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        tracing::info!(
            header = %config.retriever.header,
            strategy = %config.retriever.strategy,
            target_header = %config.retriever.target_header,
            upstream = ?config.upstream.url,
            "Retrieval policy configured"
        );

        let state = AppState {
            policy: policy.clone(),
            upstream,
            client,
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            policy,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RealIpConfig, state: AppState) -> Router {
        let policy = state.policy.clone();
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(from_fn_with_state(policy, real_ip_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, e.g. for driving it without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Handle to the active policy.
    pub fn policy(&self) -> SharedPolicy {
        self.policy.clone()
    }

    pub fn config(&self) -> &RealIpConfig {
        &self.config
    }

    /// Serve until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<RealIpConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let reload = tokio::spawn(apply_config_updates(
            self.policy.clone(),
            self.config.clone(),
            config_updates,
        ));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(Shutdown::notified(shutdown))
            .await?;

        reload.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Swap in the retriever of each accepted config. Other sections need a restart.
async fn apply_config_updates(
    policy: SharedPolicy,
    running: RealIpConfig,
    mut updates: mpsc::UnboundedReceiver<RealIpConfig>,
) {
    while let Some(config) = updates.recv().await {
        match RealIpPolicy::from_config(&config.retriever) {
            Ok(new_policy) => {
                policy.store(Arc::new(new_policy));
                tracing::info!(
                    header = %config.retriever.header,
                    strategy = %config.retriever.strategy,
                    "Retrieval policy updated"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Rejected retrieval policy, keeping current one");
            }
        }

        if config.upstream.url != running.upstream.url
            || config.listener.bind_address != running.listener.bind_address
        {
            tracing::warn!("Listener and upstream changes take effect after a restart");
        }
    }
}

/// Catch-all handler: forward when an upstream is set, otherwise echo.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let response = match &state.upstream {
        Some(upstream) => forward(&state.client, upstream, request).await,
        None => echo(&state.policy, &request).into_response(),
    };

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}

/// Echo the resolution pinned by the middleware for this request.
fn echo(policy: &SharedPolicy, request: &Request<Body>) -> Json<EchoResponse> {
    let resolution = match request.extensions().get::<Resolution>() {
        Some(resolution) => resolution.clone(),
        None => {
            let policy = policy.load();
            Resolution {
                client_ip: None,
                header: policy.retriever().header_name().to_string(),
                strategy: policy.retriever().strategy(),
            }
        }
    };

    Json(EchoResponse {
        real_ip: resolution.client_ip.map(|ip| ip.to_string()),
        header: resolution.header,
        strategy: resolution.strategy,
    })
}
