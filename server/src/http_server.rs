use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use common::ReplayParser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::api;
use crate::api::client_ip::client_ip_middleware;
use crate::config::Config;
use crate::ingest::ReplayIngestor;

/// Shared, read-only state handed to every request
#[derive(Clone)]
pub struct HttpServerState {
    pub config: Arc<Config>,
    pub ingestor: Arc<ReplayIngestor>,
}

impl HttpServerState {
    pub fn new(config: Config, parser: Arc<dyn ReplayParser>) -> Self {
        let ingestor = Arc::new(ReplayIngestor::new(parser, config.staging_dir.clone()));
        Self {
            config: Arc::new(config),
            ingestor,
        }
    }
}

pub fn build_router(state: HttpServerState) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trusted_proxies = Arc::new(state.config.trusted_proxies.clone());

    let analyze_routes = Router::new()
        .route("/analyze", post(api::analyze))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes));

    Router::new()
        .route("/health", get(health_check))
        .merge(analyze_routes)
        .layer(middleware::from_fn_with_state(
            trusted_proxies,
            client_ip_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind the configured address and serve until the token is cancelled
pub async fn run_http_server(
    config: Config,
    parser: Arc<dyn ReplayParser>,
    cancellation_token: CancellationToken,
) -> Result<()> {
    let listener = TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server to {}", config.addr))?;

    let state = HttpServerState::new(config, parser);
    run_http_server_with_listener(listener, state, cancellation_token).await
}

pub async fn run_http_server_with_listener(
    listener: TcpListener,
    state: HttpServerState,
    cancellation_token: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(
        "HTTP server listening on {} (profile={}, unknown players={:?}, staging={:?})",
        addr, state.config.profile, state.config.unknown_player, state.config.staging_dir
    );

    let app = build_router(state);

    // Serve with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        cancellation_token.cancelled().await;
        info!("HTTP server received shutdown signal");
    })
    .await
    .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))
}

/// Health check handler
async fn health_check() -> &'static str {
    "OK"
}
