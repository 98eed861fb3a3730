//! HTTP server setup and configuration.

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::handlers;
use crate::config::{Config, ConfigError};
use crate::error::Result;
use crate::provider::{ProviderRegistry, Registration};
use crate::router::{spawn_daily_reset, Router as ProviderRouter};

/// Response header: correlation ID (UUID v4).
pub const REQUEST_ID_HEADER: &str = "x-ai-adapter-request-id";

/// Largest accepted audio upload.
const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub router: ProviderRouter,
    pub config: Arc<Config>,
}

/// Correlation ID assigned to every inbound request.
#[derive(Debug, Clone, Copy)]
pub struct RequestId(pub Uuid);

/// Assign a request ID, expose it to handlers and echo it in the response.
async fn assign_request_id(mut request: Request, next: Next) -> Response {
    let id = RequestId(Uuid::new_v4());
    request.extensions_mut().insert(id);

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id.0.to_string()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

/// Create the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Task endpoints
        .route("/generate", post(handlers::generate))
        .route("/summarize", post(handlers::summarize))
        .route("/analyze-speakers", post(handlers::analyze_speakers))
        .route(
            "/transcribe",
            post(handlers::transcribe).layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES)),
        )
        // Accounting and health
        .route("/usage", get(handlers::usage))
        .route("/reset-usage", post(handlers::reset_usage))
        .route("/health", get(handlers::health))
        // State and middleware
        .with_state(state)
        .layer(middleware::from_fn(assign_request_id))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Build the provider registry and router from configuration.
///
/// Returns the per-provider registration outcomes alongside the state so the
/// caller can report them.
pub fn build_state(config: Config) -> Result<(AppState, Vec<Registration>)> {
    let http_client = Client::builder()
        .timeout(config.routing.request_timeout())
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| {
            ConfigError::Validation(format!("cannot build HTTP client from routing settings: {}", e))
        })?;

    let (registry, registrations) = ProviderRegistry::from_config(&config.providers, &http_client);
    if registry.is_empty() {
        tracing::warn!("No providers available - every request will be rejected");
    }

    let router = ProviderRouter::new(registry, config.routing.clone());

    let state = AppState {
        router,
        config: Arc::new(config),
    };
    Ok((state, registrations))
}

/// Run the HTTP server.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();
    let (state, _registrations) = build_state(config)?;

    if state.config.routing.daily_reset {
        spawn_daily_reset(state.router.ledger().clone());
        tracing::info!("Scheduled usage reset at every UTC midnight");
    }

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Starting ai-adapter server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
