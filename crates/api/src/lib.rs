//! Plant Relay API Server
//!
//! Relays moisture readings from a soil sensor to the mobile client. A single
//! plant is tracked; readings overwrite the stored value.

use anyhow::Context;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use plant_storage::Repository;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod telemetry;

use config::{ConfigError, LoggingConfig, ServerConfig};
use rate_limit::RateLimitConfig;

/// Application state shared across handlers
pub struct AppState {
    /// Storage repository
    pub repository: Repository,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
    /// Prometheus handle, present when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Create new application state
    pub fn new(repository: Repository, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            repository,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            metrics,
        }
    }
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub database: String,
    pub plant_registered: bool,
}

/// Create the application router
pub fn create_router(
    state: SharedState,
    rate_limit: &RateLimitConfig,
) -> Result<Router, ConfigError> {
    let mut router = Router::new()
        .route("/api", post(routes::moisture::post_reading))
        .route("/moisture", get(routes::moisture::get_moisture))
        .route("/add", post(routes::plants::add_plant))
        .route("/plant", get(routes::plants::get_plant))
        .route("/health", get(health_handler));

    if state.metrics.is_some() {
        router = router.route("/metrics", get(metrics_handler));
    }

    let mut router = router.with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    if let Some(governor) = rate_limit::governor_layer(rate_limit)? {
        router = router.layer(governor);
    }

    Ok(router)
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let database_ok = state.repository.ping().await.is_ok();
    let plant_registered = state
        .repository
        .plant_count()
        .await
        .map(|count| count > 0)
        .unwrap_or(false);

    Json(HealthResponse {
        status: if database_ok { "healthy" } else { "degraded" }.to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        database: if database_ok { "ok" } else { "unavailable" }.to_string(),
        plant_registered,
    })
}

/// Prometheus scrape handler
async fn metrics_handler(State(state): State<SharedState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Initialize logging
///
/// `RUST_LOG` overrides the configured level. Returns an error rather than
/// panicking if a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.trim()))
        .map_err(|e| ConfigError::Invalid(format!("invalid logging.level: {e}")))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| ConfigError::Invalid(format!("logging init failed: {e}")))
}

/// Serve `app` on `listener` until ctrl-c
pub async fn serve(listener: tokio::net::TcpListener, app: Router) -> std::io::Result<()> {
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Run the server
pub async fn run_server(config: &ServerConfig) -> anyhow::Result<()> {
    let repository = Repository::connect(&config.database.url)
        .await
        .with_context(|| format!("opening database {}", config.database.url))?;

    let metrics = if config.metrics.enabled {
        Some(telemetry::install_recorder()?)
    } else {
        None
    };

    let state = Arc::new(AppState::new(repository.clone(), metrics));
    let app = create_router(state, &config.rate_limit)?;

    let addr = config.bind_addr()?;
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    serve(listener, app).await?;

    repository.close().await;
    info!("Server stopped");
    Ok(())
}
