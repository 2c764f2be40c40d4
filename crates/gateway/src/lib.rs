//! HTTP API gateway for Folio.
//!
//! Owns one [`ReportEngine`], serializes requests per conversation id and
//! runs the idle-context sweeper next to the server.
//!
//! Built on Axum for high performance async HTTP.

pub mod api_v1;
pub mod locks;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::{Router, extract::State, response::Json, routing::get};
use folio_config::{AppConfig, StoreConfig};
use folio_report::ReportEngine;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub use locks::ConversationLocks;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub engine: Arc<ReportEngine>,
    pub locks: Arc<ConversationLocks>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// State with a fresh engine over the bundled reference data.
    pub fn new(config: AppConfig) -> Self {
        let engine = Arc::new(ReportEngine::from_config(&config));
        Self::with_engine(config, engine)
    }

    pub fn with_engine(config: AppConfig, engine: Arc<ReportEngine>) -> Self {
        Self {
            config,
            engine,
            locks: Arc::new(ConversationLocks::new()),
            start_time: chrono::Utc::now(),
        }
    }
}

/// Build the full router: health check plus the v1 API.
///
/// Layers applied:
/// - Request body size limit (`gateway.body_limit`)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let body_limit = state.config.gateway.body_limit;
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Evict contexts idle longer than `max_age`, skipping conversations with a
/// request in flight. Locks of evicted ids are held until removal finishes.
pub fn evict_idle(
    engine: &ReportEngine,
    locks: &ConversationLocks,
    max_age: Duration,
) -> Vec<String> {
    let mut held = Vec::new();
    let evicted = engine.store().evict_with(max_age, |id| match locks.try_acquire(id) {
        Some(guard) => {
            held.push(guard);
            true
        }
        None => {
            debug!(conversation = id, "Skipping eviction of busy conversation");
            false
        }
    });
    drop(held);
    locks.prune();
    evicted
}

/// Periodically evict idle contexts and drop unused conversation locks.
pub fn spawn_sweeper(
    engine: Arc<ReportEngine>,
    locks: Arc<ConversationLocks>,
    store: StoreConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(store.sweep_interval());
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let evicted = evict_idle(&engine, &locks, store.idle_ttl());
            debug!(
                evicted = evicted.len(),
                remaining = engine.store().len(),
                "Sweep complete"
            );
        }
    })
}

/// Start the gateway HTTP server and the eviction sweeper.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(GatewayState::new(config));

    let sweeper = spawn_sweeper(
        state.engine.clone(),
        state.locks.clone(),
        state.config.store.clone(),
    );

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting with v1 API");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let served = axum::serve(listener, app).await;
    sweeper.abort();
    served?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    contexts: usize,
    uptime_secs: i64,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        contexts: state.engine.store().len(),
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
    })
}
