//! HTTP API v1 — REST surface over the report engine.
//!
//! Endpoints:
//!
//! - `POST /v1/enhance`                  — Run one prompt against a conversation
//! - `GET  /v1/contexts`                 — List stored contexts
//! - `GET  /v1/contexts/{id}`            — Get a context
//! - `GET  /v1/contexts/{id}/document`   — Render the current document
//! - `GET  /v1/contexts/{id}/export`     — Export a context as JSON text
//! - `POST /v1/contexts/import`          — Install an exported context
//! - `POST /v1/contexts/{id}/prompt`     — Build a prompt for external generation
//! - `POST /v1/contexts/{id}/generated`  — Apply externally generated output
//! - `POST /v1/evict`                    — Evict idle contexts now

use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Json},
    routing::{get, post},
};
use folio_core::{Context, ContextError, Error, ReportType};
use folio_report::{EnhanceRequest, EnhanceResponse, GeneratedOutcome};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::SharedState;

/// Build the v1 API router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/enhance", post(enhance_handler))
        .route("/contexts", get(list_contexts_handler))
        .route("/contexts/import", post(import_context_handler))
        .route("/contexts/{id}", get(get_context_handler))
        .route("/contexts/{id}/document", get(document_handler))
        .route("/contexts/{id}/export", get(export_context_handler))
        .route("/contexts/{id}/prompt", post(build_prompt_handler))
        .route("/contexts/{id}/generated", post(generated_handler))
        .route("/evict", post(evict_handler))
        .with_state(state)
}

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextSummaryDto {
    conversation_id: String,
    report_type: Option<ReportType>,
    version: u64,
    enhancements: usize,
    compressed: bool,
    last_update: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize, Deserialize)]
struct ContextListResponse {
    contexts: Vec<ContextSummaryDto>,
    count: usize,
}

#[derive(Deserialize)]
struct PromptRequest {
    prompt: String,
}

#[derive(Serialize, Deserialize)]
struct PromptResponse {
    prompt: String,
}

#[derive(Deserialize)]
struct GeneratedRequest {
    prompt: String,
    output: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvictRequest {
    /// Defaults to the configured idle TTL.
    #[serde(default)]
    max_age_secs: Option<u64>,
}

#[derive(Serialize, Deserialize)]
struct EvictResponse {
    evicted: Vec<String>,
    count: usize,
}

// ── Errors ────────────────────────────────────────────────────────────────

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn error_response(err: Error) -> ApiError {
    let status = match &err {
        Error::Context(ContextError::NotFound(_)) => StatusCode::NOT_FOUND,
        Error::Context(ContextError::AlreadyExists(_)) => StatusCode::CONFLICT,
        Error::Context(ContextError::Import(_)) | Error::Block(_) | Error::Serialization(_) => {
            StatusCode::BAD_REQUEST
        }
        Error::Config { .. } | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!(error = %err, "Request failed");
    }
    api_error(status, err.to_string())
}

fn not_found(id: &str) -> ApiError {
    error_response(ContextError::NotFound(id.to_string()).into())
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn enhance_handler(
    State(state): State<SharedState>,
    Json(payload): Json<EnhanceRequest>,
) -> Result<Json<EnhanceResponse>, ApiError> {
    if payload.conversation_id.trim().is_empty() || payload.prompt.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "conversationId and prompt are required",
        ));
    }
    info!(conversation = %payload.conversation_id, "v1/enhance request");

    let _guard = state.locks.acquire(&payload.conversation_id).await;
    state
        .engine
        .enhance(payload)
        .map(Json)
        .map_err(error_response)
}

async fn list_contexts_handler(State(state): State<SharedState>) -> Json<ContextListResponse> {
    let store = state.engine.store();
    let contexts: Vec<ContextSummaryDto> = store
        .conversation_ids()
        .into_iter()
        .filter_map(|id| store.get(&id))
        .map(|ctx| ContextSummaryDto {
            report_type: ctx.state.report_type,
            version: ctx.metadata.version,
            enhancements: ctx.enhancements.len(),
            compressed: ctx.metadata.compressed,
            last_update: ctx.metadata.last_update,
            conversation_id: ctx.conversation_id,
        })
        .collect();
    let count = contexts.len();
    Json(ContextListResponse { contexts, count })
}

async fn get_context_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Context>, ApiError> {
    state
        .engine
        .store()
        .get(&id)
        .map(Json)
        .ok_or_else(|| not_found(&id))
}

async fn document_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Html<String>, ApiError> {
    state.engine.render(&id).map(Html).map_err(error_response)
}

async fn export_context_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let exported = state.engine.store().export(&id).map_err(error_response)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], exported))
}

async fn import_context_handler(
    State(state): State<SharedState>,
    body: String,
) -> Result<(StatusCode, Json<Context>), ApiError> {
    // Hold the conversation's lock while replacing it.
    let conversation_id = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["conversationId"].as_str().map(str::to_string))
        .unwrap_or_default();
    let _guard = state.locks.acquire(&conversation_id).await;

    let context = state
        .engine
        .store()
        .import(&body)
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(context)))
}

async fn build_prompt_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<PromptRequest>,
) -> Result<Json<PromptResponse>, ApiError> {
    let prompt = state
        .engine
        .build_prompt(&id, &payload.prompt)
        .map_err(error_response)?;
    Ok(Json(PromptResponse { prompt }))
}

async fn generated_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<GeneratedRequest>,
) -> Result<Json<GeneratedOutcome>, ApiError> {
    info!(conversation = %id, output_len = payload.output.len(), "v1/generated request");
    let _guard = state.locks.acquire(&id).await;
    state
        .engine
        .apply_generated(&id, &payload.prompt, &payload.output)
        .map(Json)
        .map_err(error_response)
}

async fn evict_handler(
    State(state): State<SharedState>,
    Json(payload): Json<EvictRequest>,
) -> Json<EvictResponse> {
    let max_age = payload
        .max_age_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| state.config.store.idle_ttl());
    let evicted = crate::evict_idle(&state.engine, &state.locks, max_age);
    let count = evicted.len();
    Json(EvictResponse { evicted, count })
}
