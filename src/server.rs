//! HTTP JSON API.
//!
//! A thin axum layer over [`Retriever`]. It defines no authentication; it
//! is meant to sit behind the service that owns the caller's identity.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/logs/tail` | Compressed tail window of a log file |
//! | `POST` | `/logs/validate` | Run the input validator on a payload |
//! | `POST` | `/logs/stat` | Size, line count, and mtime of a log file |
//!
//! # Tail response
//!
//! ```json
//! { "status": "ok", "codec": "zstd", "uncompressed_length": 5120,
//!   "lines": 200, "data": "<base64>" }
//! ```
//!
//! `uncompressed_length` must be kept alongside `data`; it is required to
//! decode the block. When a pattern removes every line the response is
//! `{ "status": "no_match" }`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid request for '../x': ..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `timeout` (408),
//! `read_failure` (500), `codec_error` (500), `busy` (503).

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::RetrievalError;
use crate::models::{CodecKind, MatchMode, RetrievalOutcome, RetrievalRequest, ValidationVerdict};
use crate::retrieve::Retriever;
use crate::stats::{stat_request, FileStat};
use crate::validate::validate;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    retriever: Retriever,
}

/// Build the router without binding a socket.
pub fn build_router(config: &Config) -> Router {
    let state = AppState {
        config: Arc::new(config.clone()),
        retriever: Retriever::new(config),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/logs/tail", post(handle_tail))
        .route("/logs/validate", post(handle_validate))
        .route("/logs/stat", post(handle_stat))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let app = build_router(config);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    log::info!("log window server listening on http://{}", config.server.bind);
    println!("Log window server listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<RetrievalError> for AppError {
    fn from(err: RetrievalError) -> Self {
        let (status, code) = match &err {
            RetrievalError::ValidationRejected { .. } => (StatusCode::BAD_REQUEST, "bad_request"),
            RetrievalError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            RetrievalError::Timeout { .. } => (StatusCode::REQUEST_TIMEOUT, "timeout"),
            RetrievalError::Busy { .. } => (StatusCode::SERVICE_UNAVAILABLE, "busy"),
            RetrievalError::ReadFailure { .. }
            | RetrievalError::Inaccessible { .. }
            | RetrievalError::EmptyWindow { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "read_failure")
            }
            RetrievalError::Codec(_) => (StatusCode::INTERNAL_SERVER_ERROR, "codec_error"),
        };
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /logs/tail ============

#[derive(Debug, Deserialize)]
pub struct TailParams {
    pub path: String,
    /// Defaults to `[retrieval].default_lines`.
    #[serde(default)]
    pub lines: Option<usize>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub invert: bool,
    #[serde(default)]
    pub regex: bool,
    #[serde(default)]
    pub codec: Option<CodecKind>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TailResponse {
    Ok {
        codec: CodecKind,
        uncompressed_length: usize,
        lines: usize,
        /// Base64 (standard alphabet) of the compressed block.
        data: String,
    },
    NoMatch,
}

async fn handle_tail(
    State(state): State<AppState>,
    Json(params): Json<TailParams>,
) -> Result<Json<TailResponse>, AppError> {
    let mut request = RetrievalRequest::new(
        params.path,
        params
            .lines
            .unwrap_or(state.config.retrieval.default_lines),
    );
    if let Some(pattern) = params.pattern {
        request = request.with_pattern(pattern, params.invert);
    }
    if params.regex {
        request = request.with_match_mode(MatchMode::Regex);
    }
    if let Some(codec) = params.codec {
        request = request.with_codec(codec);
    }

    let outcome = state.retriever.retrieve(&request).await.map_err(|e| {
        log::info!("tail {} failed: {}", request.path, e);
        AppError::from(e)
    })?;

    let response = match outcome {
        RetrievalOutcome::Window { block, lines } => TailResponse::Ok {
            codec: block.codec,
            uncompressed_length: block.uncompressed_length,
            lines,
            data: base64::engine::general_purpose::STANDARD.encode(&block.data),
        },
        RetrievalOutcome::NoMatch => TailResponse::NoMatch,
    };
    Ok(Json(response))
}

// ============ POST /logs/validate ============

#[derive(Debug, Deserialize)]
pub struct ValidateParams {
    pub payload: String,
    #[serde(default)]
    pub must_contain: Option<Vec<String>>,
}

async fn handle_validate(Json(params): Json<ValidateParams>) -> Json<ValidationVerdict> {
    Json(validate(&params.payload, params.must_contain.as_deref()))
}

// ============ POST /logs/stat ============

#[derive(Debug, Deserialize)]
pub struct StatParams {
    pub path: String,
}

async fn handle_stat(
    State(state): State<AppState>,
    Json(params): Json<StatParams>,
) -> Result<Json<FileStat>, AppError> {
    let stat = stat_request(&state.config, &params.path).await?;
    Ok(Json(stat))
}
