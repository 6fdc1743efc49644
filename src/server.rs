//! HTTP router and handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/upload-documents` | Fetch, parse, and publish a document pair |
//! | `POST` | `/answer-question` | Answer a question over the current pair |
//! | `GET`  | `/` | Liveness probe |
//!
//! # Error contract
//!
//! Application errors return `{"error": "<message>"}` with 400 for
//! user-correctable input problems and 500 for upstream failures (see
//! [`crate::error`]). Requests from denied origins get a bare `403` from
//! the origin guard before any document or model work happens.
//!
//! # CORS
//!
//! The CORS layer and the origin guard share one [`OriginPolicy`]: allowed
//! methods `GET, POST`; allowed request headers `Content-Type,
//! Authorization`; origins admitted per [`crate::origin::authorize`].

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::error::ApiError;
use crate::generate::{self, GenerativeClient};
use crate::ingest::Ingestor;
use crate::origin::{authorize, OriginPolicy, Verdict};
use crate::store::DocumentStore;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
    pub ingestor: Arc<Ingestor>,
    pub model: Arc<dyn GenerativeClient>,
    pub policy: Arc<OriginPolicy>,
}

/// Builds the service router with CORS and the origin guard applied.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.policy.clone());
    Router::new()
        .route("/", get(handle_root))
        .route("/upload-documents", post(handle_upload))
        .route("/answer-question", post(handle_answer))
        .layer(middleware::from_fn_with_state(state.clone(), origin_guard))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(policy: Arc<OriginPolicy>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts| {
                origin
                    .to_str()
                    .map(|o| authorize(Some(o), &policy) == Verdict::Allow)
                    .unwrap_or(false)
            },
        ))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Rejects requests from denied origins before any handler runs.
async fn origin_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let verdict = match request.headers().get(header::ORIGIN) {
        None => Verdict::Allow,
        Some(value) => match value.to_str() {
            Ok(origin) => authorize(Some(origin), &state.policy),
            // A non-UTF-8 origin header is malformed.
            Err(_) => Verdict::Deny,
        },
    };
    if verdict == Verdict::Deny {
        warn!(origin = ?request.headers().get(header::ORIGIN), "rejected request from denied origin");
        return StatusCode::FORBIDDEN.into_response();
    }
    next.run(request).await
}

async fn handle_root() -> &'static str {
    "Document Question Answering Service is running."
}

/// Fields are optional at the serde level so a missing field produces our
/// JSON `{"error"}` body instead of axum's plain-text rejection.
#[derive(Deserialize)]
pub struct UploadRequest {
    #[serde(default)]
    source_document_url: Option<String>,
    #[serde(default)]
    target_document_url: Option<String>,
}

#[derive(Serialize)]
struct UploadResponse {
    message: String,
}

async fn handle_upload(
    State(state): State<AppState>,
    Json(body): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
    let source = body.source_document_url.unwrap_or_default();
    let target = body.target_document_url.unwrap_or_default();
    state.ingestor.ingest(&source, &target).await?;
    Ok(Json(UploadResponse {
        message: "Documents uploaded and parsed successfully.".to_string(),
    }))
}

#[derive(Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    question: Option<String>,
}

#[derive(Serialize)]
struct AnswerResponse {
    answer: String,
    source_document: String,
    target_document: String,
    question: String,
}

async fn handle_answer(
    State(state): State<AppState>,
    Json(body): Json<QuestionRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let question = body.question.unwrap_or_default();
    // One snapshot serves the whole request: the answer and the echoed
    // references always describe the same ingestion.
    let pair = state.store.snapshot();
    let answer = generate::answer(&question, &pair, state.model.as_ref()).await?;
    Ok(Json(AnswerResponse {
        answer,
        source_document: pair.source_ref,
        target_document: pair.target_ref,
        question,
    }))
}
