//! HTTP error taxonomy.
//!
//! Every application failure surfaces to the caller as a JSON `{"error"}`
//! body with the causing message. User-correctable problems (missing input,
//! asking before ingesting) are 400s; upstream fetch/parse/generation
//! failures are 500s. Origin denial is not represented here: it is a bare
//! 403 from middleware, issued before any handler runs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::generate::AnswerError;
use crate::ingest::IngestError;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Any failure a handler can report.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Ingest(IngestError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Ingest(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Answer(AnswerError::Validation | AnswerError::NotReady) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Answer(AnswerError::Generation(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
