use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Core failure taxonomy. The first two are always absorbed by the
/// generation pipeline (fallback substitution); `InvalidState` is a contract
/// violation and surfaces to the caller unchanged.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error("generation call failed: {0}")]
    GenerationCallFailure(String),
    #[error("malformed generation response: {0}")]
    MalformedResponse(String),
    #[error("invalid session state: {0}")]
    InvalidState(&'static str),
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: ErrorPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
    pub request_id: String,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub request_id: String,
}

impl AppError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            request_id: request_id.into(),
        }
    }

    pub fn from_quiz_error(err: &QuizError, request_id: impl Into<String>) -> Self {
        let (status, code) = match err {
            QuizError::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
            QuizError::GenerationCallFailure(_) => {
                (StatusCode::BAD_GATEWAY, "GENERATION_FAILED")
            }
            QuizError::MalformedResponse(_) => (StatusCode::BAD_GATEWAY, "MALFORMED_RESPONSE"),
        };
        Self::new(status, code, err.to_string(), request_id)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let payload = ErrorBody {
            error: ErrorPayload {
                code: self.code,
                message: self.message,
                request_id: self.request_id,
            },
        };
        (self.status, Json(payload)).into_response()
    }
}
