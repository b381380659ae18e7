use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use prompteval_core::EvalError;
use serde::Serialize;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl From<EvalError> for AppError {
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::Config(msg) => AppError::BadRequest(msg),
            EvalError::Json(e) => {
                AppError::BadRequest(format!("messages must be a JSON array of {{role, content}}: {e}"))
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
