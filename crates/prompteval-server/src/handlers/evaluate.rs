use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, State},
    Form, Json,
};
use prompteval_core::BatchResult;
use tracing::warn;

use crate::dto::{EvaluateForm, EvaluateRequest};
use crate::error::AppError;
use crate::services;
use crate::state::AppState;

pub async fn evaluate(
    State(state): State<Arc<AppState>>,
    form: Result<Form<EvaluateForm>, FormRejection>,
) -> Result<Json<BatchResult>, AppError> {
    let Form(form) = form.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let request = EvaluateRequest::try_from(form).map_err(|e| {
        warn!("Rejected evaluation request: {}", e);
        AppError::from(e)
    })?;

    match services::evaluate::run(&state, request).await? {
        BatchResult::Error { error } => Err(AppError::Internal(error)),
        results => Ok(Json(results)),
    }
}
