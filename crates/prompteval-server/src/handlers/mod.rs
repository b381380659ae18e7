pub mod evaluate;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/evaluate", post(evaluate::evaluate))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}
