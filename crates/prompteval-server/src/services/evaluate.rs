use prompteval_core::BatchResult;
use prompteval_pipeline::BatchRunner;
use tracing::info;

use crate::dto::EvaluateRequest;
use crate::error::AppError;
use crate::state::AppState;

pub async fn run(state: &AppState, request: EvaluateRequest) -> Result<BatchResult, AppError> {
    let backend = state.backend(&request.api_key)?;

    info!(
        "EVALUATE: {} run(s) of {} judged by {}",
        request.num_runs, request.params.generation.model, request.params.evaluation.model
    );

    let runner = BatchRunner::new(backend);
    Ok(runner
        .run_batch(request.params, request.num_runs, request.mode)
        .await)
}
