use async_trait::async_trait;

use crate::{CompletionRequest, CompletionResponse, EvalError};

/// Chat completion service used for both the generation and the judge call.
///
/// Implementations are shared across concurrently running trials and must not
/// keep per-request state.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, EvalError>;
}
