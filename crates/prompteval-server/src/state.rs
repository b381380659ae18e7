use std::sync::Arc;

use prompteval_core::{CompletionBackend, EvalError};
use prompteval_llm::{BackendConfig, OpenAiBackend};

use crate::config::ServerConfig;

/// Builds a backend for the caller's API key.
pub type BackendFactory =
    Arc<dyn Fn(&str) -> Result<Arc<dyn CompletionBackend>, EvalError> + Send + Sync>;

pub struct AppState {
    make_backend: BackendFactory,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        let api_base = config.api_base.clone();
        let timeout_secs = config.timeout_secs;

        let make_backend: BackendFactory = Arc::new(move |api_key: &str| {
            let backend_config = BackendConfig::new(api_key)
                .with_api_base(api_base.clone())
                .with_timeout_secs(timeout_secs);
            let backend = OpenAiBackend::new(&backend_config)?;
            Ok(Arc::new(backend) as Arc<dyn CompletionBackend>)
        });

        Self::with_backend_factory(make_backend)
    }

    pub fn with_backend_factory(make_backend: BackendFactory) -> Self {
        Self { make_backend }
    }

    pub fn backend(&self, api_key: &str) -> Result<Arc<dyn CompletionBackend>, EvalError> {
        (self.make_backend)(api_key)
    }
}
