use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Completion backend error: {0}")]
    Backend(String),

    #[error("Malformed completion response: {0}")]
    EmptyResponse(String),

    #[error("Trial {index} failed: {source}")]
    TrialFailed {
        index: usize,
        #[source]
        source: Box<EvalError>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EvalError {
    pub fn trial(index: usize, source: EvalError) -> Self {
        EvalError::TrialFailed {
            index,
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
