pub mod backend;
pub mod error;
pub mod types;

pub use backend::CompletionBackend;
pub use error::{EvalError, Result};
pub use types::*;
