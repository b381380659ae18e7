pub mod matcher;
pub mod runner;
pub mod score;
mod trial;

#[cfg(test)]
mod testing;

pub use matcher::meets_expectation;
pub use runner::{BatchRunner, BatchSummary, BATCH_ERROR_MESSAGE};
pub use score::extract_score;
pub use trial::TrialRunner;
