use std::sync::Arc;

use futures::future::try_join_all;
use prompteval_core::{
    BatchResult, CompletionBackend, EvalError, ExecutionMode, TrialParams, TrialResult,
    MAX_NUM_RUNS,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::TrialRunner;

/// The only error text a batch caller ever sees; the cause goes to the log.
pub const BATCH_ERROR_MESSAGE: &str = "An error occurred while evaluating the prompt.";

pub struct BatchRunner {
    trials: TrialRunner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub runs: usize,
    pub passed: usize,
    pub pass_rate: f64,
    pub average_score: f64,
}

impl BatchSummary {
    pub fn from_results(results: &[TrialResult]) -> Self {
        let runs = results.len();
        let passed = results.iter().filter(|r| r.meet_expectation).count();

        if runs == 0 {
            return Self {
                runs,
                passed,
                pass_rate: 0.0,
                average_score: 0.0,
            };
        }

        let n = runs as f64;
        Self {
            runs,
            passed,
            pass_rate: passed as f64 / n,
            average_score: results.iter().map(|r| r.score).sum::<f64>() / n,
        }
    }
}

impl BatchRunner {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            trials: TrialRunner::new(backend),
        }
    }

    /// Runs `num_runs` independent trials (at least one, at most
    /// [`MAX_NUM_RUNS`]) with the same params.
    ///
    /// Results are in trial order for both modes. The first failing trial fails
    /// the whole batch and no partial results are returned.
    pub async fn run(
        &self,
        params: TrialParams,
        num_runs: u32,
        mode: ExecutionMode,
    ) -> Result<Vec<TrialResult>, EvalError> {
        if num_runs > MAX_NUM_RUNS {
            return Err(EvalError::Config(format!(
                "at most {MAX_NUM_RUNS} runs per batch, got {num_runs}"
            )));
        }
        let num_runs = num_runs.max(1) as usize;

        info!("BATCH: Starting {} run(s) in {:?} mode", num_runs, mode);

        let results = match mode {
            ExecutionMode::Sequential => self.run_sequential(&params, num_runs).await?,
            ExecutionMode::Concurrent => self.run_concurrent(&params, num_runs).await?,
        };

        let summary = BatchSummary::from_results(&results);
        info!(
            "BATCH: Completed {} run(s), {} passed, average score {:.2}",
            summary.runs, summary.passed, summary.average_score
        );

        Ok(results)
    }

    /// Like [`BatchRunner::run`], folding any failure into the flat error form.
    pub async fn run_batch(
        &self,
        params: TrialParams,
        num_runs: u32,
        mode: ExecutionMode,
    ) -> BatchResult {
        match self.run(params, num_runs, mode).await {
            Ok(results) => BatchResult::results(results),
            Err(e) => {
                error!("Error evaluating prompt: {}", e);
                BatchResult::error(BATCH_ERROR_MESSAGE)
            }
        }
    }

    async fn run_sequential(
        &self,
        params: &TrialParams,
        num_runs: usize,
    ) -> Result<Vec<TrialResult>, EvalError> {
        let mut results = Vec::new();

        for index in 0..num_runs {
            info!("BATCH: Run {}/{}", index + 1, num_runs);

            let result = self
                .trials
                .run(params)
                .await
                .map_err(|e| EvalError::trial(index, e))?;
            results.push(result);
        }

        Ok(results)
    }

    async fn run_concurrent(
        &self,
        params: &TrialParams,
        num_runs: usize,
    ) -> Result<Vec<TrialResult>, EvalError> {
        let runs = (0..num_runs).map(|index| async move {
            self.trials
                .run(params)
                .await
                .map_err(|e| EvalError::trial(index, e))
        });

        try_join_all(runs).await
    }
}
