use std::sync::Arc;

use prompteval_core::{CompletionBackend, EvalError, TrialParams, TrialResult};
use tracing::{debug, info};

use crate::{extract_score, meets_expectation};

/// One generate-then-judge round trip.
#[derive(Clone)]
pub struct TrialRunner {
    backend: Arc<dyn CompletionBackend>,
}

impl TrialRunner {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    pub async fn run(&self, params: &TrialParams) -> Result<TrialResult, EvalError> {
        info!("TRIAL: Generating with model {}", params.generation.model);

        let generation = params.generation.request(params.generation_messages());
        let generated_text = self.backend.complete(generation).await?.first_content()?;

        debug!(
            "TRIAL: Generated {} chars: {}...",
            generated_text.len(),
            generated_text.chars().take(80).collect::<String>()
        );

        info!("TRIAL: Evaluating with model {}", params.evaluation.model);

        let evaluation = params
            .evaluation
            .request(params.evaluation_messages(&generated_text));
        let evaluation_text = self.backend.complete(evaluation).await?.first_content()?;

        let meet_expectation =
            meets_expectation(&evaluation_text, params.evaluation_method.as_ref());
        let score = extract_score(&evaluation_text);

        let status = if meet_expectation { "PASS" } else { "FAIL" };
        info!("TRIAL: Result = {} (score: {})", status, score);

        Ok(TrialResult {
            generated_text,
            evaluation_text,
            score,
            meet_expectation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{params, Call, Reply, ScriptedBackend, JUDGE_PROMPT};
    use prompteval_core::{
        BooleanMatch, CompletionChoice, CompletionResponse, EvaluationMethod, Message,
        ModelSettings,
    };

    #[tokio::test]
    async fn test_generates_then_judges_generated_text() {
        let backend = Arc::new(ScriptedBackend::echo());
        let runner = TrialRunner::new(backend.clone());

        let params = params()
            .with_messages(vec![Message::user("Capital of France?")])
            .with_generation(ModelSettings {
                model: "gen-model".into(),
                max_tokens: 64,
                temperature: 0.3,
            })
            .with_evaluation(ModelSettings {
                model: "judge-model".into(),
                max_tokens: 128,
                temperature: 0.0,
            });

        let result = runner.run(&params).await.unwrap();

        assert_eq!(result.generated_text, "answer 0");
        assert_eq!(result.evaluation_text, "Judged 'answer 0'. Score: 0.8");
        assert_eq!(result.score, 0.8);
        assert!(!result.meet_expectation);

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);

        assert_eq!(requests[0].model, "gen-model");
        assert_eq!(requests[0].max_tokens, 64);
        assert_eq!(requests[0].temperature, 0.3);
        assert_eq!(
            requests[0].messages,
            vec![
                Message::system("Answer with a single word."),
                Message::user("Capital of France?")
            ]
        );

        assert_eq!(requests[1].model, "judge-model");
        assert_eq!(requests[1].max_tokens, 128);
        assert_eq!(
            requests[1].messages,
            vec![Message::system(JUDGE_PROMPT), Message::user("answer 0")]
        );
    }

    #[tokio::test]
    async fn test_applies_evaluation_method_to_judge_output() {
        let backend = Arc::new(ScriptedBackend::new(|call| match call {
            Call::Generation(_) => Reply::text("Paris"),
            Call::Evaluation(_) => Reply::text("TRUE"),
        }));
        let runner = TrialRunner::new(backend);

        let params = params().with_evaluation_method(Some(EvaluationMethod::BooleanMatch(
            BooleanMatch {
                expected_value: "true".into(),
            },
        )));

        let result = runner.run(&params).await.unwrap();
        assert!(result.meet_expectation);
        assert_eq!(result.score, 0.0);
    }

    #[tokio::test]
    async fn test_generation_failure_skips_evaluation() {
        let backend = Arc::new(ScriptedBackend::new(|call| match call {
            Call::Generation(_) => Reply::fail("rate limited"),
            Call::Evaluation(_) => Reply::text("unreachable"),
        }));
        let runner = TrialRunner::new(backend.clone());

        let err = runner.run(&params()).await.unwrap_err();

        assert!(matches!(err, EvalError::Backend(ref m) if m == "rate limited"));
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test]
    async fn test_evaluation_failure_is_not_absorbed() {
        let backend = Arc::new(ScriptedBackend::new(|call| match call {
            Call::Generation(_) => Reply::text("Paris"),
            Call::Evaluation(_) => Reply::fail("judge unavailable"),
        }));
        let runner = TrialRunner::new(backend);

        let err = runner.run(&params()).await.unwrap_err();
        assert!(matches!(err, EvalError::Backend(_)));
    }

    #[tokio::test]
    async fn test_missing_choice_fails_the_trial() {
        let backend = Arc::new(ScriptedBackend::new(|call| match call {
            Call::Generation(_) => Reply {
                delay_ms: 0,
                result: Ok(CompletionResponse {
                    choices: vec![CompletionChoice { content: None }],
                }),
            },
            Call::Evaluation(_) => Reply::text("Score: 1"),
        }));
        let runner = TrialRunner::new(backend);

        let err = runner.run(&params()).await.unwrap_err();
        assert!(matches!(err, EvalError::EmptyResponse(_)));
    }
}
