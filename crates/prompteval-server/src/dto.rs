use std::str::FromStr;

use prompteval_core::{
    BooleanMatch, CsvMatch, EvalError, EvaluationMethodFields, ExactMatch, ExactValue,
    ExecutionMode, Message, ModelSettings, RangeMatch, TrialParams, ValueType,
    DEFAULT_EVALUATOR_PROMPT, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_NUM_RUNS,
    DEFAULT_TEMPERATURE, MAX_NUM_RUNS,
};
use serde::Deserialize;

pub const MISSING_API_KEY: &str = "Please provide a valid API key.";

// === HTTP DTOs ===

/// Flat form submission. Every value arrives as text; blanks mean "not set".
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateForm {
    pub api_key: Option<String>,
    pub prompt: Option<String>,
    pub evaluator_prompt: Option<String>,
    pub model: Option<String>,
    pub evaluation_model: Option<String>,
    pub max_tokens: Option<String>,
    pub evaluation_max_tokens: Option<String>,
    pub temperature: Option<String>,
    pub evaluation_temperature: Option<String>,
    pub num_runs: Option<String>,
    pub run_in_parallel: Option<String>,
    /// JSON array of prior `{role, content}` turns.
    pub messages: Option<String>,
    pub exact_match_value: Option<String>,
    pub exact_match_type: Option<String>,
    pub range_min: Option<String>,
    pub range_max: Option<String>,
    pub csv_match_values: Option<String>,
    pub csv_match_case_sensitive: Option<String>,
    pub boolean_match_value: Option<String>,
}

/// A validated submission, ready for the pipeline.
#[derive(Debug)]
pub struct EvaluateRequest {
    pub api_key: String,
    pub params: TrialParams,
    pub num_runs: u32,
    pub mode: ExecutionMode,
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn checked(value: &Option<String>) -> bool {
    filled(value).is_some_and(|v| {
        matches!(v.trim().to_ascii_lowercase().as_str(), "on" | "true" | "1")
    })
}

fn parse_or<T: FromStr>(field: &str, value: &Option<String>, default: T) -> Result<T, EvalError> {
    match filled(value) {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| EvalError::Config(format!("{field} must be a number, got '{v}'"))),
        None => Ok(default),
    }
}

fn temperature(field: &str, value: &Option<String>) -> Result<f32, EvalError> {
    let t = parse_or(field, value, DEFAULT_TEMPERATURE)?;
    if !(0.0..=1.0).contains(&t) {
        return Err(EvalError::Config(format!("{field} must be between 0 and 1")));
    }
    Ok(t)
}

fn value_type(value: &Option<String>) -> Result<ValueType, EvalError> {
    match filled(value).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("string") => Ok(ValueType::String),
        Some("number") => Ok(ValueType::Number),
        Some("boolean") => Ok(ValueType::Boolean),
        Some(other) => Err(EvalError::Config(format!("unknown exactMatchType '{other}'"))),
    }
}

impl EvaluateForm {
    /// Collects whichever evaluation policies have at least one filled field.
    fn evaluation_fields(&self) -> Result<EvaluationMethodFields, EvalError> {
        let exact_match = match filled(&self.exact_match_value) {
            Some(value) => Some(ExactMatch {
                value: ExactValue::Text(value.to_string()),
                value_type: value_type(&self.exact_match_type)?,
            }),
            None => None,
        };

        let range = if filled(&self.range_min).is_some() || filled(&self.range_max).is_some() {
            Some(RangeMatch {
                min: parse_or("rangeMin", &self.range_min, 0.0)?,
                max: parse_or("rangeMax", &self.range_max, 0.0)?,
            })
        } else {
            None
        };

        let csv_match = filled(&self.csv_match_values).map(|values| CsvMatch {
            expected_values: values.split(',').map(|v| v.trim().to_string()).collect(),
            case_sensitive: checked(&self.csv_match_case_sensitive),
        });

        let boolean_match = filled(&self.boolean_match_value).map(|value| BooleanMatch {
            expected_value: value.to_string(),
        });

        Ok(EvaluationMethodFields {
            exact_match,
            range,
            csv_match,
            boolean_match,
        })
    }
}

impl TryFrom<EvaluateForm> for EvaluateRequest {
    type Error = EvalError;

    fn try_from(form: EvaluateForm) -> Result<Self, Self::Error> {
        let api_key = filled(&form.api_key)
            .ok_or_else(|| EvalError::Config(MISSING_API_KEY.into()))?
            .trim()
            .to_string();

        let prompt = filled(&form.prompt)
            .ok_or_else(|| EvalError::Config("Please provide a prompt.".into()))?
            .to_string();

        let evaluator_prompt = filled(&form.evaluator_prompt)
            .unwrap_or(DEFAULT_EVALUATOR_PROMPT)
            .to_string();

        let generation = ModelSettings {
            model: filled(&form.model).unwrap_or(DEFAULT_MODEL).trim().to_string(),
            max_tokens: parse_or("maxTokens", &form.max_tokens, DEFAULT_MAX_TOKENS)?,
            temperature: temperature("temperature", &form.temperature)?,
        };

        let evaluation = ModelSettings {
            model: filled(&form.evaluation_model).unwrap_or(DEFAULT_MODEL).trim().to_string(),
            max_tokens: parse_or(
                "evaluationMaxTokens",
                &form.evaluation_max_tokens,
                DEFAULT_MAX_TOKENS,
            )?,
            temperature: temperature("evaluationTemperature", &form.evaluation_temperature)?,
        };

        let messages: Vec<Message> = match filled(&form.messages) {
            Some(raw) => serde_json::from_str(raw)?,
            None => Vec::new(),
        };

        let num_runs: i64 = parse_or("numRuns", &form.num_runs, i64::from(DEFAULT_NUM_RUNS))?;
        if num_runs > i64::from(MAX_NUM_RUNS) {
            return Err(EvalError::Config(format!("numRuns must be at most {MAX_NUM_RUNS}")));
        }
        let num_runs = num_runs.max(1) as u32;

        let evaluation_method = form.evaluation_fields()?.resolve();

        let params = TrialParams::new(prompt, evaluator_prompt)
            .with_generation(generation)
            .with_evaluation(evaluation)
            .with_messages(messages)
            .with_evaluation_method(evaluation_method);

        Ok(Self {
            api_key,
            params,
            num_runs,
            mode: ExecutionMode::from_parallel_flag(checked(&form.run_in_parallel)),
        })
    }
}
