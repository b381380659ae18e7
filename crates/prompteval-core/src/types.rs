use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::EvalError;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: u32 = 800;
pub const DEFAULT_TEMPERATURE: f32 = 0.0;
pub const DEFAULT_NUM_RUNS: u32 = 1;
/// Upper bound on trials in one batch.
pub const MAX_NUM_RUNS: u32 = 100;
pub const DEFAULT_EVALUATOR_PROMPT: &str = "Please provide an evaluation of the generated text based on its quality, coherence, and relevance to the prompt. Include a score between 0 and 1.";

// === Conversation ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

// === Evaluation method ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Number,
    Boolean,
    #[default]
    String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExactValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for ExactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExactValue::Boolean(b) => write!(f, "{b}"),
            ExactValue::Number(n) => write!(f, "{n}"),
            ExactValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExactMatch {
    pub value: ExactValue,
    /// Declared type of `value`. Matching always compares text.
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeMatch {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMatch {
    pub expected_values: Vec<String>,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanMatch {
    pub expected_value: String,
}

/// The single active pass/fail policy applied to judge output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EvaluationMethod {
    ExactMatch(ExactMatch),
    Range(RangeMatch),
    CsvMatch(CsvMatch),
    BooleanMatch(BooleanMatch),
}

/// Loose shape where any number of policies may be filled in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationMethodFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_match: Option<ExactMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_match: Option<CsvMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean_match: Option<BooleanMatch>,
}

impl EvaluationMethodFields {
    /// Picks the first populated policy in the order
    /// exactMatch, range, csvMatch, booleanMatch.
    pub fn resolve(self) -> Option<EvaluationMethod> {
        let populated = [
            self.exact_match.is_some(),
            self.range.is_some(),
            self.csv_match.is_some(),
            self.boolean_match.is_some(),
        ]
        .into_iter()
        .filter(|p| *p)
        .count();

        if populated > 1 {
            debug!("{} evaluation methods supplied, lower precedence ones ignored", populated);
        }

        let Self {
            exact_match,
            range,
            csv_match,
            boolean_match,
        } = self;

        exact_match
            .map(EvaluationMethod::ExactMatch)
            .or_else(|| range.map(EvaluationMethod::Range))
            .or_else(|| csv_match.map(EvaluationMethod::CsvMatch))
            .or_else(|| boolean_match.map(EvaluationMethod::BooleanMatch))
    }
}

// === Trial configuration ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ModelSettings {
    pub fn request(&self, messages: Vec<Message>) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Everything a single trial needs. Shared read-only between trials of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialParams {
    pub generation: ModelSettings,
    pub evaluation: ModelSettings,
    pub prompt: String,
    pub evaluator_prompt: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub evaluation_method: Option<EvaluationMethod>,
}

impl TrialParams {
    pub fn new(prompt: impl Into<String>, evaluator_prompt: impl Into<String>) -> Self {
        Self {
            generation: ModelSettings::default(),
            evaluation: ModelSettings::default(),
            prompt: prompt.into(),
            evaluator_prompt: evaluator_prompt.into(),
            messages: Vec::new(),
            evaluation_method: None,
        }
    }

    pub fn with_generation(mut self, settings: ModelSettings) -> Self {
        self.generation = settings;
        self
    }

    pub fn with_evaluation(mut self, settings: ModelSettings) -> Self {
        self.evaluation = settings;
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_evaluation_method(mut self, method: Option<EvaluationMethod>) -> Self {
        self.evaluation_method = method;
        self
    }

    /// `[system: prompt]` followed by the prior conversation.
    pub fn generation_messages(&self) -> Vec<Message> {
        std::iter::once(Message::system(self.prompt.clone()))
            .chain(self.messages.iter().cloned())
            .collect()
    }

    pub fn evaluation_messages(&self, generated_text: &str) -> Vec<Message> {
        vec![
            Message::system(self.evaluator_prompt.clone()),
            Message::user(generated_text),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Concurrent,
}

impl ExecutionMode {
    pub fn from_parallel_flag(parallel: bool) -> Self {
        if parallel {
            ExecutionMode::Concurrent
        } else {
            ExecutionMode::Sequential
        }
    }
}

// === Results ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialResult {
    pub generated_text: String,
    pub evaluation_text: String,
    pub score: f64,
    pub meet_expectation: bool,
}

/// Outcome of one orchestration call: every trial result, or one flat error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchResult {
    Results { results: Vec<TrialResult> },
    Error { error: String },
}

impl BatchResult {
    pub fn results(results: Vec<TrialResult>) -> Self {
        Self::Results { results }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

// === Completion contract ===

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionChoice {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
}

impl CompletionResponse {
    pub fn from_text(content: impl Into<String>) -> Self {
        Self {
            choices: vec![CompletionChoice {
                content: Some(content.into()),
            }],
        }
    }

    /// Content of the first choice.
    pub fn first_content(self) -> Result<String, EvalError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| EvalError::EmptyResponse("No choices returned".into()))?;

        choice
            .content
            .ok_or_else(|| EvalError::EmptyResponse("No response content".into()))
    }
}
