use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
    Client,
};
use async_trait::async_trait;
use prompteval_core::{
    CompletionBackend, CompletionChoice, CompletionRequest, CompletionResponse, EvalError, Message,
    MessageRole,
};
use tracing::debug;

fn llm_err(e: impl ToString) -> EvalError {
    EvalError::Backend(e.to_string())
}

#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    pub api_key: String,
    /// OpenAI-compatible endpoint, e.g. a local inference server.
    pub api_base: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl BackendConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_api_base(mut self, api_base: Option<String>) -> Self {
        self.api_base = api_base;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: Option<u64>) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
}

impl OpenAiBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, EvalError> {
        if config.api_key.trim().is_empty() {
            return Err(EvalError::Config("API key is required".into()));
        }

        let mut openai_config = OpenAIConfig::new().with_api_key(config.api_key.clone());
        if let Some(base) = &config.api_base {
            openai_config = openai_config.with_api_base(base.clone());
        }

        let mut http = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            http = http.timeout(Duration::from_secs(secs));
        }
        let http = http
            .build()
            .map_err(|e| EvalError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client: Client::with_config(openai_config).with_http_client(http),
        })
    }
}

fn to_request_message(msg: &Message) -> Result<ChatCompletionRequestMessage, EvalError> {
    let message = match msg.role {
        MessageRole::System => ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(msg.content.clone())
                .build()
                .map_err(llm_err)?,
        ),
        MessageRole::User => ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(msg.content.clone())
                .build()
                .map_err(llm_err)?,
        ),
        MessageRole::Assistant => ChatCompletionRequestMessage::Assistant(
            ChatCompletionRequestAssistantMessageArgs::default()
                .content(msg.content.clone())
                .build()
                .map_err(llm_err)?,
        ),
    };
    Ok(message)
}

fn to_completion(response: CreateChatCompletionResponse) -> CompletionResponse {
    CompletionResponse {
        choices: response
            .choices
            .into_iter()
            .map(|c| CompletionChoice {
                content: c.message.content,
            })
            .collect(),
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, EvalError> {
        let messages = request
            .messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>, _>>()?;

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&request.model)
            .messages(messages)
            .max_tokens(request.max_tokens)
            .temperature(request.temperature)
            .build()
            .map_err(llm_err)?;

        debug!(
            "Requesting completion from {} ({} messages)",
            request.model,
            request.messages.len()
        );

        let response = self.client.chat().create(chat_request).await.map_err(llm_err)?;
        Ok(to_completion(response))
    }
}
