use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use prompteval_core::{
    CompletionBackend, CompletionRequest, CompletionResponse, EvalError, MessageRole, TrialParams,
};

pub(crate) const JUDGE_PROMPT: &str = "Judge the answer. End with Score: <n>.";

pub(crate) fn params() -> TrialParams {
    TrialParams::new("Answer with a single word.", JUDGE_PROMPT)
}

/// Which leg of a trial a request belongs to.
pub(crate) enum Call<'a> {
    /// Generation calls are numbered in arrival order.
    Generation(usize),
    /// Carries the generated text being judged.
    Evaluation(&'a str),
}

pub(crate) struct Reply {
    pub delay_ms: u64,
    pub result: Result<CompletionResponse, EvalError>,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            result: Ok(CompletionResponse::from_text(content)),
        }
    }

    pub fn fail(message: &str) -> Self {
        Self {
            delay_ms: 0,
            result: Err(EvalError::Backend(message.to_string())),
        }
    }

    pub fn after(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

type Handler = Box<dyn Fn(Call<'_>) -> Reply + Send + Sync>;

pub(crate) struct ScriptedBackend {
    handler: Handler,
    generation_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub requests: Mutex<Vec<CompletionRequest>>,
    pub finished_generations: Mutex<Vec<usize>>,
}

impl ScriptedBackend {
    pub fn new(handler: impl Fn(Call<'_>) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            generation_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            finished_generations: Mutex::new(Vec::new()),
        }
    }

    /// Generation `n` answers `answer n`; the judge echoes it with a score.
    pub fn echo() -> Self {
        Self::new(|call| match call {
            Call::Generation(n) => Reply::text(format!("answer {n}")),
            Call::Evaluation(text) => Reply::text(format!("Judged '{text}'. Score: 0.8")),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, EvalError> {
        let is_evaluation = request
            .messages
            .first()
            .is_some_and(|m| m.role == MessageRole::System && m.content == JUDGE_PROMPT);

        let generation_index = (!is_evaluation)
            .then(|| self.generation_calls.fetch_add(1, Ordering::SeqCst));

        let reply = match generation_index {
            Some(n) => (self.handler)(Call::Generation(n)),
            None => {
                let judged = request.messages.get(1).map(|m| m.content.as_str()).unwrap_or("");
                (self.handler)(Call::Evaluation(judged))
            }
        };

        self.requests.lock().unwrap().push(request);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if reply.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(reply.delay_ms)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(n) = generation_index {
            self.finished_generations.lock().unwrap().push(n);
        }

        reply.result
    }
}
