//! Answer generation for the RAG workflow.

use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use triage_core::AppResult;
use triage_llm::{
    run_with_retry, DefaultFailureClassifier, FailureClassifier, FailureKind, LlmClient,
    LlmRequest, RetryOutcome, RetryPolicy, Sleeper, TokioSleeper,
};
use triage_prompt::{build_prompt, PromptDefinition};

pub const QUOTA_MESSAGE: &str = "I'm unable to generate a response due to API rate limits. Options:\n1. Wait for quota to reset\n2. Check your API plan\n3. Ensure your API key is valid";

pub const AUTH_MESSAGE: &str =
    "There's an issue with the API key. Please check your API key configuration.";

pub const CANCELLED_MESSAGE: &str = "Response generation was cancelled.";

/// Produces an answer from retrieved context.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn run(&self, context: &str, question: &str) -> AppResult<String>;
}

/// Renders the answer prompt and sends it to an LLM.
pub struct LlmTextGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
}

impl LlmTextGenerator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, prompt: PromptDefinition) -> Self {
        Self {
            client,
            model: model.into(),
            prompt,
        }
    }
}

#[async_trait::async_trait]
impl TextGenerator for LlmTextGenerator {
    async fn run(&self, context: &str, question: &str) -> AppResult<String> {
        let variables = HashMap::from([
            ("context".to_string(), context.to_string()),
            ("question".to_string(), question.to_string()),
        ]);
        let built = build_prompt(&self.prompt, variables)?;

        let mut request = LlmRequest::new(built.user, &self.model);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(temperature) = built.generation.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = built.generation.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        tracing::debug!(
            "Generating with {} ({}), prompt {}",
            self.client.provider_name(),
            self.model,
            built.metadata.source_prompt_id
        );

        let response = self.client.complete(&request).await?;
        Ok(response.content.trim().to_string())
    }
}

/// Wraps a [`TextGenerator`] with rate-limit retries.
///
/// Never fails: exhausted or cancelled generations become user-facing text.
pub struct ResilientGenerator {
    inner: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
    classifier: Arc<dyn FailureClassifier>,
    sleeper: Arc<dyn Sleeper>,
}

impl ResilientGenerator {
    pub fn new(inner: Arc<dyn TextGenerator>) -> Self {
        Self {
            inner,
            policy: RetryPolicy::default(),
            classifier: Arc::new(DefaultFailureClassifier),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub async fn generate(&self, context: &str, question: &str) -> String {
        self.generate_with_cancel(context, question, &CancellationToken::new())
            .await
    }

    pub async fn generate_with_cancel(
        &self,
        context: &str,
        question: &str,
        cancel: &CancellationToken,
    ) -> String {
        let outcome = run_with_retry(
            &self.policy,
            self.classifier.as_ref(),
            self.sleeper.as_ref(),
            cancel,
            |_| self.inner.run(context, question),
        )
        .await;

        match outcome {
            RetryOutcome::Succeeded { value, .. } => value,
            RetryOutcome::Exhausted { error, kind, .. } => match kind {
                FailureKind::RateLimited { .. } => QUOTA_MESSAGE.to_string(),
                FailureKind::Auth => AUTH_MESSAGE.to_string(),
                FailureKind::Other => format!("Error generating response: {}", error),
            },
            RetryOutcome::Cancelled { .. } => CANCELLED_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use triage_core::AppError;
    use triage_llm::{LlmResponse, LlmUsage};
    use triage_prompt::{builtin_prompt, RAG_ANSWER_PROMPT};

    /// Fails with the given errors in order, then answers.
    struct ScriptedGenerator {
        failures: Mutex<Vec<AppError>>,
        calls: AtomicU32,
    }

    impl ScriptedGenerator {
        fn new(failures: Vec<AppError>) -> Self {
            Self {
                failures: Mutex::new(failures),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn run(&self, _context: &str, _question: &str) -> AppResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut failures = self.failures.lock().unwrap();
            if failures.is_empty() {
                Ok("Osmosis moves water.".to_string())
            } else {
                Err(failures.remove(0))
            }
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait::async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, delay: Duration, cancel: &CancellationToken) -> bool {
            self.delays.lock().unwrap().push(delay);
            !cancel.is_cancelled()
        }
    }

    fn rate_limited() -> AppError {
        AppError::Llm("429 Resource has been exhausted (e.g. check quota).".to_string())
    }

    fn resilient(inner: Arc<ScriptedGenerator>, sleeper: Arc<RecordingSleeper>) -> ResilientGenerator {
        ResilientGenerator::new(inner).with_sleeper(sleeper)
    }

    #[tokio::test]
    async fn test_retries_rate_limits_then_succeeds() {
        let inner = Arc::new(ScriptedGenerator::new(vec![rate_limited(), rate_limited()]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let answer = resilient(inner.clone(), sleeper.clone())
            .generate("context", "question")
            .await;

        assert_eq!(answer, "Osmosis moves water.");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);

        let delays = sleeper.delays.lock().unwrap().clone();
        assert_eq!(delays.len(), 2);
        for (k, delay) in delays.iter().enumerate() {
            let floor = Duration::from_secs(2 << k);
            assert!(*delay >= floor && *delay < floor + Duration::from_secs(2));
        }
    }

    #[tokio::test]
    async fn test_exhausted_rate_limit_gives_quota_message() {
        let inner = Arc::new(ScriptedGenerator::new((0..4).map(|_| rate_limited()).collect()));
        let sleeper = Arc::new(RecordingSleeper::default());

        let answer = resilient(inner.clone(), sleeper).generate("c", "q").await;

        assert_eq!(answer, QUOTA_MESSAGE);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let inner = Arc::new(ScriptedGenerator::new(vec![AppError::Auth(
            "API key not valid".to_string(),
        )]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let answer = resilient(inner.clone(), sleeper.clone()).generate("c", "q").await;

        assert_eq!(answer, AUTH_MESSAGE);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_failure_is_reported() {
        let inner = Arc::new(ScriptedGenerator::new(vec![AppError::Llm(
            "connection refused".to_string(),
        )]));
        let answer = resilient(inner, Arc::new(RecordingSleeper::default()))
            .generate("c", "q")
            .await;

        assert_eq!(answer, "Error generating response: LLM error: connection refused");
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let inner = Arc::new(ScriptedGenerator::new(vec![]));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let answer = resilient(inner.clone(), Arc::new(RecordingSleeper::default()))
            .generate_with_cancel("c", "q", &cancel)
            .await;

        assert_eq!(answer, CANCELLED_MESSAGE);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 0);
    }

    struct EchoClient {
        requests: Mutex<Vec<LlmRequest>>,
    }

    #[async_trait::async_trait]
    impl LlmClient for EchoClient {
        fn provider_name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(LlmResponse {
                content: "  An answer.\n".to_string(),
                model: request.model.clone(),
                usage: LlmUsage::default(),
                done: true,
            })
        }
    }

    #[tokio::test]
    async fn test_llm_generator_renders_prompt() {
        let client = Arc::new(EchoClient {
            requests: Mutex::new(Vec::new()),
        });
        let prompt = builtin_prompt(RAG_ANSWER_PROMPT).unwrap();
        let generator = LlmTextGenerator::new(client.clone(), "llama3.2", prompt);

        let answer = generator
            .run("Osmosis is diffusion of water.", "What is osmosis?")
            .await
            .unwrap();

        assert_eq!(answer, "An answer.");
        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "llama3.2");
        assert!(requests[0].prompt.contains("Osmosis is diffusion of water."));
        assert!(requests[0].prompt.contains("What is osmosis?"));
        assert_eq!(requests[0].temperature, Some(0.1));
    }
}
