//! Workflow orchestrator.
//!
//! The [`Agent`] classifies a query, runs the chosen workflow and returns an
//! [`AnswerResult`]. Every failure inside a workflow is folded into the
//! result, so `process` has no error path.

use crate::classify::{QueryClassifier, Workflow};
use crate::generator::{LlmTextGenerator, ResilientGenerator, TextGenerator};
use crate::tools::{CalculatorTool, DictionaryTool, Encyclopedia, WikipediaClient};
use crate::types::{AnswerResult, NO_RELEVANT_INFORMATION};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use triage_core::config::ProviderConfig;
use triage_core::{AppConfig, AppError, AppResult};
use triage_knowledge::{assemble_context, open_store, Retriever, DEFAULT_TOP_K};
use triage_llm::{create_client, LlmClient, OllamaClient, RetryPolicy};
use triage_prompt::{load_or_builtin, RAG_ANSWER_PROMPT};

/// Routes queries to the calculator, dictionary or RAG workflow.
pub struct Agent {
    classifier: QueryClassifier,
    calculator: CalculatorTool,
    dictionary: DictionaryTool,
    retriever: Retriever,
    generator: ResilientGenerator,
    top_k: usize,
}

impl Agent {
    pub fn new(
        classifier: QueryClassifier,
        calculator: CalculatorTool,
        dictionary: DictionaryTool,
        retriever: Retriever,
        generator: ResilientGenerator,
    ) -> Self {
        Self {
            classifier,
            calculator,
            dictionary,
            retriever,
            generator,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Number of passages retrieved per RAG query.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Wire the agent from configuration: the configured LLM provider, the
    /// workspace index, Wikipedia, and the routing keyword sets.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let classifier = QueryClassifier::new(&config.routing)?;

        let client = llm_client(config)?;
        let prompt = load_or_builtin(&config.workspace, RAG_ANSWER_PROMPT)?;
        let text_generator: Arc<dyn TextGenerator> =
            Arc::new(LlmTextGenerator::new(client, config.model.clone(), prompt));
        let generator = ResilientGenerator::new(text_generator)
            .with_policy(RetryPolicy::from_settings(&config.retry));

        let store = open_store(&config.workspace, &config.knowledge)?;
        if store.is_empty() {
            tracing::warn!("Knowledge base is empty; run 'triage learn' to add documents");
        }
        let retriever = Retriever::new(Arc::new(store));

        let encyclopedia: Arc<dyn Encyclopedia> = Arc::new(WikipediaClient::new()?);

        Ok(Self::new(
            classifier,
            CalculatorTool::default(),
            DictionaryTool::new(encyclopedia),
            retriever,
            generator,
        )
        .with_top_k(config.retrieval.top_k))
    }

    /// Answer `query` with the workflow the classifier picks.
    pub async fn process(&self, query: &str) -> AnswerResult {
        self.process_with_cancel(query, &CancellationToken::new())
            .await
    }

    /// Like [`Agent::process`]; `cancel` abandons pending generation retries.
    pub async fn process_with_cancel(&self, query: &str, cancel: &CancellationToken) -> AnswerResult {
        let workflow = self.classifier.classify(query);
        tracing::info!("Routing query to {} workflow", workflow);

        match workflow {
            Workflow::Calculator => {
                let result = self.calculator.run(query);
                AnswerResult::Calculator {
                    query: query.to_string(),
                    answer: result.answer(),
                    result,
                }
            }
            Workflow::Dictionary => {
                let result = self.dictionary.run(query).await;
                AnswerResult::Dictionary {
                    query: query.to_string(),
                    answer: result.answer(),
                    result,
                }
            }
            Workflow::Rag => self.answer_from_documents(query, cancel).await,
        }
    }

    async fn answer_from_documents(&self, query: &str, cancel: &CancellationToken) -> AnswerResult {
        let passages = self.retriever.retrieve(query, self.top_k);

        let answer = if passages.is_empty() {
            tracing::info!("No passages retrieved, skipping generation");
            NO_RELEVANT_INFORMATION.to_string()
        } else {
            let context = assemble_context(&passages);
            self.generator
                .generate_with_cancel(&context, query, cancel)
                .await
        };

        AnswerResult::Rag {
            query: query.to_string(),
            answer,
            retrieved_docs: passages,
        }
    }
}

/// Build the client for the active provider.
fn llm_client(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    let provider_config = config.get_provider_config(&config.provider);

    if let Some(ProviderConfig::Ollama {
        endpoint,
        timeout: Some(secs),
        ..
    }) = provider_config
    {
        let client = OllamaClient::with_timeout(endpoint.as_str(), Duration::from_secs(*secs))?;
        return Ok(Arc::new(client));
    }

    let endpoint = provider_config.and_then(|p| p.endpoint());
    let api_key = config.resolve_api_key(&config.provider);

    create_client(&config.provider, endpoint, api_key.as_deref()).map_err(AppError::Config)
}
