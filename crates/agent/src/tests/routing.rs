//! End-to-end routing scenarios with stubbed collaborators.

use crate::generator::{ResilientGenerator, TextGenerator, CANCELLED_MESSAGE};
use crate::tools::{CalculatorTool, DictionaryTool, Encyclopedia, LookupError};
use crate::types::{AnswerResult, Status, NO_RELEVANT_INFORMATION};
use crate::{Agent, QueryClassifier, Workflow};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use triage_core::config::KnowledgeSettings;
use triage_core::{AppError, AppResult, RoutingKeywords};
use triage_knowledge::{learn, open_store, LearnOptions, Retriever, VectorStore};
use triage_llm::Sleeper;

struct StubEncyclopedia;

#[async_trait::async_trait]
impl Encyclopedia for StubEncyclopedia {
    async fn summary(&self, term: &str) -> Result<String, LookupError> {
        match term {
            "osmosis" => Ok("Osmosis is the spontaneous net movement of solvent molecules \
                through a selectively permeable membrane."
                .to_string()),
            "blockchain" => Ok("A blockchain is a distributed ledger.".to_string()),
            _ => Err(LookupError::NotFound),
        }
    }

    async fn search(&self, _term: &str, _limit: usize) -> Result<Vec<String>, LookupError> {
        Ok(Vec::new())
    }
}

/// Fails `failures` times with a rate-limit message, then answers.
struct StubGenerator {
    failures: u32,
    calls: AtomicU32,
    contexts: Mutex<Vec<String>>,
}

impl StubGenerator {
    fn failing(failures: u32) -> Arc<Self> {
        Arc::new(Self {
            failures,
            calls: AtomicU32::new(0),
            contexts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TextGenerator for StubGenerator {
    async fn run(&self, context: &str, _question: &str) -> AppResult<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().unwrap().push(context.to_string());
        if call < self.failures {
            return Err(AppError::Llm(
                "429 Too Many Requests: quota exceeded".to_string(),
            ));
        }
        Ok("Generated answer.".to_string())
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

fn empty_store() -> VectorStore {
    let dir = TempDir::new().unwrap();
    open_store(dir.path(), &KnowledgeSettings::default()).unwrap()
}

fn learned_store(workspace: &Path) -> VectorStore {
    let docs = workspace.join("docs");
    std::fs::create_dir_all(&docs).unwrap();
    std::fs::write(
        docs.join("ai.md"),
        "# Artificial intelligence\n\nAI systems learn patterns from data. \
         Machine learning models are trained on examples.",
    )
    .unwrap();
    std::fs::write(
        docs.join("ledger.txt"),
        "The project ledger records every transaction in append-only blocks.",
    )
    .unwrap();

    let settings = KnowledgeSettings::default();
    let options = LearnOptions {
        paths: vec![docs],
        ..Default::default()
    };
    learn(workspace, &options, &settings).unwrap();
    open_store(workspace, &settings).unwrap()
}

fn agent(
    store: VectorStore,
    generator: Arc<StubGenerator>,
    sleeper: Arc<RecordingSleeper>,
) -> Agent {
    Agent::new(
        QueryClassifier::new(&RoutingKeywords::default()).unwrap(),
        CalculatorTool::default(),
        DictionaryTool::new(Arc::new(StubEncyclopedia)),
        Retriever::new(Arc::new(store)),
        ResilientGenerator::new(generator).with_sleeper(sleeper),
    )
}

#[tokio::test]
async fn test_calculation_query() {
    let agent = agent(
        empty_store(),
        StubGenerator::failing(0),
        Arc::default(),
    );

    match agent.process("calculate 25 * 4").await {
        AnswerResult::Calculator { answer, result, .. } => {
            assert_eq!(result.status, Status::Success);
            assert_eq!(result.expression, "25 * 4");
            assert_eq!(result.value, Some(100.0));
            assert_eq!(answer, "The result is 100");
        }
        other => panic!("expected calculator result, got {:?}", other.workflow()),
    }
}

#[tokio::test]
async fn test_definition_query() {
    let agent = agent(
        empty_store(),
        StubGenerator::failing(0),
        Arc::default(),
    );

    match agent.process("define osmosis").await {
        AnswerResult::Dictionary { result, answer, .. } => {
            assert_eq!(result.status, Status::Success);
            assert_eq!(result.term, "osmosis");
            assert!(!answer.is_empty());
            assert!(answer.starts_with("Osmosis is"));
        }
        other => panic!("expected dictionary result, got {:?}", other.workflow()),
    }
}

#[tokio::test]
async fn test_blockchain_routing() {
    let generator = StubGenerator::failing(0);
    let agent = agent(empty_store(), generator.clone(), Arc::default());

    let defined = agent.process("define blockchain").await;
    assert_eq!(defined.workflow(), Workflow::Dictionary);
    assert_eq!(defined.answer(), "A blockchain is a distributed ledger.");

    let asked = agent.process("what is blockchain").await;
    assert_eq!(asked.workflow(), Workflow::Rag);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_define_ai_never_reaches_dictionary() {
    let generator = StubGenerator::failing(0);
    let agent = agent(empty_store(), generator.clone(), Arc::default());

    let result = agent.process("define AI").await;
    assert_eq!(result.workflow(), Workflow::Rag);
}

#[tokio::test]
async fn test_empty_retrieval_skips_generation() {
    let generator = StubGenerator::failing(0);
    let agent = agent(empty_store(), generator.clone(), Arc::default());

    match agent.process("what does the handbook say about onboarding").await {
        AnswerResult::Rag {
            answer,
            retrieved_docs,
            ..
        } => {
            assert_eq!(answer, NO_RELEVANT_INFORMATION);
            assert!(retrieved_docs.is_empty());
        }
        other => panic!("expected rag result, got {:?}", other.workflow()),
    }
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_rag_generates_from_retrieved_context() {
    let dir = TempDir::new().unwrap();
    let generator = StubGenerator::failing(0);
    let agent = agent(learned_store(dir.path()), generator.clone(), Arc::default());

    match agent.process("how are machine learning models trained?").await {
        AnswerResult::Rag {
            answer,
            retrieved_docs,
            ..
        } => {
            assert_eq!(answer, "Generated answer.");
            assert_eq!(retrieved_docs.len(), 2);
            assert!(retrieved_docs[0].content.contains("Machine learning"));
            assert!(retrieved_docs[0].relevance_score >= retrieved_docs[1].relevance_score);
        }
        other => panic!("expected rag result, got {:?}", other.workflow()),
    }

    let contexts = generator.contexts.lock().unwrap();
    assert_eq!(contexts.len(), 1);
    assert!(contexts[0].contains("Machine learning"));
    assert!(contexts[0].contains("\n\n"));
}

#[tokio::test]
async fn test_rag_retries_rate_limited_generation() {
    let dir = TempDir::new().unwrap();
    let generator = StubGenerator::failing(2);
    let sleeper = Arc::new(RecordingSleeper::default());
    let agent = agent(learned_store(dir.path()), generator.clone(), sleeper.clone());

    let result = agent.process("what is in the project ledger?").await;

    assert_eq!(result.workflow(), Workflow::Rag);
    assert_eq!(result.answer(), "Generated answer.");
    assert_eq!(generator.calls(), 3);

    let delays = sleeper.delays.lock().unwrap().clone();
    assert_eq!(delays.len(), 2);
    for (k, delay) in delays.iter().enumerate() {
        let floor = Duration::from_secs(2 << k);
        assert!(*delay >= floor && *delay < floor + Duration::from_secs(2));
    }
}

#[tokio::test]
async fn test_cancellation_abandons_generation() {
    let dir = TempDir::new().unwrap();
    let generator = StubGenerator::failing(0);
    let agent = agent(learned_store(dir.path()), generator.clone(), Arc::default());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = agent
        .process_with_cancel("what is in the project ledger?", &cancel)
        .await;

    assert_eq!(result.answer(), CANCELLED_MESSAGE);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_degenerate_queries_still_answer() {
    let agent = agent(
        empty_store(),
        StubGenerator::failing(0),
        Arc::default(),
    );

    for query in ["", "   ", "(((", "define", "calculate", "what is ?", "1 / 0 + 1"] {
        let result = agent.process(query).await;
        assert!(!result.answer().is_empty(), "empty answer for {:?}", query);
    }
}
