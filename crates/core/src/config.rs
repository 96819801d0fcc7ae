//! Configuration management for triage.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Environment variables
//! - Command-line flags
//! - Config files (.triage/config.yaml)
//!
//! The configuration is workspace-centric, with the index and prompt
//! overrides stored in `.triage/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Main application configuration.
///
/// This struct holds all global configuration options that affect
/// routing, retrieval and answer generation across commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .triage/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Default LLM provider ("ollama" or "gemini")
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Retry policy for answer generation
    pub retry: RetrySettings,

    /// Retrieval settings
    pub retrieval: RetrievalSettings,

    /// Ingestion settings
    pub knowledge: KnowledgeSettings,

    /// Keyword sets driving the query classifier
    pub routing: RoutingKeywords,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    Gemini {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Custom endpoint for the provider, if configured.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ProviderConfig::Gemini { endpoint, .. } => endpoint.as_deref(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }

    /// Model configured for the provider.
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::Gemini { model, .. } | ProviderConfig::Ollama { model, .. } => model,
        }
    }
}

/// Retry policy settings for answer generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    /// Additional attempts allowed after the first one
    #[serde(rename = "maxRetries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff, in seconds
    #[serde(rename = "baseDelaySecs")]
    pub base_delay_secs: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_secs: 2.0,
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of passages requested from the similarity search
    #[serde(rename = "topK")]
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Document ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KnowledgeSettings {
    /// Chunk size in characters
    #[serde(rename = "chunkSize")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks
    #[serde(rename = "chunkOverlap")]
    pub chunk_overlap: usize,

    /// Embedding vector dimension
    #[serde(rename = "embeddingDim")]
    pub embedding_dim: usize,
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            embedding_dim: 384,
        }
    }
}

/// Keyword sets used by the query classifier.
///
/// Built once and handed to the classifier at construction; never mutated
/// afterwards. Any field omitted from the config file keeps its default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RoutingKeywords {
    /// Terms that send a query straight to RAG before any other rule
    #[serde(rename = "hardDomainTerms")]
    pub hard_domain_terms: Vec<String>,

    /// Words that mark an arithmetic request
    #[serde(rename = "calculatorTriggers")]
    pub calculator_triggers: Vec<String>,

    /// Words and phrases that mark a definition request
    #[serde(rename = "dictionaryTriggers")]
    pub dictionary_triggers: Vec<String>,

    /// Terms that veto dictionary routing
    #[serde(rename = "ragOverrideTerms")]
    pub rag_override_terms: Vec<String>,

    /// Phrases that tie the query to the indexed documents
    #[serde(rename = "documentPhrases")]
    pub document_phrases: Vec<String>,

    /// Document phrases checked inside "what is" / "who is" questions
    #[serde(rename = "documentSubphrases")]
    pub document_subphrases: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for RoutingKeywords {
    fn default() -> Self {
        Self {
            hard_domain_terms: strings(&[
                "pl/sql",
                "sql",
                "code",
                "programming",
                "ai",
                "cloud computing",
            ]),
            calculator_triggers: strings(&[
                "calculate",
                "compute",
                "sum",
                "difference",
                "product",
                "divide",
                "multiply",
                "add",
                "subtract",
                "plus",
                "minus",
                "times",
                "divided by",
                "square root",
                "power",
                "percentage",
            ]),
            dictionary_triggers: strings(&[
                "define",
                "meaning of",
                "definition of",
                "explain the term",
                "what does the term",
                "what is the definition",
            ]),
            rag_override_terms: strings(&[
                // people and entities
                "project",
                "about",
                "resume",
                "author",
                "creator",
                "founder",
                "developer",
                "team",
                // document vocabulary
                "document",
                "pdf",
                "file",
                "text",
                "content",
                "paper",
                "report",
                "article",
                "research",
                "publication",
                "book",
                "chapter",
                // indexed domains
                "artificial intelligence",
                "ai",
                "cloud computing",
                "machine learning",
                "ml",
                "deep learning",
                "nlp",
                "natural language processing",
                // technical vocabulary
                "technology",
                "architecture",
                "framework",
                "algorithm",
                "system",
                "protocol",
                "platform",
                "infrastructure",
                "application",
                "software",
                "hardware",
                "device",
                "network",
                "database",
                "data",
            ]),
            document_phrases: strings(&[
                "in the document",
                "in this document",
                "according to the document",
                "mentioned in",
                "based on the",
                "refers to",
                "written in",
                "from the document",
                "from the text",
                "content about",
            ]),
            document_subphrases: strings(&[
                "mentioned about",
                "mentioned in",
                "in the document",
                "said about",
            ]),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    retry: Option<RetrySettings>,
    retrieval: Option<RetrievalSettings>,
    knowledge: Option<KnowledgeSettings>,
    routing: Option<RoutingKeywords>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            retry: RetrySettings::default(),
            retrieval: RetrievalSettings::default(),
            knowledge: KnowledgeSettings::default(),
            routing: RoutingKeywords::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `TRIAGE_WORKSPACE`: Override workspace path
    /// - `TRIAGE_CONFIG`: Path to config file
    /// - `TRIAGE_PROVIDER`: LLM provider
    /// - `TRIAGE_MODEL`: Model identifier
    /// - `TRIAGE_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use triage_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Load configuration with an explicit workspace and config file.
    ///
    /// Given paths win over `TRIAGE_WORKSPACE` and `TRIAGE_CONFIG`. The YAML
    /// file is resolved against the chosen workspace before it is merged.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace
            .or_else(|| std::env::var("TRIAGE_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var("TRIAGE_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.workspace.join(".triage/config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("TRIAGE_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("TRIAGE_MODEL") {
            config.model = model;
        }

        config.api_key = std::env::var("TRIAGE_API_KEY").ok();

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    /// Merge YAML configuration text into this config.
    pub fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        if let Some(retry) = config_file.retry {
            result.retry = retry;
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(knowledge) = config_file.knowledge {
            result.knowledge = knowledge;
        }

        if let Some(routing) = config_file.routing {
            result.routing = routing;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// This method merges command-line flags with the loaded configuration,
    /// giving precedence to CLI flags over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .triage directory.
    pub fn triage_dir(&self) -> PathBuf {
        self.workspace.join(".triage")
    }

    /// Ensure the .triage directory exists.
    pub fn ensure_triage_dir(&self) -> AppResult<()> {
        let triage_dir = self.triage_dir();
        if !triage_dir.exists() {
            std::fs::create_dir_all(&triage_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .triage directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Get the configuration of a provider, if one is declared.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider))
    }

    /// Resolve the API key for a provider.
    ///
    /// `TRIAGE_API_KEY` wins; otherwise the provider's `apiKeyEnv` is read,
    /// falling back to `GOOGLE_API_KEY` for Gemini.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        if let Some(ProviderConfig::Gemini { api_key_env, .. }) = self.get_provider_config(provider)
        {
            if let Ok(key) = std::env::var(api_key_env) {
                return Some(key);
            }
        }

        if provider == "gemini" {
            return std::env::var("GOOGLE_API_KEY").ok();
        }

        None
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let provider = &self.provider;
        let known_providers = ["ollama", "gemini"];

        if !known_providers.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                known_providers.join(", ")
            )));
        }

        if provider == "gemini" && self.resolve_api_key(provider).is_none() {
            return Err(AppError::Config(
                "Gemini provider requires an API key (TRIAGE_API_KEY, apiKeyEnv or GOOGLE_API_KEY)"
                    .to_string(),
            ));
        }

        let base_delay = self.retry.base_delay_secs;
        if !base_delay.is_finite() || base_delay < 0.0 {
            return Err(AppError::Config(format!(
                "retry.baseDelaySecs must be a finite, non-negative number (got {})",
                base_delay
            )));
        }

        Ok(())
    }
}
