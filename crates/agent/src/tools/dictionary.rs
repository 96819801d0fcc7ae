//! Dictionary workflow backed by an encyclopedia.

use crate::extract::extract_term;
use crate::types::DefinitionResult;
use std::sync::Arc;
use thiserror::Error;

/// Failure of an encyclopedia lookup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    /// The term names several pages
    #[error("'{}' may refer to several pages", .0.join(", "))]
    Ambiguous(Vec<String>),

    #[error("page not found")]
    NotFound,

    #[error("{0}")]
    Other(String),
}

/// Source of short term summaries.
#[async_trait::async_trait]
pub trait Encyclopedia: Send + Sync {
    /// Short summary of the page for `term`.
    async fn summary(&self, term: &str) -> Result<String, LookupError>;

    /// Titles of pages matching `term`, best first.
    async fn search(&self, term: &str, limit: usize) -> Result<Vec<String>, LookupError>;
}

/// Extracts a term from a query and looks up its definition.
#[derive(Clone)]
pub struct DictionaryTool {
    encyclopedia: Arc<dyn Encyclopedia>,
}

impl DictionaryTool {
    pub fn new(encyclopedia: Arc<dyn Encyclopedia>) -> Self {
        Self { encyclopedia }
    }

    pub async fn run(&self, query: &str) -> DefinitionResult {
        let Some(term) = extract_term(query) else {
            return DefinitionResult::failure("", "No term to define found in the query");
        };

        tracing::debug!("Looking up definition for {:?}", term);

        match self.encyclopedia.summary(&term).await {
            Ok(definition) => DefinitionResult::success(term, definition),
            Err(LookupError::Ambiguous(options)) => self.resolve_ambiguous(&term, options).await,
            Err(LookupError::NotFound) => self.resolve_not_found(&term).await,
            Err(LookupError::Other(message)) => {
                tracing::warn!("Lookup for {:?} failed: {}", term, message);
                DefinitionResult::failure(term, message)
            }
        }
    }

    /// Fall back to the first candidate page.
    async fn resolve_ambiguous(&self, term: &str, options: Vec<String>) -> DefinitionResult {
        tracing::info!("{:?} is ambiguous, {} candidates", term, options.len());

        if let Some(first) = options.first() {
            if let Ok(definition) = self.encyclopedia.summary(first).await {
                return DefinitionResult::success(first.clone(), definition).with_note(format!(
                    "Multiple matches found. Showing definition for '{}'",
                    first
                ));
            }
        }

        let shown: Vec<&str> = options.iter().take(5).map(String::as_str).collect();
        DefinitionResult::failure(
            term,
            format!("Multiple matches found: {}...", shown.join(", ")),
        )
    }

    /// Search for the closest page and summarize it.
    async fn resolve_not_found(&self, term: &str) -> DefinitionResult {
        tracing::info!("No page for {:?}, falling back to search", term);

        let hit = match self.encyclopedia.search(term, 1).await {
            Ok(results) => results.into_iter().next(),
            Err(e) => {
                tracing::warn!("Search for {:?} failed: {}", term, e);
                return DefinitionResult::failure(
                    term,
                    format!("Failed to find definition for '{}'", term),
                );
            }
        };

        let Some(hit) = hit else {
            return DefinitionResult::failure(term, format!("No definition found for '{}'", term));
        };

        match self.encyclopedia.summary(&hit).await {
            Ok(definition) => DefinitionResult::success(hit.clone(), definition).with_note(
                format!("No exact match found. Showing definition for '{}'", hit),
            ),
            Err(e) => {
                tracing::warn!("Summary for {:?} failed: {}", hit, e);
                DefinitionResult::failure(term, format!("Failed to find definition for '{}'", term))
            }
        }
    }
}
