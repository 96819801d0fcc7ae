//! Heuristic query routing.
//!
//! The classifier is a pure function of the query text and an immutable
//! [`RoutingKeywords`] value. Rules are evaluated in order and the first one
//! that fires decides:
//!
//! 1. a hard-domain term sends the query to RAG;
//! 2. a numeric `a op b` pattern or a calculator trigger selects the calculator;
//! 3. dictionary eligibility, vetoed by override terms and document phrases;
//! 4. everything else goes to RAG.
//!
//! Keyword sets match on word boundaries, so "ai" does not fire inside
//! "blockchain". Document phrases are plain substrings.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use triage_core::{AppError, AppResult, RoutingKeywords};

static NUMERIC_EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\s*[+\-*/]\s*\d+").unwrap());

static WHAT_OR_WHO_IS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:what|who)\s+is\b").unwrap());

static ABOUT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\babout\b").unwrap());

/// The workflow a query is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Workflow {
    Calculator,
    Dictionary,
    Rag,
}

impl Workflow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Workflow::Calculator => "calculator",
            Workflow::Dictionary => "dictionary",
            Workflow::Rag => "rag",
        }
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routes queries to a [`Workflow`].
#[derive(Debug, Clone)]
pub struct QueryClassifier {
    hard_domain: Option<Regex>,
    calculator: Option<Regex>,
    /// One pattern per trigger, in configured order
    dictionary: Vec<Regex>,
    any_dictionary: Option<Regex>,
    overrides: Option<Regex>,
    document_phrases: Vec<String>,
    document_subphrases: Vec<String>,
}

impl QueryClassifier {
    /// Compile the keyword sets.
    pub fn new(keywords: &RoutingKeywords) -> AppResult<Self> {
        let dictionary = keywords
            .dictionary_triggers
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| compile(&term_pattern(t)))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            hard_domain: term_set(&keywords.hard_domain_terms)?,
            calculator: term_set(&keywords.calculator_triggers)?,
            dictionary,
            any_dictionary: term_set(&keywords.dictionary_triggers)?,
            overrides: term_set(&keywords.rag_override_terms)?,
            document_phrases: lowercase_all(&keywords.document_phrases),
            document_subphrases: lowercase_all(&keywords.document_subphrases),
        })
    }

    /// Decide which workflow handles `query`.
    pub fn classify(&self, query: &str) -> Workflow {
        let query = query.to_lowercase();

        if matches(&self.hard_domain, &query) {
            tracing::debug!("Hard-domain term found, routing to rag");
            return Workflow::Rag;
        }

        if self.is_calculation(&query) {
            return Workflow::Calculator;
        }

        if self.is_definition(&query) {
            return Workflow::Dictionary;
        }

        Workflow::Rag
    }

    fn is_calculation(&self, query: &str) -> bool {
        NUMERIC_EXPRESSION.is_match(query) || matches(&self.calculator, query)
    }

    fn is_definition(&self, query: &str) -> bool {
        if matches(&self.overrides, query) {
            tracing::debug!("Override term found, dictionary vetoed");
            return false;
        }

        if self.document_phrases.iter().any(|p| query.contains(p.as_str())) {
            tracing::debug!("Document phrase found, dictionary vetoed");
            return false;
        }

        if WHAT_OR_WHO_IS.is_match(query) {
            if self
                .document_subphrases
                .iter()
                .any(|p| query.contains(p.as_str()))
            {
                return false;
            }

            if matches(&self.overrides, query) {
                return false;
            }

            let has_trigger = matches(&self.any_dictionary, query);
            if ABOUT.is_match(query) && !has_trigger {
                return false;
            }

            // A bare "what is X" is a knowledge question, not a definition
            return has_trigger;
        }

        // Only the text after the trigger is checked for override terms
        self.dictionary.iter().any(|trigger| match trigger.find(query) {
            Some(m) => !matches(&self.overrides, &query[m.end()..]),
            None => false,
        })
    }
}

/// Word-boundary pattern for a single term.
///
/// `\b` is only added on sides where the term starts or ends with a word
/// character, so terms such as "pl/sql" or "c++" still match.
fn term_pattern(term: &str) -> String {
    let term = term.trim().to_lowercase();
    let is_word = |c: char| c.is_alphanumeric() || c == '_';

    let mut pattern = String::new();
    if term.chars().next().is_some_and(is_word) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(&term).replace(' ', r"\s+"));
    if term.chars().last().is_some_and(is_word) {
        pattern.push_str(r"\b");
    }
    pattern
}

/// One alternation over all non-blank terms; `None` for an empty set.
fn term_set(terms: &[String]) -> AppResult<Option<Regex>> {
    let patterns: Vec<String> = terms
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| term_pattern(t))
        .collect();

    if patterns.is_empty() {
        return Ok(None);
    }

    compile(&format!("(?:{})", patterns.join("|"))).map(Some)
}

fn compile(pattern: &str) -> AppResult<Regex> {
    Regex::new(pattern)
        .map_err(|e| AppError::Config(format!("Invalid routing keyword pattern: {}", e)))
}

fn matches(set: &Option<Regex>, text: &str) -> bool {
    set.as_ref().is_some_and(|re| re.is_match(text))
}

fn lowercase_all(phrases: &[String]) -> Vec<String> {
    phrases
        .iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}
