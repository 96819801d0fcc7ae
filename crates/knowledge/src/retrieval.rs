//! Retriever adapter between the similarity search and the answer pipeline.

use crate::store::SimilaritySearch;
use crate::types::{KnowledgeChunk, RetrievedPassage};
use std::sync::Arc;

/// Default number of passages fetched per query.
pub const DEFAULT_TOP_K: usize = 3;

/// Shapes similarity-search hits into [`RetrievedPassage`]s.
///
/// The retriever does no ranking of its own and never fails: search errors
/// are logged and yield no passages.
#[derive(Clone)]
pub struct Retriever {
    search: Arc<dyn SimilaritySearch>,
}

impl Retriever {
    pub fn new(search: Arc<dyn SimilaritySearch>) -> Self {
        Self { search }
    }

    /// Fetch up to `top_k` passages for `query`, most relevant first.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Vec<RetrievedPassage> {
        let hits = match self.search.retrieve(query, top_k) {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("Similarity search failed, continuing without passages: {}", e);
                return Vec::new();
            }
        };

        let passages: Vec<RetrievedPassage> = hits
            .into_iter()
            .map(|(chunk, score)| to_passage(chunk, score))
            .collect();

        tracing::info!("Retrieved {} passages", passages.len());
        passages
    }
}

fn to_passage(chunk: KnowledgeChunk, score: f32) -> RetrievedPassage {
    let mut metadata = match chunk.metadata {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Null => serde_json::Map::new(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    metadata.insert("source_id".to_string(), chunk.source_id.into());
    metadata.insert("position".to_string(), chunk.position.into());

    RetrievedPassage {
        content: chunk.text,
        relevance_score: score.max(0.0),
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use triage_core::{AppError, AppResult};

    struct FixedSearch(Vec<(KnowledgeChunk, f32)>);

    impl SimilaritySearch for FixedSearch {
        fn retrieve(&self, _query: &str, top_k: usize) -> AppResult<Vec<(KnowledgeChunk, f32)>> {
            Ok(self.0.iter().take(top_k).cloned().collect())
        }
        fn save(&self, _path: &Path) -> AppResult<()> {
            Ok(())
        }
        fn load(&mut self, _path: &Path) -> AppResult<()> {
            Ok(())
        }
    }

    struct BrokenSearch;

    impl SimilaritySearch for BrokenSearch {
        fn retrieve(&self, _query: &str, _top_k: usize) -> AppResult<Vec<(KnowledgeChunk, f32)>> {
            Err(AppError::Knowledge("index corrupted".to_string()))
        }
        fn save(&self, _path: &Path) -> AppResult<()> {
            Ok(())
        }
        fn load(&mut self, _path: &Path) -> AppResult<()> {
            Ok(())
        }
    }

    fn chunk(text: &str, position: u32) -> KnowledgeChunk {
        KnowledgeChunk {
            id: format!("c{}", position),
            source_id: "doc".to_string(),
            position,
            text: text.to_string(),
            embedding: None,
            metadata: serde_json::json!({"start": 0, "end": text.len()}),
        }
    }

    #[test]
    fn test_shapes_hits_in_order() {
        let retriever = Retriever::new(Arc::new(FixedSearch(vec![
            (chunk("first", 0), 0.9),
            (chunk("second", 1), 0.4),
        ])));

        let passages = retriever.retrieve("q", DEFAULT_TOP_K);
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].content, "first");
        assert_eq!(passages[0].relevance_score, 0.9);
        assert_eq!(passages[0].metadata["source_id"], "doc");
        assert_eq!(passages[1].metadata["position"], 1);
        assert_eq!(passages[1].metadata["start"], 0);
    }

    #[test]
    fn test_respects_top_k() {
        let retriever = Retriever::new(Arc::new(FixedSearch(vec![
            (chunk("a", 0), 0.9),
            (chunk("b", 1), 0.8),
            (chunk("c", 2), 0.7),
            (chunk("d", 3), 0.6),
        ])));
        assert_eq!(retriever.retrieve("q", 3).len(), 3);
    }

    #[test]
    fn test_negative_scores_clamped() {
        let retriever = Retriever::new(Arc::new(FixedSearch(vec![(chunk("a", 0), -0.2)])));
        assert_eq!(retriever.retrieve("q", 3)[0].relevance_score, 0.0);
    }

    #[test]
    fn test_search_error_degrades_to_empty() {
        let retriever = Retriever::new(Arc::new(BrokenSearch));
        assert!(retriever.retrieve("q", 3).is_empty());
    }
}
