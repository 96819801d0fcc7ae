//! In-memory vector store with SQLite persistence.

use crate::embedding::{cosine_similarity, Embedder};
use crate::index;
use crate::types::{ChunkCandidate, KnowledgeChunk, KnowledgeSource};
use std::path::Path;
use std::sync::Arc;
use triage_core::{AppError, AppResult};

const EMBEDDING_MODEL_KEY: &str = "embedding_model";

/// Similarity search over a document corpus.
pub trait SimilaritySearch: Send + Sync {
    /// Return up to `top_k` chunks with scores, most relevant first.
    ///
    /// Scores are never negative. An empty corpus yields an empty list.
    fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Vec<(KnowledgeChunk, f32)>>;

    /// Persist the corpus to `path`, replacing what was there.
    fn save(&self, path: &Path) -> AppResult<()>;

    /// Replace the in-memory corpus with the one stored at `path`.
    fn load(&mut self, path: &Path) -> AppResult<()>;
}

/// Brute-force cosine search over embedded chunks.
#[derive(Debug)]
pub struct VectorStore {
    embedder: Arc<dyn Embedder>,
    sources: Vec<KnowledgeSource>,
    chunks: Vec<KnowledgeChunk>,
}

impl VectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            sources: Vec::new(),
            chunks: Vec::new(),
        }
    }

    /// Open the store persisted at `path`, or an empty one if nothing is there.
    pub fn open(path: &Path, embedder: Arc<dyn Embedder>) -> AppResult<Self> {
        let mut store = Self::new(embedder);
        if path.exists() {
            store.load(path)?;
        } else {
            tracing::debug!("No index at {:?}, starting empty", path);
        }
        Ok(store)
    }

    /// Embed and add the chunks of one source. Returns the number of chunks added.
    pub fn add_source(
        &mut self,
        source: KnowledgeSource,
        candidates: Vec<ChunkCandidate>,
    ) -> AppResult<u32> {
        let mut added = 0u32;

        for candidate in candidates {
            let embedding = self.embedder.embed(&candidate.text)?;
            self.chunks.push(KnowledgeChunk {
                id: uuid::Uuid::new_v4().to_string(),
                source_id: candidate.source_id,
                position: candidate.position,
                text: candidate.text,
                embedding: Some(embedding),
                metadata: candidate.metadata,
            });
            added += 1;
        }

        self.sources.push(source);
        Ok(added)
    }

    /// Drop every source and chunk.
    pub fn clear(&mut self) {
        self.sources.clear();
        self.chunks.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn sources_count(&self) -> usize {
        self.sources.len()
    }

    pub fn chunks_count(&self) -> usize {
        self.chunks.len()
    }
}

impl SimilaritySearch for VectorStore {
    fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Vec<(KnowledgeChunk, f32)>> {
        if self.chunks.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query)?;

        let mut results: Vec<(KnowledgeChunk, f32)> = self
            .chunks
            .iter()
            .filter_map(|chunk| {
                let embedding = chunk.embedding.as_ref()?;
                let score = cosine_similarity(&query_embedding, embedding).max(0.0);
                Some((chunk.clone(), score))
            })
            .collect();

        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);

        tracing::debug!(
            "Retrieved {} chunks (requested top-{})",
            results.len(),
            top_k
        );

        Ok(results)
    }

    fn save(&self, path: &Path) -> AppResult<()> {
        let mut conn = index::init_index(path)?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Knowledge(format!("Failed to start transaction: {}", e)))?;

        index::reset_index(&tx)?;
        index::set_meta(&tx, EMBEDDING_MODEL_KEY, self.embedder.model_name())?;
        for source in &self.sources {
            index::insert_source(&tx, source)?;
        }
        for chunk in &self.chunks {
            index::insert_chunk(&tx, chunk)?;
        }

        tx.commit()
            .map_err(|e| AppError::Knowledge(format!("Failed to commit index: {}", e)))?;

        tracing::info!(
            "Saved {} sources / {} chunks to {:?}",
            self.sources.len(),
            self.chunks.len(),
            path
        );
        Ok(())
    }

    fn load(&mut self, path: &Path) -> AppResult<()> {
        if !path.exists() {
            return Err(AppError::Knowledge(format!("Index not found: {:?}", path)));
        }

        let conn = index::init_index(path)?;

        if let Some(model) = index::get_meta(&conn, EMBEDDING_MODEL_KEY)? {
            if model != self.embedder.model_name() {
                tracing::warn!(
                    "Index was built with embedding model '{}', current model is '{}'",
                    model,
                    self.embedder.model_name()
                );
            }
        }

        self.sources = index::load_sources(&conn)?;
        self.chunks = index::load_chunks(&conn)?;

        tracing::info!(
            "Loaded {} sources / {} chunks from {:?}",
            self.sources.len(),
            self.chunks.len(),
            path
        );
        Ok(())
    }
}
