//! Knowledge base management.
//!
//! Local-first document store for retrieval-augmented answers: text and
//! markdown files are parsed, chunked, embedded with a trigram hasher and
//! persisted in SQLite under `.triage/index.sqlite`.

pub mod chunker;
pub mod context;
pub mod embedding;
pub mod index;
pub mod parser;
pub mod retrieval;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use context::assemble_context;
pub use embedding::{Embedder, TrigramEmbedder};
pub use retrieval::{Retriever, DEFAULT_TOP_K};
pub use store::{SimilaritySearch, VectorStore};
pub use types::{
    BaseStats, KnowledgeChunk, KnowledgeSource, LearnOptions, LearnStats, RetrievedPassage,
};

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use triage_core::config::KnowledgeSettings;
use triage_core::{AppError, AppResult};
use walkdir::WalkDir;

/// Location of the index inside a workspace.
pub fn index_path(workspace: &Path) -> PathBuf {
    workspace.join(".triage").join("index.sqlite")
}

/// Build the embedder configured for the knowledge base.
pub fn embedder_for(settings: &KnowledgeSettings) -> Arc<dyn Embedder> {
    Arc::new(TrigramEmbedder::new(settings.embedding_dim))
}

/// Open the workspace's vector store; empty if nothing has been learned yet.
pub fn open_store(workspace: &Path, settings: &KnowledgeSettings) -> AppResult<VectorStore> {
    VectorStore::open(&index_path(workspace), embedder_for(settings))
}

/// Learn from files and directories and persist the knowledge base.
pub fn learn(
    workspace: &Path,
    options: &LearnOptions,
    settings: &KnowledgeSettings,
) -> AppResult<LearnStats> {
    let start = Instant::now();
    let path = index_path(workspace);

    tracing::info!("Starting learn operation into {:?}", path);

    let mut store = if options.reset {
        tracing::info!("Resetting knowledge base");
        VectorStore::new(embedder_for(settings))
    } else {
        open_store(workspace, settings)?
    };

    let mut sources_count = 0u32;
    let mut chunks_count = 0u32;
    let mut bytes_processed = 0u64;

    for file in collect_files(options)? {
        match process_file(&mut store, &file, settings) {
            Ok((chunks, bytes)) => {
                sources_count += 1;
                chunks_count += chunks;
                bytes_processed += bytes;
            }
            Err(e) => tracing::warn!("Skipping {:?}: {}", file, e),
        }
    }

    store.save(&path)?;

    let duration = start.elapsed();

    tracing::info!(
        "Learn operation completed: {} sources, {} chunks, {} bytes in {:.2}s",
        sources_count,
        chunks_count,
        bytes_processed,
        duration.as_secs_f64()
    );

    Ok(LearnStats {
        sources_count,
        chunks_count,
        bytes_processed,
        duration_secs: duration.as_secs_f64(),
    })
}

/// Expand the requested paths into the supported files to learn.
fn collect_files(options: &LearnOptions) -> AppResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in &options.paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let entry_path = entry.path();
                if entry_path.is_file()
                    && parser::ContentType::from_path(entry_path).is_supported()
                    && should_include(entry_path, options)
                {
                    files.push(entry_path.to_path_buf());
                }
            }
        } else {
            return Err(AppError::Knowledge(format!(
                "Path does not exist: {:?}",
                path
            )));
        }
    }

    Ok(files)
}

/// Parse, chunk and embed one file into the store.
fn process_file(
    store: &mut VectorStore,
    path: &Path,
    settings: &KnowledgeSettings,
) -> AppResult<(u32, u64)> {
    tracing::debug!("Processing file: {:?}", path);

    let text = parser::parse_file(path)?;
    let size_bytes = text.len() as u64;

    let source_id = uuid::Uuid::new_v4().to_string();
    let mut candidates = chunker::chunk_text(
        &source_id,
        &text,
        settings.chunk_size,
        settings.chunk_overlap,
    );
    let path_label = path.to_string_lossy().to_string();
    for candidate in &mut candidates {
        if let serde_json::Value::Object(map) = &mut candidate.metadata {
            map.insert("source".to_string(), path_label.clone().into());
        }
    }

    let source = KnowledgeSource {
        id: source_id,
        path: path.to_path_buf(),
        content_type: parser::ContentType::from_path(path).as_str().to_string(),
        learned_at: Utc::now(),
        size_bytes,
    };

    let chunks_count = store.add_source(source, candidates)?;

    tracing::debug!(
        "Processed {:?}: {} chunks, {} bytes",
        path,
        chunks_count,
        size_bytes
    );

    Ok((chunks_count, size_bytes))
}

/// Check if a file should be included based on substring patterns.
fn should_include(path: &Path, options: &LearnOptions) -> bool {
    let path_str = path.to_string_lossy();

    if options.exclude.iter().any(|p| path_str.contains(p.as_str())) {
        return false;
    }

    options.include.is_empty() || options.include.iter().any(|p| path_str.contains(p.as_str()))
}

/// Clean (reset) the knowledge base. Returns `false` if there was no index.
pub fn clean(workspace: &Path) -> AppResult<bool> {
    let path = index_path(workspace);
    if !path.exists() {
        tracing::info!("No knowledge base to clean at {:?}", path);
        return Ok(false);
    }

    let conn = index::init_index(&path)?;
    index::reset_index(&conn)?;

    tracing::info!("Knowledge base cleaned");
    Ok(true)
}

/// Get statistics for the knowledge base.
pub fn stats(workspace: &Path) -> AppResult<BaseStats> {
    let path = index_path(workspace);
    if !path.exists() {
        return Err(AppError::Knowledge(
            "Knowledge base has no index. Run 'triage learn' first.".to_string(),
        ));
    }

    let conn = index::init_index(&path)?;
    let (sources_count, chunks_count) = index::get_stats(&conn)?;
    let db_size_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

    Ok(BaseStats {
        sources_count,
        chunks_count,
        db_size_bytes,
    })
}
