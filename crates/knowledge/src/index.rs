//! SQLite persistence for the knowledge base.

use crate::types::{KnowledgeChunk, KnowledgeSource};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use triage_core::{AppError, AppResult};

/// Open (creating if needed) the SQLite index database.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Knowledge(format!("Failed to create index directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sources (
            id TEXT PRIMARY KEY,
            path TEXT NOT NULL,
            content_type TEXT NOT NULL,
            learned_at TEXT NOT NULL,
            size_bytes INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            source_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            metadata TEXT,
            FOREIGN KEY (source_id) REFERENCES sources(id)
        );

        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_id);
        "#,
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

    tracing::debug!("Initialized SQLite index at {:?}", db_path);
    Ok(conn)
}

/// Insert a source into the index.
pub fn insert_source(conn: &Connection, source: &KnowledgeSource) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO sources (id, path, content_type, learned_at, size_bytes)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            source.id,
            source.path.to_string_lossy().to_string(),
            source.content_type,
            source.learned_at.to_rfc3339(),
            source.size_bytes as i64,
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to insert source: {}", e)))?;

    Ok(())
}

/// Insert a chunk with embedding into the index.
pub fn insert_chunk(conn: &Connection, chunk: &KnowledgeChunk) -> AppResult<()> {
    let embedding = chunk
        .embedding
        .as_ref()
        .ok_or_else(|| AppError::Knowledge("Chunk missing embedding".to_string()))?;

    let metadata_json = serde_json::to_string(&chunk.metadata)
        .map_err(|e| AppError::Knowledge(format!("Failed to serialize metadata: {}", e)))?;

    conn.execute(
        "INSERT OR REPLACE INTO chunks (id, source_id, position, text, embedding, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            chunk.id,
            chunk.source_id,
            chunk.position as i64,
            chunk.text,
            embedding_to_bytes(embedding),
            metadata_json,
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;

    Ok(())
}

/// Load every source in learn order.
pub fn load_sources(conn: &Connection) -> AppResult<Vec<KnowledgeSource>> {
    let mut stmt = conn
        .prepare("SELECT id, path, content_type, learned_at, size_bytes FROM sources ORDER BY learned_at, id")
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            let learned_at: String = row.get(3)?;
            let learned_at = DateTime::parse_from_rfc3339(&learned_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
                })?;

            Ok(KnowledgeSource {
                id: row.get(0)?,
                path: PathBuf::from(row.get::<_, String>(1)?),
                content_type: row.get(2)?,
                learned_at,
                size_bytes: row.get::<_, i64>(4)? as u64,
            })
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to query sources: {}", e)))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Knowledge(format!("Failed to read source row: {}", e)))
}

/// Load every chunk with its embedding.
pub fn load_chunks(conn: &Connection) -> AppResult<Vec<KnowledgeChunk>> {
    let mut stmt = conn
        .prepare("SELECT id, source_id, position, text, embedding, metadata FROM chunks ORDER BY source_id, position")
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            let embedding_bytes: Vec<u8> = row.get(4)?;
            let embedding = bytes_to_embedding(&embedding_bytes).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Blob, Box::new(e))
            })?;

            let metadata_json: Option<String> = row.get(5)?;
            let metadata = match metadata_json {
                Some(json) => serde_json::from_str(&json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
                })?,
                None => serde_json::Value::Null,
            };

            Ok(KnowledgeChunk {
                id: row.get(0)?,
                source_id: row.get(1)?,
                position: row.get::<_, i64>(2)? as u32,
                text: row.get(3)?,
                embedding: Some(embedding),
                metadata,
            })
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

    let chunks = rows
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Knowledge(format!("Failed to read chunk row: {}", e)))?;

    tracing::debug!("Loaded {} chunks from index", chunks.len());
    Ok(chunks)
}

/// Get (sources, chunks) counts for the index.
pub fn get_stats(conn: &Connection) -> AppResult<(u32, u32)> {
    let sources_count: u32 = conn
        .query_row("SELECT COUNT(*) FROM sources", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u32)
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to count sources: {}", e)))?;

    let chunks_count: u32 = conn
        .query_row("SELECT COUNT(*) FROM chunks", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u32)
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to count chunks: {}", e)))?;

    Ok((sources_count, chunks_count))
}

pub fn set_meta(conn: &Connection, key: &str, value: &str) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
        params![key, value],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to write index metadata: {}", e)))?;
    Ok(())
}

pub fn get_meta(conn: &Connection, key: &str) -> AppResult<Option<String>> {
    conn.query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
        row.get(0)
    })
    .optional()
    .map_err(|e| AppError::Knowledge(format!("Failed to read index metadata: {}", e)))
}

/// Reset the index (delete all data).
pub fn reset_index(conn: &Connection) -> AppResult<()> {
    conn.execute_batch("DELETE FROM chunks; DELETE FROM sources; DELETE FROM meta;")
        .map_err(|e| AppError::Knowledge(format!("Failed to reset index: {}", e)))?;

    tracing::info!("Reset knowledge base index");
    Ok(())
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source(id: &str) -> KnowledgeSource {
        KnowledgeSource {
            id: id.to_string(),
            path: PathBuf::from(format!("docs/{}.txt", id)),
            content_type: "text".to_string(),
            learned_at: Utc::now(),
            size_bytes: 100,
        }
    }

    fn chunk(id: &str, source_id: &str, position: u32) -> KnowledgeChunk {
        KnowledgeChunk {
            id: id.to_string(),
            source_id: source_id.to_string(),
            position,
            text: format!("text of {}", id),
            embedding: Some(vec![1.0, 0.5, -0.25]),
            metadata: serde_json::json!({"start": 0}),
        }
    }

    #[test]
    fn test_init_index_creates_tables() {
        let dir = TempDir::new().unwrap();
        let conn = init_index(&dir.path().join("nested/index.sqlite")).unwrap();

        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(table_count, 3);
    }

    #[test]
    fn test_insert_and_load() {
        let dir = TempDir::new().unwrap();
        let conn = init_index(&dir.path().join("index.sqlite")).unwrap();

        insert_source(&conn, &source("s1")).unwrap();
        insert_chunk(&conn, &chunk("c2", "s1", 1)).unwrap();
        insert_chunk(&conn, &chunk("c1", "s1", 0)).unwrap();

        let sources = load_sources(&conn).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].path, PathBuf::from("docs/s1.txt"));

        let chunks = load_chunks(&conn).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "c1");
        assert_eq!(chunks[0].embedding, Some(vec![1.0, 0.5, -0.25]));
        assert_eq!(chunks[0].metadata["start"], 0);

        assert_eq!(get_stats(&conn).unwrap(), (1, 2));
    }

    #[test]
    fn test_chunk_without_embedding_rejected() {
        let dir = TempDir::new().unwrap();
        let conn = init_index(&dir.path().join("index.sqlite")).unwrap();

        let mut bare = chunk("c1", "s1", 0);
        bare.embedding = None;
        assert!(insert_chunk(&conn, &bare).is_err());
    }

    #[test]
    fn test_meta_roundtrip_and_reset() {
        let dir = TempDir::new().unwrap();
        let conn = init_index(&dir.path().join("index.sqlite")).unwrap();

        assert_eq!(get_meta(&conn, "embedding_model").unwrap(), None);
        set_meta(&conn, "embedding_model", "trigram-v1").unwrap();
        assert_eq!(
            get_meta(&conn, "embedding_model").unwrap().as_deref(),
            Some("trigram-v1")
        );

        insert_source(&conn, &source("s1")).unwrap();
        reset_index(&conn).unwrap();
        assert_eq!(get_stats(&conn).unwrap(), (0, 0));
        assert_eq!(get_meta(&conn, "embedding_model").unwrap(), None);
    }

    #[test]
    fn test_bytes_to_embedding_rejects_ragged_input() {
        assert!(bytes_to_embedding(&[0, 1, 2]).is_err());
    }
}
