//! Vector store adapter on SQLite
//!
//! Documents and their embeddings persist in a single SQLite file under the
//! configured directory. Search embeds the query through the embedding
//! client and brute-force scans stored vectors by cosine distance; local
//! collections stay small enough that an index would buy nothing.

use crate::ollama::embeddings::{cosine_similarity, EmbeddingClient};
use async_trait::async_trait;
use colloquy_application::{StoreError, VectorHit, VectorStore};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Persistent document store with semantic search.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    embedder: EmbeddingClient,
}

impl SqliteVectorStore {
    /// Open (or create) the store under `persist_dir`.
    pub fn open(persist_dir: impl AsRef<Path>, embedder: EmbeddingClient) -> Result<Self, StoreError> {
        let dir = persist_dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|e| StoreError::Backend(format!("cannot create {}: {e}", dir.display())))?;

        let path = dir.join("knowledge.db");
        let conn =
            Connection::open(&path).map_err(|e| StoreError::Backend(e.to_string()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                id        TEXT PRIMARY KEY,
                content   TEXT NOT NULL,
                metadata  TEXT NOT NULL,
                embedding BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        info!(path = %path.display(), documents = count, "Vector store opened");

        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
        })
    }

    /// In-memory store for tests.
    pub fn in_memory(embedder: EmbeddingClient) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Backend(e.to_string()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                id        TEXT PRIMARY KEY,
                content   TEXT NOT NULL,
                metadata  TEXT NOT NULL,
                embedding BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
        })
    }

    pub fn document_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(count as usize)
    }
}

fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn add_documents(
        &self,
        ids: Vec<String>,
        texts: Vec<String>,
        metadatas: Vec<serde_json::Value>,
    ) -> Result<(), StoreError> {
        if ids.len() != texts.len() || ids.len() != metadatas.len() {
            return Err(StoreError::Backend(
                "ids, texts, and metadatas must have matching lengths".to_string(),
            ));
        }

        for ((id, text), metadata) in ids.iter().zip(&texts).zip(&metadatas) {
            let embedding = self.embedder.embed(text).await?;
            let blob = embedding_to_blob(&embedding);
            let metadata_json = metadata.to_string();

            let conn = self.conn.lock().expect("store lock poisoned");
            conn.execute(
                "INSERT OR REPLACE INTO documents (id, content, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, text, metadata_json, blob],
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        }

        debug!(added = ids.len(), "Documents stored");
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<VectorHit>, StoreError> {
        let query_embedding = self.embedder.embed(query).await?;

        let rows: Vec<(String, String, String, Vec<u8>)> = {
            let conn = self.conn.lock().expect("store lock poisoned");
            let mut statement = conn
                .prepare("SELECT id, content, metadata, embedding FROM documents")
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            let mapped = statement
                .query_map([], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            mapped
                .collect::<Result<_, _>>()
                .map_err(|e| StoreError::Backend(e.to_string()))?
        };

        let mut hits: Vec<VectorHit> = rows
            .into_iter()
            .map(|(id, content, metadata, blob)| {
                let embedding = blob_to_embedding(&blob);
                let similarity = cosine_similarity(&query_embedding, &embedding);
                VectorHit {
                    id,
                    content,
                    metadata: serde_json::from_str(&metadata)
                        .unwrap_or(serde_json::Value::Null),
                    distance: (1.0 - similarity as f64).clamp(0.0, 2.0),
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }
}
