//! Vector store port

use async_trait::async_trait;
use thiserror::Error;

/// Errors a vector store operation can fail with.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Vector store backend error: {0}")]
    Backend(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),
}

/// One semantic search hit.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub id: String,
    pub content: String,
    pub metadata: serde_json::Value,
    /// Cosine distance in [0, 2]; lower is closer
    pub distance: f64,
}

/// Semantic document store capability.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Add documents with parallel ids, texts, and metadata.
    async fn add_documents(
        &self,
        ids: Vec<String>,
        texts: Vec<String>,
        metadatas: Vec<serde_json::Value>,
    ) -> Result<(), StoreError>;

    /// Top-k semantic search over stored documents.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<VectorHit>, StoreError>;
}
