//! Web search port

use async_trait::async_trait;
use thiserror::Error;

/// Errors a web search can fail with.
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    #[error("Search transport error: {0}")]
    Transport(String),

    #[error("Search failed: {0}")]
    Failed(String),
}

/// One web search result with best-effort extracted page text.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
    /// Extracted page text; falls back to the snippet when extraction fails
    pub content: String,
}

/// Web search capability.
///
/// Implementations are expected to cache identical queries within a
/// configurable window (default seven days).
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;
}
