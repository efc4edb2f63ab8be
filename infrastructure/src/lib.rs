//! Infrastructure layer for colloquy
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: the Ollama model runtime client, the DuckDuckGo web
//! search with its on-disk cache, the SQLite-backed vector store, and the
//! configuration file loading.

pub mod config;
pub mod ollama;
pub mod search;
pub mod vector;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use ollama::{client::OllamaRuntime, embeddings::EmbeddingClient};
pub use search::duckduckgo::DuckDuckGoSearch;
pub use vector::store::SqliteVectorStore;
