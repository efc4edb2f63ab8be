//! Ollama adapters: the model runtime client and the embedding client

pub mod client;
pub mod embeddings;
