//! Embedding client over Ollama's embeddings endpoint

use colloquy_application::StoreError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct EmbeddingBody<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Generates embedding vectors via `POST /api/embeddings`.
pub struct EmbeddingClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl EmbeddingClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Embed one text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        let body = EmbeddingBody {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Embedding(format!(
                "embeddings returned status {}",
                response.status()
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Embedding(format!("malformed embedding response: {e}")))?;

        if parsed.embedding.is_empty() {
            return Err(StoreError::Embedding("empty embedding returned".to_string()));
        }
        Ok(parsed.embedding)
    }
}

/// Cosine similarity of two vectors; zero when lengths differ or either is
/// all-zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }
    dot / (magnitude_a * magnitude_b)
}
