//! Ollama model runtime adapter
//!
//! Implements the `ModelRuntime` port over Ollama's HTTP API. Every request
//! carries `keep_alive: 0` so the runtime evicts the model immediately after
//! the call; residency across calls is the model slot's concern, not the
//! runtime's.

use async_trait::async_trait;
use colloquy_application::{GenerationRequest, ModelRuntime, RuntimeError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Ollama endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_ctx: u32,
    num_predict: u32,
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
    keep_alive: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

/// HTTP client for a local Ollama runtime.
pub struct OllamaRuntime {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaRuntime {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn map_transport(e: reqwest::Error) -> RuntimeError {
        if e.is_timeout() {
            RuntimeError::Timeout
        } else if e.is_connect() {
            RuntimeError::Unavailable(e.to_string())
        } else {
            RuntimeError::Failed(e.to_string())
        }
    }

    async fn post_generate(
        &self,
        model_id: &str,
        prompt: &str,
        options: GenerateOptions,
        timeout: Duration,
    ) -> Result<String, RuntimeError> {
        let body = GenerateBody {
            model: model_id,
            prompt,
            stream: false,
            options,
            keep_alive: 0,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RuntimeError::ModelAbsent(model_id.to_string()));
        }
        if !status.is_success() {
            return Err(RuntimeError::Failed(format!(
                "generate returned status {status}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RuntimeError::Failed(format!("malformed generate response: {e}")))?;
        Ok(parsed.response)
    }
}

#[async_trait]
impl ModelRuntime for OllamaRuntime {
    async fn generate(&self, request: GenerationRequest) -> Result<String, RuntimeError> {
        debug!(model = %request.model_id, prompt_len = request.prompt.len(), "Generating");
        self.post_generate(
            &request.model_id,
            &request.prompt,
            GenerateOptions {
                temperature: request.temperature,
                num_ctx: request.num_ctx,
                num_predict: request.num_predict,
            },
            request.timeout,
        )
        .await
    }

    async fn ensure_present(&self, model_id: &str, timeout: Duration) -> Result<(), RuntimeError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(timeout)
            .send()
            .await
            .map_err(Self::map_transport)?;

        if !response.status().is_success() {
            return Err(RuntimeError::Failed(format!(
                "tags returned status {}",
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| RuntimeError::Failed(format!("malformed tags response: {e}")))?;

        let present = tags.models.iter().any(|m| {
            m.name == model_id || m.name.split(':').next() == Some(model_id)
        });
        if present {
            Ok(())
        } else {
            Err(RuntimeError::ModelAbsent(model_id.to_string()))
        }
    }

    async fn load(&self, model_id: &str, timeout: Duration) -> Result<(), RuntimeError> {
        debug!(model = model_id, "Loading model");
        // A minimal generation forces the runtime to bring the model into
        // accelerator memory.
        self.post_generate(
            model_id,
            "ready",
            GenerateOptions {
                temperature: 0.0,
                num_ctx: 512,
                num_predict: 1,
            },
            timeout,
        )
        .await
        .map(|_| ())
    }

    async fn unload(&self, model_id: &str) -> Result<(), RuntimeError> {
        debug!(model = model_id, "Unloading model");
        // An empty prompt with keep_alive 0 asks the runtime to evict.
        self.post_generate(
            model_id,
            "",
            GenerateOptions {
                temperature: 0.0,
                num_ctx: 512,
                num_predict: 1,
            },
            Duration::from_secs(30),
        )
        .await
        .map(|_| ())
    }
}
