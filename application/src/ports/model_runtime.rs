//! Model runtime port
//!
//! Defines the interface for the local model runtime (generation and model
//! presence). No retry lives here; retry policy belongs to the model slot.

use async_trait::async_trait;
use colloquy_domain::ModelDescriptor;
use std::time::Duration;
use thiserror::Error;

/// Errors a model runtime call can fail with.
#[derive(Error, Debug, Clone)]
pub enum RuntimeError {
    /// Transport-level failure: the runtime is unreachable
    #[error("Model runtime unavailable: {0}")]
    Unavailable(String),

    /// The requested model is not present in the runtime
    #[error("Model not present in runtime: {0}")]
    ModelAbsent(String),

    /// The call exceeded its deadline
    #[error("Model runtime call timed out")]
    Timeout,

    /// Any other runtime failure
    #[error("Model runtime request failed: {0}")]
    Failed(String),
}

/// A single blocking generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model_id: String,
    pub prompt: String,
    pub temperature: f32,
    pub num_ctx: u32,
    pub num_predict: u32,
    /// Per-call deadline the adapter must honor
    pub timeout: Duration,
}

impl GenerationRequest {
    /// Build a request from a model descriptor.
    pub fn for_model(model: &ModelDescriptor, prompt: impl Into<String>, timeout: Duration) -> Self {
        Self {
            model_id: model.id.clone(),
            prompt: prompt.into(),
            temperature: model.temperature,
            num_ctx: model.num_ctx,
            num_predict: model.num_predict,
            timeout,
        }
    }
}

/// Blocking request/response access to the external model runtime.
///
/// Every operation honors the caller-supplied timeout and propagates
/// cancellation by returning promptly once the future is dropped.
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Generate a completion for the prompt. Blocking, single-shot.
    async fn generate(&self, request: GenerationRequest) -> Result<String, RuntimeError>;

    /// Probe whether the model is known to the runtime.
    async fn ensure_present(&self, model_id: &str, timeout: Duration) -> Result<(), RuntimeError>;

    /// Force the model into accelerator memory.
    async fn load(&self, model_id: &str, timeout: Duration) -> Result<(), RuntimeError>;

    /// Ask the runtime to evict the model. Best-effort.
    async fn unload(&self, model_id: &str) -> Result<(), RuntimeError>;
}
