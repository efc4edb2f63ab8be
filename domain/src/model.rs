//! Model descriptor value object
//!
//! Each agent is bound to one model descriptor at construction time. The
//! identifier is opaque to the pipeline; the remaining fields feed the
//! runtime's generation options and the slot's residency bookkeeping.

use serde::{Deserialize, Serialize};

/// Description of the language model an agent invokes.
///
/// Set once per agent and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Runtime model identifier (e.g. `qwen2.5:7b-instruct-q4_K_M`)
    pub id: String,
    /// Declared minimum accelerator memory in MB
    pub min_vram_mb: u32,
    /// Sampling temperature in [0, 1]
    pub temperature: f32,
    /// Maximum context window in tokens
    pub num_ctx: u32,
    /// Maximum tokens to generate
    pub num_predict: u32,
}

impl ModelDescriptor {
    /// Create a descriptor with the default generation options.
    pub fn new(id: impl Into<String>, min_vram_mb: u32) -> Self {
        Self {
            id: id.into(),
            min_vram_mb,
            temperature: 0.3,
            num_ctx: 16_384,
            num_predict: 4_096,
        }
    }

    /// Override the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 1.0);
        self
    }

    /// Override the context window.
    pub fn with_context_window(mut self, num_ctx: u32) -> Self {
        self.num_ctx = num_ctx;
        self
    }

    /// Override the generation token budget.
    pub fn with_max_tokens(mut self, num_predict: u32) -> Self {
        self.num_predict = num_predict;
        self
    }
}

impl std::fmt::Display for ModelDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let desc = ModelDescriptor::new("qwen2.5:7b-instruct-q4_K_M", 4500);
        assert_eq!(desc.temperature, 0.3);
        assert_eq!(desc.num_ctx, 16_384);
        assert_eq!(desc.num_predict, 4_096);
    }

    #[test]
    fn test_temperature_clamped() {
        let desc = ModelDescriptor::new("m", 1000).with_temperature(1.7);
        assert_eq!(desc.temperature, 1.0);
    }
}
