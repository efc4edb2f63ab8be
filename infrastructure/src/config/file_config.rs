//! TOML configuration file structure
//!
//! All sections are optional in the file; defaults match the documented
//! configuration surface. `FileConfig` converts into the engine's explicit
//! config struct and per-agent model descriptors.

use colloquy_application::EngineConfig;
use colloquy_domain::{AgentId, ModelDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Configuration file validation errors. Fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigValidationError {
    #[error("runtime.base_url must not be empty")]
    EmptyBaseUrl,

    #[error("deliberation.consensus_threshold must be in [0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("models.{0}: model id must not be empty")]
    EmptyModelId(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
    pub base_url: String,
    pub load_retries: u32,
    pub load_backoff_base_seconds: u64,
    pub swap_settle_seconds: u64,
    pub load_timeout_seconds: u64,
    pub generate_timeout_seconds: u64,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            load_retries: 3,
            load_backoff_base_seconds: 2,
            swap_settle_seconds: 2,
            load_timeout_seconds: 30,
            generate_timeout_seconds: 1800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSection {
    pub max_tokens: u32,
    pub max_context_tokens: u32,
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            max_context_tokens: 16384,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSection {
    pub max_sources_per_question: usize,
    pub vector_k: usize,
    pub web_k: usize,
    pub cache_ttl_days: u64,
    pub content_cap: usize,
    pub concurrency: usize,
    pub persist_dir: String,
    pub embedding_model: String,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            max_sources_per_question: 10,
            vector_k: 5,
            web_k: 5,
            cache_ttl_days: 7,
            content_cap: 2000,
            concurrency: 4,
            persist_dir: "./knowledge_db".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliberationSection {
    pub consensus_threshold: f64,
    pub max_rounds: u32,
    pub agent_time_budget_seconds: u64,
    pub max_parse_retries: u32,
}

impl Default for DeliberationSection {
    fn default() -> Self {
        Self {
            consensus_threshold: 0.85,
            max_rounds: 7,
            agent_time_budget_seconds: 1800,
            max_parse_retries: 2,
        }
    }
}

/// Per-agent model override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOverride {
    pub id: String,
    #[serde(default)]
    pub vram_mb: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsSection {
    /// One model for every agent; eliminates swapping entirely
    pub single_model: Option<String>,
    pub single_model_vram_mb: Option<u32>,
    /// Keyed by agent id (`interpreter`, `planner`, ...)
    pub agents: BTreeMap<String, ModelOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Rich console output; the pipeline core is indifferent to this
    pub rich: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self { rich: true }
    }
}

/// The full configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub runtime: RuntimeSection,
    pub generation: GenerationSection,
    pub retrieval: RetrievalSection,
    pub deliberation: DeliberationSection,
    pub models: ModelsSection,
    pub output: OutputSection,
}

impl FileConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.runtime.base_url.trim().is_empty() {
            return Err(ConfigValidationError::EmptyBaseUrl);
        }
        let threshold = self.deliberation.consensus_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigValidationError::InvalidThreshold(threshold));
        }
        for (agent, entry) in &self.models.agents {
            if entry.id.trim().is_empty() {
                return Err(ConfigValidationError::EmptyModelId(agent.clone()));
            }
        }
        Ok(())
    }

    /// Convert into the engine's explicit configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            model_load_retries: self.runtime.load_retries,
            model_load_backoff_base: Duration::from_secs(self.runtime.load_backoff_base_seconds),
            model_swap_settle: Duration::from_secs(self.runtime.swap_settle_seconds),
            load_attempt_timeout: Duration::from_secs(self.runtime.load_timeout_seconds),
            generate_timeout: Duration::from_secs(self.runtime.generate_timeout_seconds),
            max_parse_retries: self.deliberation.max_parse_retries,
            max_sources_per_question: self.retrieval.max_sources_per_question,
            vector_k: self.retrieval.vector_k,
            web_k: self.retrieval.web_k,
            source_content_cap: self.retrieval.content_cap,
            retrieval_concurrency: self.retrieval.concurrency,
            consensus_threshold: self.deliberation.consensus_threshold,
            max_deliberation_rounds: self.deliberation.max_rounds,
            agent_time_budget: Duration::from_secs(self.deliberation.agent_time_budget_seconds),
        }
    }

    /// The model an agent should use: single-model override first, then the
    /// per-agent override, then the built-in default.
    pub fn model_for(&self, agent: AgentId, default: ModelDescriptor) -> ModelDescriptor {
        if let Some(single) = &self.models.single_model {
            let vram = self.models.single_model_vram_mb.unwrap_or(default.min_vram_mb);
            return ModelDescriptor::new(single.clone(), vram)
                .with_temperature(default.temperature)
                .with_context_window(self.generation.max_context_tokens)
                .with_max_tokens(self.generation.max_tokens);
        }

        let base = match self.models.agents.get(agent.as_str()) {
            Some(entry) => {
                let vram = entry.vram_mb.unwrap_or(default.min_vram_mb);
                let descriptor = ModelDescriptor::new(entry.id.clone(), vram);
                match entry.temperature {
                    Some(t) => descriptor.with_temperature(t),
                    None => descriptor.with_temperature(default.temperature),
                }
            }
            None => default,
        };
        base.with_context_window(self.generation.max_context_tokens)
            .with_max_tokens(self.generation.max_tokens)
    }
}
