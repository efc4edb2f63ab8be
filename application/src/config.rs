//! Engine configuration
//!
//! All tunables of the pipeline core in one explicit struct. The core owns
//! no globals; the front-end builds this from its config file and passes it
//! down. Invalid values refuse startup.

use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors. These are fatal: the engine refuses to
/// start rather than run with a nonsensical setup.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("consensus_threshold must be in [0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("model_load_retries must be at least 1")]
    ZeroRetries,

    #[error("max_deliberation_rounds must be at least 1")]
    ZeroRounds,

    #[error("max_sources_per_question must be at least 1")]
    ZeroSources,

    #[error("retrieval_concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("{0}")]
    Invalid(String),
}

/// Tunables for the pipeline engine, model slot, and evidence retriever.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Load attempts before a model swap is declared failed
    pub model_load_retries: u32,
    /// Base of the exponential backoff between load attempts
    pub model_load_backoff_base: Duration,
    /// Settle wait after an unload before the next load
    pub model_swap_settle: Duration,
    /// Per-attempt bound on a single load request
    pub load_attempt_timeout: Duration,
    /// Bound on a single generation request
    pub generate_timeout: Duration,
    /// Extra generations when a response fails to parse
    pub max_parse_retries: u32,

    /// Evidence cap per research question
    pub max_sources_per_question: usize,
    /// Vector store hits requested per question
    pub vector_k: usize,
    /// Web search hits requested per question
    pub web_k: usize,
    /// Character cap applied to retrieved source content
    pub source_content_cap: usize,
    /// Bound on concurrent outbound retrieval requests
    pub retrieval_concurrency: usize,

    /// Consensus score at or above which the Judge accepts
    pub consensus_threshold: f64,
    /// Hard bound on deliberation rounds
    pub max_deliberation_rounds: u32,
    /// Wall-clock budget per agent step
    pub agent_time_budget: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_load_retries: 3,
            model_load_backoff_base: Duration::from_secs(2),
            model_swap_settle: Duration::from_secs(2),
            load_attempt_timeout: Duration::from_secs(30),
            generate_timeout: Duration::from_secs(1800),
            max_parse_retries: 2,
            max_sources_per_question: 10,
            vector_k: 5,
            web_k: 5,
            source_content_cap: 2000,
            retrieval_concurrency: 4,
            consensus_threshold: 0.85,
            max_deliberation_rounds: 7,
            agent_time_budget: Duration::from_secs(1800),
        }
    }
}

impl EngineConfig {
    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.consensus_threshold) {
            return Err(ConfigError::InvalidThreshold(self.consensus_threshold));
        }
        if self.model_load_retries == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        if self.max_deliberation_rounds == 0 {
            return Err(ConfigError::ZeroRounds);
        }
        if self.max_sources_per_question == 0 {
            return Err(ConfigError::ZeroSources);
        }
        if self.retrieval_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bad_threshold_rejected() {
        let config = EngineConfig {
            consensus_threshold: 1.3,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidThreshold(1.3)));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let config = EngineConfig {
            model_load_retries: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroRetries));
    }
}
