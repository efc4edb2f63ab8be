//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("User brief must not be empty")]
    EmptyBrief,

    #[error("Invalid execution mode: {0}")]
    InvalidMode(String),

    #[error("Invalid agent id: {0}")]
    InvalidAgent(String),

    #[error("Score out of range [0, 1]: {0}")]
    ScoreOutOfRange(f64),
}
