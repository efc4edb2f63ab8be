//! User brief value object

use super::error::DomainError;
use serde::{Deserialize, Serialize};

/// The user's free-form request, validated to be non-empty.
///
/// Everything a pipeline run produces traces back to this single string;
/// agents treat it as immutable input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Brief(String);

impl Brief {
    /// Create a brief, rejecting empty or whitespace-only input.
    pub fn new(content: impl Into<String>) -> Result<Self, DomainError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(DomainError::EmptyBrief);
        }
        Ok(Self(content))
    }

    /// The raw text of the brief.
    pub fn content(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Brief {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Brief {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
