//! Agent identifier value object

use crate::core::error::DomainError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identity of a pipeline agent.
///
/// Each id is unique and immutable for the lifetime of a run; the shared
/// state keys raw outputs and error records by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgentId {
    Interpreter,
    Planner,
    Grounder,
    Auditor,
    Visualizer,
    Judge,
}

impl AgentId {
    /// String form used in state keys, logs, and config sections.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentId::Interpreter => "interpreter",
            AgentId::Planner => "planner",
            AgentId::Grounder => "grounder",
            AgentId::Auditor => "auditor",
            AgentId::Visualizer => "visualizer",
            AgentId::Judge => "judge",
        }
    }

    /// All known agents, in canonical order.
    pub fn all() -> &'static [AgentId] {
        &[
            AgentId::Interpreter,
            AgentId::Planner,
            AgentId::Grounder,
            AgentId::Auditor,
            AgentId::Visualizer,
            AgentId::Judge,
        ]
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AgentId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "interpreter" => Ok(AgentId::Interpreter),
            "planner" => Ok(AgentId::Planner),
            "grounder" => Ok(AgentId::Grounder),
            "auditor" => Ok(AgentId::Auditor),
            "visualizer" => Ok(AgentId::Visualizer),
            "judge" => Ok(AgentId::Judge),
            other => Err(DomainError::InvalidAgent(other.to_string())),
        }
    }
}

impl Serialize for AgentId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AgentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
