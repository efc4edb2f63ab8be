//! Typed agent output schemas
//!
//! Each agent parses its model response into one of these types at the agent
//! boundary; untyped JSON never travels further down the pipeline. The
//! [`AgentOutput`] union is the discriminated result the think-cycle hands
//! back to the engine.

pub mod artifact;
pub mod audit;
pub mod findings;
pub mod intent;
pub mod plan;
pub mod visualization;

use crate::pipeline::agent_id::AgentId;
use serde::{Deserialize, Serialize};

/// Discriminated union of every agent's typed output.
///
/// The variant determines the single shared-state field the engine writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "agent", content = "output", rename_all = "lowercase")]
pub enum AgentOutput {
    Interpreter(intent::Intent),
    Planner(plan::Plan),
    Grounder(Vec<findings::Finding>),
    Auditor(audit::AuditReport),
    Visualizer(Vec<visualization::Visualization>),
    Judge(artifact::JudgeVerdict),
}

impl AgentOutput {
    /// The agent this output belongs to.
    pub fn agent_id(&self) -> AgentId {
        match self {
            AgentOutput::Interpreter(_) => AgentId::Interpreter,
            AgentOutput::Planner(_) => AgentId::Planner,
            AgentOutput::Grounder(_) => AgentId::Grounder,
            AgentOutput::Auditor(_) => AgentId::Auditor,
            AgentOutput::Visualizer(_) => AgentId::Visualizer,
            AgentOutput::Judge(_) => AgentId::Judge,
        }
    }
}
