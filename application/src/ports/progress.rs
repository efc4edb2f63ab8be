//! Pipeline progress notifications
//!
//! The front-end implements this to render live progress; the engine calls
//! it at each step boundary. All methods default to no-ops.

use colloquy_domain::{AgentId, Mode};

/// Observer of pipeline execution progress.
pub trait PipelineProgress: Send + Sync {
    fn on_pipeline_start(&self, _mode: Mode, _steps: &[AgentId]) {}

    fn on_agent_start(&self, _agent: AgentId) {}

    /// `degraded` is true when the agent fell back to its degraded output.
    fn on_agent_complete(&self, _agent: AgentId, _degraded: bool) {}

    fn on_gate_rejected(&self, _agent: AgentId, _reason: &str) {}

    fn on_deliberation_round(&self, _round: u32) {}

    fn on_retrieval_complete(&self, _question_id: &str, _sources: usize) {}
}

/// No-op progress for headless and test use.
pub struct NoProgress;

impl PipelineProgress for NoProgress {}
