//! Planner agent: decomposes the intent into research questions and phases

use super::{Agent, ParseReject};
use colloquy_domain::{AgentId, AgentOutput, ModelDescriptor, Plan, SharedState};

const TEMPLATE: &str = r#"You are the Planner in a deliberation pipeline.
Decompose the interpreted intent into a concrete research plan.

Produce a JSON object with these fields:
- research_questions: array of {id, question, type, priority, estimated_time_minutes, dependencies}
  where type is one of "factual", "analytical", "comparative", "exploratory",
  priority is one of "critical", "high", "medium", "low",
  and dependencies lists ids of questions that must be answered first.
  Dependencies must not form a cycle.
- phases: array of {name, description, rq_ids, parallel}
- success_criteria: array of strings
- estimated_total_time_minutes: integer"#;

/// Turns the intent into a dependency-ordered research [`Plan`].
pub struct Planner {
    model: ModelDescriptor,
}

impl Planner {
    pub fn new(model: ModelDescriptor) -> Self {
        Self { model }
    }

    pub fn default_model() -> ModelDescriptor {
        ModelDescriptor::new("qwen2.5:14b-instruct-q4_K_M", 9000).with_temperature(0.3)
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new(Self::default_model())
    }
}

impl Agent for Planner {
    fn id(&self) -> AgentId {
        AgentId::Planner
    }

    fn model(&self) -> &ModelDescriptor {
        &self.model
    }

    fn template(&self) -> &str {
        TEMPLATE
    }

    fn prepare_input(&self, state: &SharedState) -> serde_json::Value {
        serde_json::json!({
            "user_brief": state.user_brief,
            "intent": state.intent,
            "clarifications": state.clarifications,
        })
    }

    fn parse(
        &self,
        raw: &serde_json::Value,
        _state: &SharedState,
    ) -> Result<AgentOutput, ParseReject> {
        let plan: Plan = serde_json::from_value(raw.clone())
            .map_err(|e| ParseReject::new(format!("plan schema mismatch: {e}")))?;
        plan.validate()
            .map_err(|e| ParseReject::new(e.to_string()))?;
        Ok(AgentOutput::Planner(plan))
    }

    fn degrade(&self, state: &SharedState) -> AgentOutput {
        AgentOutput::Planner(Plan::fallback(state.user_brief.clone()))
    }
}
