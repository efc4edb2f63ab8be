//! Interpreter agent: extracts structured intent from the user brief

use super::{Agent, ParseReject};
use colloquy_domain::{AgentId, AgentOutput, Intent, ModelDescriptor, Scope, SharedState};

const TEMPLATE: &str = r#"You are the Interpreter in a deliberation pipeline.
Read the user's brief and extract what they actually want.

Produce a JSON object with these fields:
- primary_goal: one sentence stating the user's goal
- domain: the subject domain
- output_type: one of "research_report", "project_spec", "learning_path"
- scope: one of "broad", "moderate", "narrow"
- extracted_requirements: explicit requirements found in the brief
- ambiguities: points the brief leaves unclear
- clarifying_questions: up to five questions that would sharpen the brief
- confidence: your confidence in this interpretation, 0.0 to 1.0"#;

/// Interprets the user brief into a typed [`Intent`].
pub struct Interpreter {
    model: ModelDescriptor,
}

impl Interpreter {
    pub fn new(model: ModelDescriptor) -> Self {
        Self { model }
    }

    pub fn default_model() -> ModelDescriptor {
        ModelDescriptor::new("llama3.1:8b-instruct-q4_K_M", 4800).with_temperature(0.3)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Self::default_model())
    }
}

impl Agent for Interpreter {
    fn id(&self) -> AgentId {
        AgentId::Interpreter
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
            "mode": state.mode,
            "clarifications": state.clarifications,
        })
    }

    fn parse(
        &self,
        raw: &serde_json::Value,
        _state: &SharedState,
    ) -> Result<AgentOutput, ParseReject> {
        let intent: Intent = serde_json::from_value(raw.clone())
            .map_err(|e| ParseReject::new(format!("intent schema mismatch: {e}")))?;
        if intent.primary_goal.trim().is_empty() {
            return Err(ParseReject::new("primary_goal is empty"));
        }
        Ok(AgentOutput::Interpreter(intent.normalized()))
    }

    fn degrade(&self, state: &SharedState) -> AgentOutput {
        AgentOutput::Interpreter(Intent {
            primary_goal: state.user_brief.clone(),
            domain: "unknown".to_string(),
            output_type: state.mode.default_output_type(),
            scope: Scope::Moderate,
            extracted_requirements: vec![state.user_brief.clone()],
            ambiguities: vec![],
            clarifying_questions: vec![],
            confidence: 0.0,
        })
    }
}
