//! Visualizer agent: proposes visualizations for the final artifact

use super::{Agent, ParseReject};
use colloquy_domain::{AgentId, AgentOutput, ModelDescriptor, SharedState, Visualization};

const TEMPLATE: &str = r#"You are the Visualizer in a deliberation pipeline.
Propose visualizations that would strengthen the final artifact.

Produce a JSON object with one field:
- visualizations: array of {id, type, title, purpose, specification} where
  type is one of "chart", "diagram", "flowchart", "architecture", "image"
  and specification is any JSON object describing the visual."#;

/// Proposes an ordered list of [`Visualization`] specs.
pub struct Visualizer {
    model: ModelDescriptor,
}

impl Visualizer {
    pub fn new(model: ModelDescriptor) -> Self {
        Self { model }
    }

    pub fn default_model() -> ModelDescriptor {
        ModelDescriptor::new("llama3.1:8b-instruct-q4_K_M", 4800).with_temperature(0.4)
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new(Self::default_model())
    }
}

impl Agent for Visualizer {
    fn id(&self) -> AgentId {
        AgentId::Visualizer
    }

    fn model(&self) -> &ModelDescriptor {
        &self.model
    }

    fn template(&self) -> &str {
        TEMPLATE
    }

    fn prepare_input(&self, state: &SharedState) -> serde_json::Value {
        serde_json::json!({
            "intent": state.intent,
            "plan": state.plan,
            "research_findings": state.research_findings,
        })
    }

    fn parse(
        &self,
        raw: &serde_json::Value,
        _state: &SharedState,
    ) -> Result<AgentOutput, ParseReject> {
        let list = raw
            .get("visualizations")
            .ok_or_else(|| ParseReject::new("missing visualizations field"))?;
        let visuals: Vec<Visualization> = serde_json::from_value(list.clone())
            .map_err(|e| ParseReject::new(format!("visualization schema mismatch: {e}")))?;
        Ok(AgentOutput::Visualizer(visuals))
    }

    fn degrade(&self, _state: &SharedState) -> AgentOutput {
        AgentOutput::Visualizer(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_domain::{Mode, VisualizationKind};
    use std::collections::BTreeMap;

    fn state() -> SharedState {
        SharedState::new("brief", Mode::Project, BTreeMap::new(), "s")
    }

    #[test]
    fn test_parse_visualizations() {
        let agent = Visualizer::default();
        let raw = serde_json::json!({
            "visualizations": [
                {"id": "V1", "type": "architecture", "title": "System overview",
                 "purpose": "orient the reader", "specification": {"layers": 3}}
            ]
        });
        match agent.parse(&raw, &state()).unwrap() {
            AgentOutput::Visualizer(visuals) => {
                assert_eq!(visuals.len(), 1);
                assert_eq!(visuals[0].kind, VisualizationKind::Architecture);
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_missing_field() {
        let agent = Visualizer::default();
        assert!(agent.parse(&serde_json::json!({"charts": []}), &state()).is_err());
    }

    #[test]
    fn test_degrade_is_empty_list() {
        let agent = Visualizer::default();
        match agent.degrade(&state()) {
            AgentOutput::Visualizer(visuals) => assert!(visuals.is_empty()),
            other => panic!("unexpected output: {other:?}"),
        }
    }
}
