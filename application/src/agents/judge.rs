//! Judge agent: synthesis, consensus scoring, and the accept/revise decision

use super::{Agent, ParseReject};
use colloquy_domain::{
    AgentId, AgentOutput, ConsensusScore, FinalArtifact, JudgeDecision, JudgeVerdict,
    ModelDescriptor, SharedState,
};

const TEMPLATE: &str = r#"You are the Judge in a deliberation pipeline.
Synthesize every prior output into the final artifact and score its quality.

Produce a JSON object with these fields:
- final_artifact: {type, sections, metadata} where each section is
  {title, content, subsections, confidence, evidence} and evidence lists
  citation ids
- consensus_score: {groundedness, coherence, completeness, justification}
  with each score from 0.0 to 1.0
- revision_notes: what should improve if another round were run

Ground every claim in the findings. Resolve contradictions explicitly."#;

/// Synthesizes the final artifact and decides accept vs. revise.
pub struct Judge {
    model: ModelDescriptor,
    consensus_threshold: f64,
    max_rounds: u32,
}

impl Judge {
    pub fn new(model: ModelDescriptor, consensus_threshold: f64, max_rounds: u32) -> Self {
        Self {
            model,
            consensus_threshold,
            max_rounds,
        }
    }

    pub fn default_model() -> ModelDescriptor {
        ModelDescriptor::new("qwen2.5:14b-instruct-q4_K_M", 9000).with_temperature(0.2)
    }

    fn artifact_type_for(state: &SharedState) -> String {
        state
            .intent
            .as_ref()
            .map(|intent| intent.output_type.to_string())
            .unwrap_or_else(|| state.mode.default_output_type().to_string())
    }
}

impl Agent for Judge {
    fn id(&self) -> AgentId {
        AgentId::Judge
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
            "plan": state.plan,
            "research_findings": state.research_findings,
            "audit_report": state.audit_report,
            "visualizations": state.visualizations,
            "deliberation_round": state.deliberation_round,
        })
    }

    fn parse(
        &self,
        raw: &serde_json::Value,
        state: &SharedState,
    ) -> Result<AgentOutput, ParseReject> {
        let artifact_value = raw
            .get("final_artifact")
            .ok_or_else(|| ParseReject::new("missing final_artifact"))?;
        let final_artifact: FinalArtifact = serde_json::from_value(artifact_value.clone())
            .map_err(|e| ParseReject::new(format!("artifact schema mismatch: {e}")))?;

        let score_value = raw
            .get("consensus_score")
            .ok_or_else(|| ParseReject::new("missing consensus_score"))?;
        let consensus: ConsensusScore = serde_json::from_value(score_value.clone())
            .map_err(|e| ParseReject::new(format!("consensus schema mismatch: {e}")))?;
        consensus
            .validate()
            .map_err(|e| ParseReject::new(e.to_string()))?;

        // The decision follows from the score, not from the model's say-so:
        // below the threshold with rounds remaining means another round.
        let decision = if consensus.overall() < self.consensus_threshold
            && state.deliberation_round < self.max_rounds
        {
            JudgeDecision::NeedsRevision
        } else {
            JudgeDecision::Accept
        };

        let revision_notes = raw
            .get("revision_notes")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(AgentOutput::Judge(JudgeVerdict {
            final_artifact,
            consensus,
            decision,
            revision_notes,
        }))
    }

    fn degrade(&self, state: &SharedState) -> AgentOutput {
        AgentOutput::Judge(JudgeVerdict::degraded(Self::artifact_type_for(state)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_domain::Mode;
    use std::collections::BTreeMap;

    fn judge() -> Judge {
        Judge::new(Judge::default_model(), 0.85, 7)
    }

    fn state() -> SharedState {
        SharedState::new("brief", Mode::Research, BTreeMap::new(), "s")
    }

    fn raw(groundedness: f64, coherence: f64, completeness: f64) -> serde_json::Value {
        serde_json::json!({
            "final_artifact": {
                "type": "research_report",
                "sections": [{"title": "Overview", "content": "text", "confidence": 0.9}]
            },
            "consensus_score": {
                "groundedness": groundedness,
                "coherence": coherence,
                "completeness": completeness
            },
            "revision_notes": "tighten section two"
        })
    }

    #[test]
    fn test_high_score_accepts() {
        match judge().parse(&raw(0.9, 0.9, 0.84), &state()).unwrap() {
            AgentOutput::Judge(verdict) => {
                assert_eq!(verdict.decision, JudgeDecision::Accept);
                assert!((verdict.consensus.overall() - 0.88).abs() < 1e-9);
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[test]
    fn test_low_score_requests_revision() {
        match judge().parse(&raw(0.7, 0.7, 0.7), &state()).unwrap() {
            AgentOutput::Judge(verdict) => {
                assert_eq!(verdict.decision, JudgeDecision::NeedsRevision);
                assert_eq!(verdict.revision_notes, "tighten section two");
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[test]
    fn test_low_score_accepts_at_round_limit() {
        let mut state = state();
        state.deliberation_round = 7;
        match judge().parse(&raw(0.7, 0.7, 0.7), &state).unwrap() {
            AgentOutput::Judge(verdict) => assert_eq!(verdict.decision, JudgeDecision::Accept),
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_score_rejected() {
        assert!(judge().parse(&raw(1.4, 0.9, 0.9), &state()).is_err());
    }

    #[test]
    fn test_missing_artifact_rejected() {
        let raw = serde_json::json!({"consensus_score": {"groundedness": 1, "coherence": 1, "completeness": 1}});
        assert!(judge().parse(&raw, &state()).is_err());
    }

    #[test]
    fn test_degrade_accepts_with_empty_sections() {
        match judge().degrade(&state()) {
            AgentOutput::Judge(verdict) => {
                assert_eq!(verdict.decision, JudgeDecision::Accept);
                assert!(verdict.final_artifact.sections.is_empty());
                assert_eq!(verdict.final_artifact.artifact_type, "research_report");
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }
}
