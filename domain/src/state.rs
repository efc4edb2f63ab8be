//! Shared deliberation state
//!
//! One `SharedState` is created at pipeline entry, threaded through every
//! agent, and returned (or dropped) at pipeline exit. Nothing is shared
//! across runs.

use crate::evidence::citation::CitationRegistry;
use crate::evidence::source::SourceRecord;
use crate::outputs::artifact::FinalArtifact;
use crate::outputs::audit::AuditReport;
use crate::outputs::findings::Finding;
use crate::outputs::intent::Intent;
use crate::outputs::plan::Plan;
use crate::outputs::visualization::Visualization;
use crate::outputs::AgentOutput;
use crate::pipeline::agent_id::AgentId;
use crate::pipeline::mode::Mode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A recoverable failure recorded against an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub agent: AgentId,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// The deliberation context accumulated across the pipeline.
///
/// Agents read from it during their think-cycle; the engine is the only
/// writer of its single-valued fields. Appends to `errors` and
/// `research_findings` are strictly ordered by pipeline position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedState {
    pub user_brief: String,
    pub mode: Mode,
    #[serde(default)]
    pub clarifications: BTreeMap<String, String>,

    pub intent: Option<Intent>,
    pub plan: Option<Plan>,
    #[serde(default)]
    pub research_findings: Vec<Finding>,
    /// Evidence per research-question id, written once per question
    #[serde(default)]
    pub evidence: BTreeMap<String, Vec<SourceRecord>>,
    pub audit_report: Option<AuditReport>,
    pub visualizations: Option<Vec<Visualization>>,
    pub final_artifact: Option<FinalArtifact>,
    pub consensus_score: Option<f64>,

    /// Current deliberation round, 1-based
    pub deliberation_round: u32,
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Raw structured output per agent, set once per agent per run
    #[serde(default)]
    pub agent_outputs: BTreeMap<AgentId, serde_json::Value>,
    #[serde(default)]
    pub errors: Vec<ErrorRecord>,

    /// Citations registered during retrieval, read by the renderer
    #[serde(default)]
    pub citations: CitationRegistry,
}

impl SharedState {
    pub fn new(
        user_brief: impl Into<String>,
        mode: Mode,
        clarifications: BTreeMap<String, String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            user_brief: user_brief.into(),
            mode,
            clarifications,
            intent: None,
            plan: None,
            research_findings: Vec::new(),
            evidence: BTreeMap::new(),
            audit_report: None,
            visualizations: None,
            final_artifact: None,
            consensus_score: None,
            deliberation_round: 1,
            session_id: session_id.into(),
            started_at: Utc::now(),
            completed_at: None,
            agent_outputs: BTreeMap::new(),
            errors: Vec::new(),
            citations: CitationRegistry::new(),
        }
    }

    /// Write an agent's typed output into its declared field.
    ///
    /// Grounder findings replace any findings from an earlier deliberation
    /// round; every other field is written at most once per round.
    pub fn apply_output(&mut self, output: AgentOutput) {
        match output {
            AgentOutput::Interpreter(intent) => self.intent = Some(intent),
            AgentOutput::Planner(plan) => self.plan = Some(plan),
            AgentOutput::Grounder(findings) => self.research_findings = findings,
            AgentOutput::Auditor(report) => self.audit_report = Some(report),
            AgentOutput::Visualizer(visuals) => self.visualizations = Some(visuals),
            AgentOutput::Judge(verdict) => {
                self.consensus_score = Some(verdict.consensus.overall());
                self.final_artifact = Some(verdict.final_artifact);
            }
        }
    }

    /// Record the raw structured output an agent produced.
    pub fn record_raw_output(&mut self, agent: AgentId, raw: serde_json::Value) {
        self.agent_outputs.insert(agent, raw);
    }

    /// Append an error record for an agent.
    pub fn record_error(&mut self, agent: AgentId, message: impl Into<String>) {
        self.errors.push(ErrorRecord {
            agent,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    /// True when at least one error references the agent.
    pub fn has_error_for(&self, agent: AgentId) -> bool {
        self.errors.iter().any(|record| record.agent == agent)
    }

    /// Evidence list for a research question, empty when none was retrieved.
    pub fn evidence_for(&self, question_id: &str) -> &[SourceRecord] {
        self.evidence
            .get(question_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Ids of the planned research questions, in plan order.
    pub fn planned_question_ids(&self) -> Vec<&str> {
        self.plan
            .as_ref()
            .map(|plan| {
                plan.research_questions
                    .iter()
                    .map(|rq| rq.id.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Invariant check: every evidence key belongs to a planned question.
    pub fn evidence_within_plan(&self) -> bool {
        let planned = self.planned_question_ids();
        self.evidence
            .keys()
            .all(|key| planned.iter().any(|id| id == key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::artifact::{ConsensusScore, JudgeDecision, JudgeVerdict};
    use crate::outputs::plan::Plan;

    fn state() -> SharedState {
        SharedState::new("brief", Mode::Research, BTreeMap::new(), "session-1")
    }

    #[test]
    fn test_round_starts_at_one() {
        assert_eq!(state().deliberation_round, 1);
    }

    #[test]
    fn test_judge_output_sets_score_and_artifact() {
        let mut state = state();
        let verdict = JudgeVerdict {
            final_artifact: crate::outputs::artifact::FinalArtifact::empty("research_report"),
            consensus: ConsensusScore {
                groundedness: 0.9,
                coherence: 0.9,
                completeness: 0.84,
                justification: String::new(),
            },
            decision: JudgeDecision::Accept,
            revision_notes: String::new(),
        };
        state.apply_output(AgentOutput::Judge(verdict));
        assert!((state.consensus_score.unwrap() - 0.88).abs() < 1e-9);
        assert!(state.final_artifact.is_some());
    }

    #[test]
    fn test_error_recording() {
        let mut state = state();
        state.record_error(AgentId::Planner, "model absent");
        assert!(state.has_error_for(AgentId::Planner));
        assert!(!state.has_error_for(AgentId::Judge));
    }

    #[test]
    fn test_evidence_scope_invariant() {
        let mut state = state();
        state.apply_output(AgentOutput::Planner(Plan::fallback("q")));
        state.evidence.insert("RQ1".to_string(), vec![]);
        assert!(state.evidence_within_plan());

        state.evidence.insert("RQ9".to_string(), vec![]);
        assert!(!state.evidence_within_plan());
    }

    #[test]
    fn test_findings_replaced_on_revision() {
        let mut state = state();
        state.apply_output(AgentOutput::Grounder(vec![Finding::ungrounded("RQ1")]));
        assert_eq!(state.research_findings.len(), 1);
        state.apply_output(AgentOutput::Grounder(vec![
            Finding::ungrounded("RQ1"),
            Finding::ungrounded("RQ2"),
        ]));
        assert_eq!(state.research_findings.len(), 2);
    }
}
