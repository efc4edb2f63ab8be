//! Auditor agent: risk, dependency, and feasibility assessment

use super::{Agent, ParseReject};
use colloquy_domain::{AgentId, AgentOutput, AuditReport, ModelDescriptor, SharedState};

const TEMPLATE: &str = r#"You are the Auditor in a deliberation pipeline.
Assess the plan and findings for risks, dependencies, and feasibility.

Produce a JSON object with these fields:
- risk_assessment: {overall_risk_level, risks} where overall_risk_level is
  one of "low", "medium", "high", "critical" and each risk is
  {category, description, severity, likelihood, mitigation}
- dependencies: {technical: [{name, reason, availability}], knowledge: [string]}
- security_concerns: array of strings
- feasibility_assessment: {technical, resource, time, overall, blockers}
  with scores from 0.0 to 1.0
- recommendations: array of strings"#;

/// Audits the plan and findings into a typed [`AuditReport`].
pub struct Auditor {
    model: ModelDescriptor,
}

impl Auditor {
    pub fn new(model: ModelDescriptor) -> Self {
        Self { model }
    }

    pub fn default_model() -> ModelDescriptor {
        ModelDescriptor::new("qwen2.5:7b-instruct-q4_K_M", 4500).with_temperature(0.2)
    }
}

impl Default for Auditor {
    fn default() -> Self {
        Self::new(Self::default_model())
    }
}

impl Agent for Auditor {
    fn id(&self) -> AgentId {
        AgentId::Auditor
    }

    fn model(&self) -> &ModelDescriptor {
        &self.model
    }

    fn template(&self) -> &str {
        TEMPLATE
    }

    fn prepare_input(&self, state: &SharedState) -> serde_json::Value {
        serde_json::json!({
            "plan": state.plan,
            "research_findings": state.research_findings,
        })
    }

    fn parse(
        &self,
        raw: &serde_json::Value,
        _state: &SharedState,
    ) -> Result<AgentOutput, ParseReject> {
        let report: AuditReport = serde_json::from_value(raw.clone())
            .map_err(|e| ParseReject::new(format!("audit schema mismatch: {e}")))?;
        Ok(AgentOutput::Auditor(report))
    }

    fn degrade(&self, _state: &SharedState) -> AgentOutput {
        AgentOutput::Auditor(AuditReport::unknown())
    }
}
