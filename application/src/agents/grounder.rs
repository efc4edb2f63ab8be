//! Grounder agent: evidence retrieval and per-question grounded answers
//!
//! The Grounder is the one agent that overrides the default think-cycle: it
//! first fans out retrieval for every planned research question, then holds
//! its model resident while generating one grounded answer per question.

use super::{Agent, AgentContext, ParseReject};
use crate::ports::model_runtime::GenerationRequest;
use crate::retrieval::EvidenceRetriever;
use async_trait::async_trait;
use colloquy_domain::{
    extract_json, AgentId, AgentOutput, Finding, ModelDescriptor, PromptAssembler,
    ResearchQuestion, SharedState, SourceRecord,
};
use tracing::warn;

const TEMPLATE: &str = r#"You are the Grounder in a deliberation pipeline.
Answer the research question below using ONLY the retrieved evidence.

Produce a JSON object with these fields:
- question_id: the id of the question being answered
- answer: a grounded answer to the question
- key_findings: array of {finding, evidence, confidence} where evidence is an
  array of {source_id, excerpt, reliability}; source_id refers to a
  [Source N] label and reliability is "high", "medium", or "low"
- contradictions: claims the sources disagree on
- knowledge_gaps: aspects the evidence does not cover
- overall_confidence: 0.0 to 1.0

Do not invent sources. Every key finding must cite at least one [Source N]."#;

/// Retrieves evidence and produces one grounded [`Finding`] per question.
pub struct Grounder {
    model: ModelDescriptor,
    retriever: EvidenceRetriever,
}

impl Grounder {
    pub fn new(model: ModelDescriptor, retriever: EvidenceRetriever) -> Self {
        Self { model, retriever }
    }

    pub fn default_model() -> ModelDescriptor {
        ModelDescriptor::new("qwen2.5:7b-instruct-q4_K_M", 4500).with_temperature(0.2)
    }

    /// Parse one finding for a specific question, forcing the question id
    /// and validating citations against the question's evidence list.
    fn parse_finding(
        raw: &serde_json::Value,
        question: &ResearchQuestion,
        evidence: &[SourceRecord],
    ) -> Result<Finding, ParseReject> {
        let mut raw = raw.clone();
        if let Some(object) = raw.as_object_mut() {
            object
                .entry("question_id")
                .or_insert_with(|| serde_json::json!(question.id));
        }
        let mut finding: Finding = serde_json::from_value(raw)
            .map_err(|e| ParseReject::new(format!("finding schema mismatch: {e}")))?;
        finding.question_id = question.id.clone();

        if finding.answer.trim().is_empty() {
            return Err(ParseReject::new("answer is empty"));
        }
        finding
            .validate_sources(evidence)
            .map_err(|e| ParseReject::new(e.to_string()))?;
        Ok(finding)
    }
}

#[async_trait]
impl Agent for Grounder {
    fn id(&self) -> AgentId {
        AgentId::Grounder
    }

    fn model(&self) -> &ModelDescriptor {
        &self.model
    }

    fn template(&self) -> &str {
        TEMPLATE
    }

    fn prepare_input(&self, state: &SharedState) -> serde_json::Value {
        serde_json::json!({
            "research_questions": state.plan.as_ref().map(|p| &p.research_questions),
        })
    }

    fn parse(
        &self,
        raw: &serde_json::Value,
        state: &SharedState,
    ) -> Result<AgentOutput, ParseReject> {
        let finding: Finding = serde_json::from_value(raw.clone())
            .map_err(|e| ParseReject::new(format!("finding schema mismatch: {e}")))?;
        finding
            .validate_sources(state.evidence_for(&finding.question_id))
            .map_err(|e| ParseReject::new(e.to_string()))?;
        Ok(AgentOutput::Grounder(vec![finding]))
    }

    fn degrade(&self, state: &SharedState) -> AgentOutput {
        let findings = match &state.plan {
            Some(plan) if !plan.research_questions.is_empty() => plan
                .research_questions
                .iter()
                .map(|question| Finding::ungrounded(&question.id))
                .collect(),
            _ => vec![Finding::ungrounded("RQ1")],
        };
        AgentOutput::Grounder(findings)
    }

    async fn execute(&self, state: &mut SharedState, cx: &AgentContext<'_>) -> AgentOutput {
        let questions: Vec<ResearchQuestion> = state
            .plan
            .as_ref()
            .map(|plan| plan.research_questions.clone())
            .unwrap_or_default();

        if questions.is_empty() {
            state.record_error(self.id(), "no research questions available for grounding");
            return self.degrade(state);
        }

        // Phase 1: evidence fanout. Warnings are recorded, never raised.
        let mut registry = std::mem::take(&mut state.citations);
        let outcome = self
            .retriever
            .retrieve(
                &questions,
                cx.config.max_sources_per_question,
                cx.deadline,
                cx.cancel,
                &mut registry,
            )
            .await;
        state.citations = registry;

        for warning in &outcome.warnings {
            state.record_error(self.id(), warning.to_string());
        }
        for (question_id, records) in outcome.evidence {
            cx.progress.on_retrieval_complete(&question_id, records.len());
            state.evidence.insert(question_id, records);
        }

        // Newly fetched web content feeds the persistent knowledge base so
        // later runs can hit it semantically.
        self.retriever.seed_store(&state.evidence).await;

        if cx.cancel.is_cancelled() {
            state.record_error(self.id(), "cancelled during evidence retrieval");
            let partial: Vec<Finding> = vec![];
            if let Ok(raw) = serde_json::to_value(&partial) {
                state.record_raw_output(self.id(), raw);
            }
            return AgentOutput::Grounder(partial);
        }

        // Phase 2: one grounded answer per question, model held throughout.
        let state_view: &SharedState = state;
        let model = self.model.clone();
        let config = cx.config;
        let deadline = cx.deadline;
        let cancel = cx.cancel;
        let questions_view = &questions;

        let slot_result = cx
            .slot
            .with_model(&self.model, cx.deadline, cx.cancel, |runtime| async move {
                let mut findings: Vec<Finding> = Vec::new();
                let mut degraded_questions = 0usize;
                let mut interrupted = false;

                'questions: for question in questions_view {
                    if cancel.is_cancelled() || deadline.is_expired() {
                        interrupted = true;
                        break;
                    }

                    let evidence = state_view.evidence_for(&question.id);
                    let input = serde_json::json!({
                        "question_id": question.id,
                        "question": question.question,
                        "type": question.question_type,
                        "priority": question.priority,
                    });
                    let base_prompt =
                        PromptAssembler::assemble_with_evidence(TEMPLATE, evidence, &input);
                    let mut prompt = base_prompt.clone();
                    let mut parsed: Option<Finding> = None;
                    let attempts = config.max_parse_retries + 1;

                    for attempt in 1..=attempts {
                        if cancel.is_cancelled() || deadline.is_expired() {
                            interrupted = true;
                            break 'questions;
                        }

                        let request = GenerationRequest::for_model(
                            &model,
                            &prompt,
                            deadline.bounded(config.generate_timeout),
                        );
                        let generated = tokio::select! {
                            result = runtime.generate(request) => result,
                            _ = cancel.cancelled() => {
                                interrupted = true;
                                break 'questions;
                            }
                            _ = tokio::time::sleep_until(deadline.instant()) => {
                                interrupted = true;
                                break 'questions;
                            }
                        };
                        match generated {
                            Ok(text) => {
                                if let Some(raw) = extract_json(&text) {
                                    match Self::parse_finding(&raw, question, evidence) {
                                        Ok(finding) => {
                                            parsed = Some(finding);
                                            break;
                                        }
                                        Err(reject) => warn!(
                                            question = %question.id,
                                            attempt,
                                            reason = %reject,
                                            "Finding rejected"
                                        ),
                                    }
                                } else {
                                    warn!(question = %question.id, attempt, "No JSON in response");
                                }
                            }
                            Err(e) => {
                                warn!(question = %question.id, error = %e, "Generation failed");
                                break;
                            }
                        }

                        if attempt < attempts {
                            prompt =
                                format!("{base_prompt}{}", PromptAssembler::json_retry_suffix());
                        }
                    }

                    match parsed {
                        Some(finding) => findings.push(finding),
                        None => {
                            degraded_questions += 1;
                            findings.push(Finding::ungrounded(&question.id));
                        }
                    }
                }

                (findings, degraded_questions, interrupted)
            })
            .await;

        match slot_result {
            Ok((findings, degraded_questions, interrupted)) => {
                if interrupted {
                    state.record_error(
                        self.id(),
                        "interrupted during grounding; keeping partial findings",
                    );
                }
                if degraded_questions > 0 {
                    state.record_error(
                        self.id(),
                        format!("{degraded_questions} question(s) fell back to ungrounded findings"),
                    );
                }
                if let Ok(raw) = serde_json::to_value(&findings) {
                    state.record_raw_output(self.id(), raw);
                }
                AgentOutput::Grounder(findings)
            }
            Err(e) => {
                state.record_error(self.id(), e.to_string());
                let degraded = self.degrade(state);
                if let Ok(raw) = serde_json::to_value(&degraded) {
                    state.record_raw_output(self.id(), raw);
                }
                degraded
            }
        }
    }
}
