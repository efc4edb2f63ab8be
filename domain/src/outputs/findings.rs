//! Grounder output: per-question grounded findings

use crate::evidence::source::SourceRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Self-reported reliability of a cited source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reliability {
    High,
    #[default]
    Medium,
    Low,
}

/// A citation of one source from the question's evidence list.
///
/// `source_id` refers to the `[Source N]` label the prompt assigned; the
/// parser accepts `3`, `S3`, or `Source 3` forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRef {
    pub source_id: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub reliability: Reliability,
}

impl EvidenceRef {
    /// Resolve the cited label to a 0-based index into the evidence list.
    pub fn source_index(&self) -> Option<usize> {
        let digits: String = self
            .source_id
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let n: usize = digits.parse().ok()?;
        n.checked_sub(1)
    }
}

/// One key finding with its supporting citations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyFinding {
    pub finding: String,
    #[serde(default)]
    pub evidence: Vec<EvidenceRef>,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Error, Debug, PartialEq)]
pub enum FindingValidationError {
    #[error("Finding for {question} cites unknown source {source_id}")]
    UnknownSource { question: String, source_id: String },
}

/// The grounded answer to a single research question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub question_id: String,
    pub answer: String,
    #[serde(default)]
    pub key_findings: Vec<KeyFinding>,
    #[serde(default)]
    pub contradictions: Vec<String>,
    #[serde(default)]
    pub knowledge_gaps: Vec<String>,
    #[serde(default)]
    pub overall_confidence: f64,
}

impl Finding {
    /// Check that every cited source resolves to a record in this question's
    /// evidence list.
    pub fn validate_sources(
        &self,
        evidence: &[SourceRecord],
    ) -> Result<(), FindingValidationError> {
        for key_finding in &self.key_findings {
            for evidence_ref in &key_finding.evidence {
                let index = evidence_ref.source_index();
                let valid = matches!(index, Some(i) if i < evidence.len());
                if !valid {
                    return Err(FindingValidationError::UnknownSource {
                        question: self.question_id.clone(),
                        source_id: evidence_ref.source_id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// True when at least one key finding carries a citation.
    pub fn has_citations(&self) -> bool {
        self.key_findings
            .iter()
            .any(|finding| !finding.evidence.is_empty())
    }

    /// Degraded finding for a question that could not be grounded.
    pub fn ungrounded(question_id: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            answer: "Unable to retrieve sufficient evidence".to_string(),
            key_findings: vec![],
            contradictions: vec![],
            knowledge_gaps: vec!["Insufficient data available".to_string()],
            overall_confidence: 0.0,
        }
    }
}
