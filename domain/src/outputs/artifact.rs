//! Judge output: the final artifact, consensus scoring, and the
//! accept/revise decision

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// A section of the final artifact. Sections may nest one level via
/// `subsections`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subsections: Vec<Section>,
    #[serde(default)]
    pub confidence: f64,
    /// Citation ids referenced by this section
    #[serde(default)]
    pub evidence: Vec<String>,
}

/// Metadata the Judge attaches to the artifact. Unknown keys are preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    #[serde(default)]
    pub agents_consulted: Vec<String>,
    #[serde(default)]
    pub total_sources: u32,
    #[serde(default)]
    pub deliberation_rounds: u32,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The synthesized document the pipeline exists to produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalArtifact {
    #[serde(rename = "type")]
    pub artifact_type: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub metadata: ArtifactMetadata,
}

impl FinalArtifact {
    /// An artifact with no sections, used when the Judge degrades.
    pub fn empty(artifact_type: impl Into<String>) -> Self {
        Self {
            artifact_type: artifact_type.into(),
            sections: vec![],
            metadata: ArtifactMetadata::default(),
        }
    }
}

/// The Judge's self-reported quality sub-scores.
///
/// The overall consensus is always computed here as the arithmetic mean;
/// any `overall` field the model reports is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusScore {
    pub groundedness: f64,
    pub coherence: f64,
    pub completeness: f64,
    #[serde(default)]
    pub justification: String,
}

impl ConsensusScore {
    /// Reject sub-scores outside [0, 1].
    pub fn validate(&self) -> Result<(), DomainError> {
        for score in [self.groundedness, self.coherence, self.completeness] {
            if !(0.0..=1.0).contains(&score) || score.is_nan() {
                return Err(DomainError::ScoreOutOfRange(score));
            }
        }
        Ok(())
    }

    /// `(groundedness + coherence + completeness) / 3`
    pub fn overall(&self) -> f64 {
        (self.groundedness + self.coherence + self.completeness) / 3.0
    }
}

/// Judge's verdict on the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgeDecision {
    Accept,
    NeedsRevision,
}

/// The Judge's full output for one deliberation round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub final_artifact: FinalArtifact,
    pub consensus: ConsensusScore,
    pub decision: JudgeDecision,
    #[serde(default)]
    pub revision_notes: String,
}

impl JudgeVerdict {
    /// Degraded verdict: accept with an empty artifact and floor scores.
    pub fn degraded(artifact_type: impl Into<String>) -> Self {
        Self {
            final_artifact: FinalArtifact::empty(artifact_type),
            consensus: ConsensusScore {
                groundedness: 0.0,
                coherence: 0.0,
                completeness: 0.0,
                justification: "Degraded: synthesis unavailable".to_string(),
            },
            decision: JudgeDecision::Accept,
            revision_notes: String::new(),
        }
    }
}
