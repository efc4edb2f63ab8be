//! Domain layer for colloquy
//!
//! This crate contains the core types of the deliberation pipeline: execution
//! modes, agent identities, the shared deliberation state, the typed output
//! schemas each agent produces, evidence and citation tracking, and the
//! deterministic prompt assembly / JSON extraction helpers.
//!
//! It has no dependencies on infrastructure or presentation concerns and
//! performs no I/O.

pub mod core;
pub mod evidence;
pub mod model;
pub mod outputs;
pub mod pipeline;
pub mod prompt;
pub mod state;

// Re-export commonly used types
pub use crate::core::{brief::Brief, error::DomainError};
pub use evidence::{
    citation::{Citation, CitationRegistry, SourceType},
    source::{SourceOrigin, SourceRecord},
};
pub use model::ModelDescriptor;
pub use outputs::{
    artifact::{
        ArtifactMetadata, ConsensusScore, FinalArtifact, JudgeDecision, JudgeVerdict, Section,
    },
    audit::{AuditReport, DependencyMap, Feasibility, Risk, RiskAssessment, RiskLevel},
    findings::{EvidenceRef, Finding, KeyFinding, Reliability},
    intent::{Intent, OutputType, Scope},
    plan::{Plan, PlanPhase, PlanValidationError, Priority, QuestionType, ResearchQuestion},
    visualization::{Visualization, VisualizationKind},
    AgentOutput,
};
pub use pipeline::{agent_id::AgentId, mode::Mode};
pub use prompt::{assembler::PromptAssembler, extract::extract_json};
pub use state::{ErrorRecord, SharedState};
