//! Execution mode and the agent sequence each mode drives

use super::agent_id::AgentId;
use crate::core::error::DomainError;
use crate::outputs::intent::OutputType;
use serde::{Deserialize, Serialize};

/// Execution mode selected by the user.
///
/// The mode fixes the ordered agent sequence for the run and the default
/// artifact type the Interpreter falls back to when degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Research report: Interpreter -> Planner -> Grounder -> Auditor -> Judge
    #[default]
    Research,
    /// Project specification: Interpreter -> Planner -> Auditor -> Visualizer -> Judge
    Project,
    /// Learning path: Interpreter -> Planner -> Grounder -> Judge
    Learn,
}

impl Mode {
    /// Ordered agent sequence for this mode.
    pub fn agent_sequence(&self) -> &'static [AgentId] {
        match self {
            Mode::Research => &[
                AgentId::Interpreter,
                AgentId::Planner,
                AgentId::Grounder,
                AgentId::Auditor,
                AgentId::Judge,
            ],
            Mode::Project => &[
                AgentId::Interpreter,
                AgentId::Planner,
                AgentId::Auditor,
                AgentId::Visualizer,
                AgentId::Judge,
            ],
            Mode::Learn => &[
                AgentId::Interpreter,
                AgentId::Planner,
                AgentId::Grounder,
                AgentId::Judge,
            ],
        }
    }

    /// Agents re-run when the Judge requests another deliberation round.
    ///
    /// The suffix starts at the Grounder where the mode has one; otherwise
    /// at the first agent after the Planner. Interpretation and planning are
    /// never repeated.
    pub fn revision_sequence(&self) -> &'static [AgentId] {
        match self {
            Mode::Research => &[AgentId::Grounder, AgentId::Auditor, AgentId::Judge],
            Mode::Project => &[AgentId::Auditor, AgentId::Visualizer, AgentId::Judge],
            Mode::Learn => &[AgentId::Grounder, AgentId::Judge],
        }
    }

    /// Artifact type this mode produces by default.
    pub fn default_output_type(&self) -> OutputType {
        match self {
            Mode::Research => OutputType::ResearchReport,
            Mode::Project => OutputType::ProjectSpec,
            Mode::Learn => OutputType::LearningPath,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Mode::Research => "Evidence-grounded research report",
            Mode::Project => "Project specification with risk audit and visuals",
            Mode::Learn => "Structured learning path",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Research => write!(f, "research"),
            Mode::Project => write!(f, "project"),
            Mode::Learn => write!(f, "learn"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "research" | "r" => Ok(Mode::Research),
            "project" | "p" => Ok(Mode::Project),
            "learn" | "l" => Ok(Mode::Learn),
            other => Err(DomainError::InvalidMode(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequences_end_with_judge() {
        for mode in [Mode::Research, Mode::Project, Mode::Learn] {
            assert_eq!(*mode.agent_sequence().last().unwrap(), AgentId::Judge);
            assert_eq!(*mode.revision_sequence().last().unwrap(), AgentId::Judge);
        }
    }

    #[test]
    fn test_revision_is_suffix_of_sequence() {
        for mode in [Mode::Research, Mode::Project, Mode::Learn] {
            let full = mode.agent_sequence();
            let suffix = mode.revision_sequence();
            assert_eq!(&full[full.len() - suffix.len()..], suffix);
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!("research".parse::<Mode>().ok(), Some(Mode::Research));
        assert_eq!("P".parse::<Mode>().ok(), Some(Mode::Project));
        assert!("debate".parse::<Mode>().is_err());
    }

    #[test]
    fn test_research_has_no_visualizer() {
        assert!(!Mode::Research
            .agent_sequence()
            .contains(&AgentId::Visualizer));
    }
}
