//! Interpreter output: the interpreted intent behind the user brief

use serde::{Deserialize, Serialize};

/// Maximum clarifying questions an interpretation may carry.
pub const MAX_CLARIFYING_QUESTIONS: usize = 5;

fn default_confidence() -> f64 {
    0.7
}

fn default_domain() -> String {
    "general".to_string()
}

/// Kind of artifact the run should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    ResearchReport,
    ProjectSpec,
    LearningPath,
}

impl std::fmt::Display for OutputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputType::ResearchReport => write!(f, "research_report"),
            OutputType::ProjectSpec => write!(f, "project_spec"),
            OutputType::LearningPath => write!(f, "learning_path"),
        }
    }
}

/// Breadth of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Broad,
    #[default]
    Moderate,
    Narrow,
}

/// Structured interpretation of the user brief.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub primary_goal: String,
    #[serde(default = "default_domain")]
    pub domain: String,
    pub output_type: OutputType,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub extracted_requirements: Vec<String>,
    #[serde(default)]
    pub ambiguities: Vec<String>,
    #[serde(default)]
    pub clarifying_questions: Vec<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl Intent {
    /// Cap the clarifying questions and clamp confidence into range.
    pub fn normalized(mut self) -> Self {
        self.clarifying_questions.truncate(MAX_CLARIFYING_QUESTIONS);
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self
    }
}
