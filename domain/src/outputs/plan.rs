//! Planner output: research questions, phases, and dependency validation

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Kind of research question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Factual,
    Analytical,
    Comparative,
    #[default]
    Exploratory,
}

/// Question priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

/// A single research question within the plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchQuestion {
    pub id: String,
    pub question: String,
    #[serde(rename = "type", default)]
    pub question_type: QuestionType,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub estimated_time_minutes: u32,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// A phase grouping several research questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanPhase {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rq_ids: Vec<String>,
    #[serde(default)]
    pub parallel: bool,
}

/// Validation failures for a parsed plan.
#[derive(Error, Debug, PartialEq)]
pub enum PlanValidationError {
    #[error("Plan contains no research questions")]
    NoQuestions,

    #[error("Duplicate research question id: {0}")]
    DuplicateId(String),

    #[error("Question {question} depends on unknown id {dependency}")]
    UnknownDependency { question: String, dependency: String },

    #[error("Dependency cycle involving question {0}")]
    DependencyCycle(String),
}

/// The Planner's full output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub research_questions: Vec<ResearchQuestion>,
    #[serde(default)]
    pub phases: Vec<PlanPhase>,
    #[serde(default)]
    pub success_criteria: Vec<String>,
    #[serde(default)]
    pub estimated_total_time_minutes: u32,
}

impl Plan {
    /// Check that the question set is non-empty, ids are unique, and the
    /// dependency graph is a DAG over existing ids.
    pub fn validate(&self) -> Result<(), PlanValidationError> {
        if self.research_questions.is_empty() {
            return Err(PlanValidationError::NoQuestions);
        }

        let mut ids = HashSet::new();
        for rq in &self.research_questions {
            if !ids.insert(rq.id.as_str()) {
                return Err(PlanValidationError::DuplicateId(rq.id.clone()));
            }
        }

        for rq in &self.research_questions {
            for dep in &rq.dependencies {
                if !ids.contains(dep.as_str()) {
                    return Err(PlanValidationError::UnknownDependency {
                        question: rq.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        self.check_acyclic()
    }

    /// Kahn's algorithm over the dependency edges.
    fn check_acyclic(&self) -> Result<(), PlanValidationError> {
        let mut in_degree: HashMap<&str, usize> = self
            .research_questions
            .iter()
            .map(|rq| (rq.id.as_str(), rq.dependencies.len()))
            .collect();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for rq in &self.research_questions {
            for dep in &rq.dependencies {
                dependents.entry(dep.as_str()).or_default().push(&rq.id);
            }
        }

        let mut ready: Vec<&str> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut resolved = 0usize;

        while let Some(id) = ready.pop() {
            resolved += 1;
            if let Some(deps) = dependents.get(id) {
                for dependent in deps {
                    let entry = in_degree.get_mut(dependent).expect("known id");
                    *entry -= 1;
                    if *entry == 0 {
                        ready.push(dependent);
                    }
                }
            }
        }

        if resolved == self.research_questions.len() {
            Ok(())
        } else {
            let stuck = in_degree
                .iter()
                .find(|(_, d)| **d > 0)
                .map(|(id, _)| id.to_string())
                .unwrap_or_default();
            Err(PlanValidationError::DependencyCycle(stuck))
        }
    }

    /// Look up a question by id.
    pub fn question(&self, id: &str) -> Option<&ResearchQuestion> {
        self.research_questions.iter().find(|rq| rq.id == id)
    }

    /// A minimal single-question plan around the given text.
    ///
    /// Used as the Planner's degraded output.
    pub fn fallback(question: impl Into<String>) -> Self {
        let question = question.into();
        Self {
            research_questions: vec![ResearchQuestion {
                id: "RQ1".to_string(),
                question,
                question_type: QuestionType::Exploratory,
                priority: Priority::Critical,
                estimated_time_minutes: 30,
                dependencies: vec![],
            }],
            phases: vec![PlanPhase {
                name: "Investigation".to_string(),
                description: "Investigate the topic".to_string(),
                rq_ids: vec!["RQ1".to_string()],
                parallel: false,
            }],
            success_criteria: vec!["Address the user's brief".to_string()],
            estimated_total_time_minutes: 30,
        }
    }
}
