//! Auditor output: risks, dependencies, and feasibility

use serde::{Deserialize, Serialize};

/// Overall risk classification.
///
/// `Unknown` only appears in degraded reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
    Critical,
    Unknown,
}

/// A single identified risk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Risk {
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub likelihood: String,
    #[serde(default)]
    pub mitigation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskAssessment {
    #[serde(default)]
    pub overall_risk_level: RiskLevel,
    #[serde(default)]
    pub risks: Vec<Risk>,
}

/// An external technical dependency the plan relies on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalDependency {
    pub name: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub availability: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyMap {
    #[serde(default)]
    pub technical: Vec<TechnicalDependency>,
    #[serde(default)]
    pub knowledge: Vec<String>,
}

fn half() -> f64 {
    0.5
}

/// Self-reported feasibility scores, each in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feasibility {
    #[serde(default = "half")]
    pub technical: f64,
    #[serde(default = "half")]
    pub resource: f64,
    #[serde(default = "half")]
    pub time: f64,
    #[serde(default = "half")]
    pub overall: f64,
    #[serde(default)]
    pub blockers: Vec<String>,
}

impl Default for Feasibility {
    fn default() -> Self {
        Self {
            technical: 0.5,
            resource: 0.5,
            time: 0.5,
            overall: 0.5,
            blockers: vec![],
        }
    }
}

/// The Auditor's full report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub risk_assessment: RiskAssessment,
    #[serde(default)]
    pub dependencies: DependencyMap,
    #[serde(default)]
    pub security_concerns: Vec<String>,
    #[serde(default)]
    pub feasibility_assessment: Feasibility,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl AuditReport {
    /// Degraded report: unknown risk level, everything else empty.
    pub fn unknown() -> Self {
        Self {
            risk_assessment: RiskAssessment {
                overall_risk_level: RiskLevel::Unknown,
                risks: vec![],
            },
            dependencies: DependencyMap::default(),
            security_concerns: vec![],
            feasibility_assessment: Feasibility::default(),
            recommendations: vec![],
        }
    }
}
