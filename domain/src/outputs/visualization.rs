//! Visualizer output: visualization specifications

use serde::{Deserialize, Serialize};

/// Kind of visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationKind {
    Chart,
    #[default]
    Diagram,
    Flowchart,
    Architecture,
    Image,
}

/// A single visualization the final artifact should embed.
///
/// `specification` is opaque to the pipeline; only the renderer interprets
/// it, so any JSON-serializable object is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visualization {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: VisualizationKind,
    pub title: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub specification: serde_json::Value,
}
