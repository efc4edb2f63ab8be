//! Markdown rendering of the final artifact
//!
//! Turns the deliberation state into the document the user actually reads:
//! title, metadata, sections with confidence markers, visualization specs,
//! bibliography, and a degradation notice when any agent recorded errors.

use colloquy_domain::{Section, SharedState};
use std::fmt::Write;

/// Render the full Markdown document for a completed run.
pub fn render_markdown(state: &SharedState) -> String {
    let mut doc = String::new();

    let title = state
        .intent
        .as_ref()
        .map(|intent| intent.primary_goal.as_str())
        .filter(|goal| !goal.trim().is_empty())
        .unwrap_or(&state.user_brief);
    let _ = writeln!(doc, "# {title}\n");

    render_metadata(&mut doc, state);

    if let Some(artifact) = &state.final_artifact {
        for section in &artifact.sections {
            render_section(&mut doc, section, 2);
        }
    } else {
        let _ = writeln!(doc, "_No artifact was produced for this run._\n");
    }

    if let Some(visuals) = &state.visualizations {
        if !visuals.is_empty() {
            let _ = writeln!(doc, "## Suggested Visualizations\n");
            for visual in visuals {
                let _ = writeln!(doc, "### {} ({:?})\n", visual.title, visual.kind);
                if !visual.purpose.is_empty() {
                    let _ = writeln!(doc, "{}\n", visual.purpose);
                }
                if !visual.specification.is_null() {
                    let spec = serde_json::to_string_pretty(&visual.specification)
                        .unwrap_or_else(|_| visual.specification.to_string());
                    let _ = writeln!(doc, "```json\n{spec}\n```\n");
                }
            }
        }
    }

    render_bibliography(&mut doc, state);

    if !state.errors.is_empty() {
        let _ = writeln!(doc, "## Notes\n");
        let _ = writeln!(
            doc,
            "This run degraded in {} place(s):\n",
            state.errors.len()
        );
        for error in &state.errors {
            let _ = writeln!(doc, "- `{}`: {}", error.agent, error.message);
        }
        let _ = writeln!(doc);
    }

    doc
}

fn render_metadata(doc: &mut String, state: &SharedState) {
    let _ = writeln!(doc, "> mode: {}  ", state.mode);
    let _ = writeln!(doc, "> session: {}  ", state.session_id);
    let _ = writeln!(doc, "> deliberation rounds: {}  ", state.deliberation_round);
    if let Some(score) = state.consensus_score {
        let _ = writeln!(doc, "> consensus: {score:.2}  ");
    }
    let _ = writeln!(
        doc,
        "> generated: {}  ",
        state.started_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(doc);
}

fn render_section(doc: &mut String, section: &Section, depth: usize) {
    let hashes = "#".repeat(depth.min(6));
    let _ = writeln!(doc, "{hashes} {}\n", section.title);
    if !section.content.trim().is_empty() {
        let _ = writeln!(doc, "{}\n", section.content.trim());
    }
    if !section.evidence.is_empty() {
        let refs: Vec<String> = section
            .evidence
            .iter()
            .map(|id| format!("[{id}]"))
            .collect();
        let _ = writeln!(doc, "_Sources: {}_\n", refs.join(" "));
    }
    for subsection in &section.subsections {
        render_section(doc, subsection, depth + 1);
    }
}

fn render_bibliography(doc: &mut String, state: &SharedState) {
    if state.citations.is_empty() {
        return;
    }
    let _ = writeln!(doc, "## References\n");
    for entry in state.citations.bibliography() {
        let _ = writeln!(doc, "- {entry}");
    }
    let breakdown: Vec<String> = state
        .citations
        .counts_by_type()
        .into_iter()
        .map(|(kind, count)| format!("{count} {kind}"))
        .collect();
    let _ = writeln!(
        doc,
        "\n_{} source(s) cited: {}_\n",
        state.citations.len(),
        breakdown.join(", ")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_domain::{
        ArtifactMetadata, ConsensusScore, FinalArtifact, JudgeDecision, JudgeVerdict, Mode,
        AgentOutput,
    };
    use std::collections::BTreeMap;

    fn state_with_artifact() -> SharedState {
        let mut state = SharedState::new(
            "Explain consensus",
            Mode::Research,
            BTreeMap::new(),
            "session-42",
        );
        state.citations.add_web_source("Consensus", "https://x/c");
        state.apply_output(AgentOutput::Judge(JudgeVerdict {
            final_artifact: FinalArtifact {
                artifact_type: "research_report".to_string(),
                sections: vec![Section {
                    title: "Overview".to_string(),
                    content: "Consensus is agreement.".to_string(),
                    subsections: vec![Section {
                        title: "Details".to_string(),
                        content: "More depth.".to_string(),
                        subsections: vec![],
                        confidence: 0.8,
                        evidence: vec!["cite1".to_string()],
                    }],
                    confidence: 0.9,
                    evidence: vec![],
                }],
                metadata: ArtifactMetadata::default(),
            },
            consensus: ConsensusScore {
                groundedness: 0.9,
                coherence: 0.9,
                completeness: 0.9,
                justification: String::new(),
            },
            decision: JudgeDecision::Accept,
            revision_notes: String::new(),
        }));
        state
    }

    #[test]
    fn test_renders_title_sections_and_references() {
        let doc = render_markdown(&state_with_artifact());
        assert!(doc.starts_with("# Explain consensus"));
        assert!(doc.contains("## Overview"));
        assert!(doc.contains("### Details"));
        assert!(doc.contains("_Sources: [cite1]_"));
        assert!(doc.contains("## References"));
        assert!(doc.contains("- [cite1]"));
        assert!(doc.contains("1 source(s) cited: 1 web"));
        assert!(doc.contains("consensus: 0.90"));
    }

    #[test]
    fn test_errors_render_notes_section() {
        let mut state = state_with_artifact();
        state.record_error(colloquy_domain::AgentId::Planner, "model absent");
        let doc = render_markdown(&state);
        assert!(doc.contains("## Notes"));
        assert!(doc.contains("`planner`: model absent"));
    }

    #[test]
    fn test_missing_artifact_renders_placeholder() {
        let state = SharedState::new("brief", Mode::Learn, BTreeMap::new(), "s");
        let doc = render_markdown(&state);
        assert!(doc.contains("No artifact was produced"));
    }
}
