//! Prompt assembly from a static template plus a structured input fragment
//!
//! Assembly is fully deterministic: no randomness, no clock, no environment
//! lookups. The same template and input always produce the same prompt.

use crate::evidence::source::SourceRecord;

/// Builds the prompt an agent sends to its model.
pub struct PromptAssembler;

impl PromptAssembler {
    /// `<template>\n\n## Input\n\n<fenced JSON>\n\n## Your Response\n\n...`
    pub fn assemble(template: &str, input: &serde_json::Value) -> String {
        let mut prompt = String::with_capacity(template.len() + 512);
        prompt.push_str(template);
        prompt.push_str("\n\n## Input\n\n```json\n");
        prompt.push_str(&Self::render_input(input));
        prompt.push_str("\n```\n\n## Your Response\n\nRespond with valid JSON only:");
        prompt
    }

    /// Same as [`assemble`](Self::assemble) with a retrieved-evidence block
    /// inserted before the input.
    pub fn assemble_with_evidence(
        template: &str,
        sources: &[SourceRecord],
        input: &serde_json::Value,
    ) -> String {
        let mut prompt = String::with_capacity(template.len() + 2048);
        prompt.push_str(template);
        prompt.push_str("\n\n## Retrieved Evidence\n\n");
        prompt.push_str(&Self::evidence_block(sources));
        prompt.push_str("\n## Input\n\n```json\n");
        prompt.push_str(&Self::render_input(input));
        prompt.push_str("\n```\n\n## Your Response\n\nRespond with valid JSON only:");
        prompt
    }

    /// Format sources as `[Source N]` blocks. N is the 1-based position in
    /// the question's evidence list, and the same N is what citation
    /// instructions refer to.
    pub fn evidence_block(sources: &[SourceRecord]) -> String {
        if sources.is_empty() {
            return "No sources were retrieved for this question.\n".to_string();
        }
        let mut block = String::new();
        for (index, source) in sources.iter().enumerate() {
            block.push_str(&format!("[Source {}] {}", index + 1, source.title));
            if let Some(url) = &source.url {
                block.push_str(&format!(" ({})", url));
            }
            block.push('\n');
            block.push_str(&source.content);
            block.push_str("\n\n");
        }
        block.push_str(
            "Cite sources by their [Source N] number in the evidence field of each finding.\n",
        );
        block
    }

    /// Appended to the prompt when a previous response failed to parse.
    pub fn json_retry_suffix() -> &'static str {
        "\n\nIMPORTANT: Your previous response could not be parsed. \
         Respond with ONLY valid JSON, no markdown, no explanations."
    }

    fn render_input(input: &serde_json::Value) -> String {
        serde_json::to_string_pretty(input).unwrap_or_else(|_| input.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::source::{SourceOrigin, SourceRecord};

    fn source(title: &str, url: Option<&str>) -> SourceRecord {
        SourceRecord {
            origin: SourceOrigin::Web,
            title: title.to_string(),
            url: url.map(String::from),
            content: "body text".to_string(),
            snippet: None,
            citation_id: None,
            relevance_score: 0.9,
        }
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let input = serde_json::json!({"user_brief": "Explain consensus", "context": ""});
        let a = PromptAssembler::assemble("You are the Interpreter.", &input);
        let b = PromptAssembler::assemble("You are the Interpreter.", &input);
        assert_eq!(a, b);
        assert!(a.contains("## Input"));
        assert!(a.contains("```json"));
        assert!(a.ends_with("Respond with valid JSON only:"));
    }

    #[test]
    fn test_evidence_block_labels_are_one_based() {
        let sources = vec![source("First", Some("https://x/a")), source("Second", None)];
        let block = PromptAssembler::evidence_block(&sources);
        assert!(block.contains("[Source 1] First (https://x/a)"));
        assert!(block.contains("[Source 2] Second"));
    }

    #[test]
    fn test_evidence_precedes_input() {
        let sources = vec![source("Only", None)];
        let input = serde_json::json!({"question": "q"});
        let prompt = PromptAssembler::assemble_with_evidence("T", &sources, &input);
        let evidence_at = prompt.find("## Retrieved Evidence").unwrap();
        let input_at = prompt.find("## Input").unwrap();
        assert!(evidence_at < input_at);
    }

    #[test]
    fn test_empty_evidence_still_renders() {
        let block = PromptAssembler::evidence_block(&[]);
        assert!(block.contains("No sources"));
    }
}
