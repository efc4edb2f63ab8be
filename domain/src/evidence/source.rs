//! Source records assembled by the evidence retriever

use serde::{Deserialize, Serialize};

/// Where a source record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceOrigin {
    Web,
    Vector,
}

impl SourceOrigin {
    /// Tie-break rank: vector sources sort before web sources at equal
    /// relevance.
    pub fn tie_break_rank(&self) -> u8 {
        match self {
            SourceOrigin::Vector => 0,
            SourceOrigin::Web => 1,
        }
    }
}

/// One piece of evidence attached to a research question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub origin: SourceOrigin,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Extracted text, truncated to the retriever's character cap
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation_id: Option<String>,
    /// Relevance in [0, 1]
    pub relevance_score: f64,
}

impl SourceRecord {
    /// Dedup key by URL, when the record has one.
    pub fn url_key(&self) -> Option<String> {
        self.url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_ascii_lowercase())
    }

    /// Dedup key across origins: title plus the first 200 characters of
    /// content.
    pub fn content_key(&self) -> (String, String) {
        let prefix: String = self.content.chars().take(200).collect();
        (self.title.to_ascii_lowercase(), prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(origin: SourceOrigin, url: Option<&str>, title: &str) -> SourceRecord {
        SourceRecord {
            origin,
            title: title.to_string(),
            url: url.map(String::from),
            content: "shared content body".to_string(),
            snippet: None,
            citation_id: None,
            relevance_score: 0.5,
        }
    }

    #[test]
    fn test_url_key_normalizes() {
        let a = record(SourceOrigin::Web, Some("https://X.example/Y/"), "t");
        let b = record(SourceOrigin::Web, Some("https://x.example/Y"), "t");
        assert_eq!(a.url_key(), b.url_key());
    }

    #[test]
    fn test_content_key_matches_across_origins() {
        let a = record(SourceOrigin::Web, Some("https://x/y"), "Same Title");
        let b = record(SourceOrigin::Vector, None, "same title");
        assert_eq!(a.content_key(), b.content_key());
    }

    #[test]
    fn test_vector_sorts_before_web() {
        assert!(SourceOrigin::Vector.tie_break_rank() < SourceOrigin::Web.tie_break_rank());
    }
}
