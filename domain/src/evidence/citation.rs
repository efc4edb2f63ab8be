//! Citation tracking and bibliography formatting

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of cited source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Web,
    Paper,
    Book,
    Documentation,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Web => "web",
            SourceType::Paper => "paper",
            SourceType::Book => "book",
            SourceType::Documentation => "documentation",
        }
    }

    /// Classify a URL by the kind of source it points at.
    ///
    /// Papers, books, and documentation hosts get their own type so the
    /// bibliography breakdown says something; everything else is `Web`.
    pub fn classify_url(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();

        const PAPER_HOSTS: &[&str] = &[
            "arxiv.org",
            "doi.org",
            "dl.acm.org",
            "ieeexplore.ieee.org",
            "ssrn.com",
        ];
        if PAPER_HOSTS.iter().any(|host| lower.contains(host)) {
            return SourceType::Paper;
        }

        const BOOK_HOSTS: &[&str] = &["books.google.", "openlibrary.org"];
        if BOOK_HOSTS.iter().any(|host| lower.contains(host)) {
            return SourceType::Book;
        }

        if lower.contains("readthedocs.")
            || lower.contains("://docs.")
            || lower.contains("/docs/")
            || lower.contains("/documentation/")
        {
            return SourceType::Documentation;
        }

        SourceType::Web
    }
}

/// A structured citation, unique per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub id: String,
    pub title: String,
    pub url: String,
    pub accessed_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
}

impl Citation {
    /// Bibliography entry, loosely APA: authors/publisher, title, date, URL.
    pub fn format_entry(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(authors) = &self.authors {
            if !authors.is_empty() {
                parts.push(authors.join(", "));
            }
        }
        if parts.is_empty() {
            if let Some(publisher) = &self.publisher {
                parts.push(publisher.clone());
            }
        }
        parts.push(format!("\"{}\"", self.title));
        if let Some(published) = &self.publication_date {
            parts.push(format!("({})", published));
        }
        parts.push(format!("Accessed {}", self.accessed_date));
        if !self.url.is_empty() {
            parts.push(self.url.clone());
        }
        parts.join(". ")
    }
}

/// Per-run citation registry.
///
/// Ids are dense (`cite1`, `cite2`, ...) in registration order. The Grounder
/// is the only writer; the renderer reads it for the bibliography.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CitationRegistry {
    citations: BTreeMap<String, Citation>,
    next_index: u32,
}

impl CitationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a web search hit and return its citation id. The source
    /// type is classified from the URL.
    pub fn add_web_source(&mut self, title: impl Into<String>, url: impl Into<String>) -> String {
        let url = url.into();
        let publisher = Self::extract_publisher(&url);
        let source_type = SourceType::classify_url(&url);
        self.add(Citation {
            id: String::new(),
            title: title.into(),
            url,
            accessed_date: Utc::now().format("%Y-%m-%d").to_string(),
            authors: None,
            publication_date: None,
            source_type,
            publisher,
        })
    }

    /// Register a fully specified citation; the id field is overwritten.
    pub fn add(&mut self, mut citation: Citation) -> String {
        self.next_index += 1;
        let id = format!("cite{}", self.next_index);
        citation.id = id.clone();
        self.citations.insert(id.clone(), citation);
        id
    }

    pub fn get(&self, id: &str) -> Option<&Citation> {
        self.citations.get(id)
    }

    pub fn len(&self) -> usize {
        self.citations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }

    /// All citations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Citation> {
        let mut entries: Vec<&Citation> = self.citations.values().collect();
        entries.sort_by_key(|c| {
            c.id.trim_start_matches("cite")
                .parse::<u32>()
                .unwrap_or(u32::MAX)
        });
        entries.into_iter()
    }

    /// Formatted bibliography in registration order, one `[id]`-labeled
    /// entry per citation.
    pub fn bibliography(&self) -> Vec<String> {
        self.iter()
            .map(|citation| format!("[{}] {}", citation.id, citation.format_entry()))
            .collect()
    }

    /// Citation counts keyed by source type.
    pub fn counts_by_type(&self) -> BTreeMap<&'static str, usize> {
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for citation in self.citations.values() {
            *counts.entry(citation.source_type.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Host portion of a URL, minus a leading `www.`
    fn extract_publisher(url: &str) -> Option<String> {
        let after_scheme = url.split("://").nth(1)?;
        let host = after_scheme.split('/').next()?;
        let host = host.strip_prefix("www.").unwrap_or(host);
        if host.is_empty() {
            None
        } else {
            Some(host.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_dense_and_ordered() {
        let mut registry = CitationRegistry::new();
        let a = registry.add_web_source("First", "https://example.com/a");
        let b = registry.add_web_source("Second", "https://example.com/b");
        assert_eq!(a, "cite1");
        assert_eq!(b, "cite2");
        let titles: Vec<&str> = registry.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[test]
    fn test_publisher_extracted_from_url() {
        let mut registry = CitationRegistry::new();
        let id = registry.add_web_source("Doc", "https://www.rust-lang.org/learn");
        let citation = registry.get(&id).unwrap();
        assert_eq!(citation.publisher.as_deref(), Some("rust-lang.org"));
    }

    #[test]
    fn test_bibliography_entry_labeled_with_id() {
        let mut registry = CitationRegistry::new();
        registry.add_web_source("Consensus Explained", "https://example.com/consensus");
        let bib = registry.bibliography();
        assert_eq!(bib.len(), 1);
        assert!(bib[0].starts_with("[cite1]"));
        assert!(bib[0].contains("Consensus Explained"));
        assert!(bib[0].contains("https://example.com/consensus"));
    }

    #[test]
    fn test_classify_url() {
        assert_eq!(
            SourceType::classify_url("https://arxiv.org/abs/1706.03762"),
            SourceType::Paper
        );
        assert_eq!(
            SourceType::classify_url("https://doi.org/10.1145/3318041"),
            SourceType::Paper
        );
        assert_eq!(
            SourceType::classify_url("https://openlibrary.org/works/OL123"),
            SourceType::Book
        );
        assert_eq!(
            SourceType::classify_url("https://docs.rs/tokio/latest"),
            SourceType::Documentation
        );
        assert_eq!(
            SourceType::classify_url("https://tokio.rs/tokio/tutorial/docs/intro"),
            SourceType::Documentation
        );
        assert_eq!(
            SourceType::classify_url("https://example.com/blog/consensus"),
            SourceType::Web
        );
    }

    #[test]
    fn test_counts_by_type_reflect_classification() {
        let mut registry = CitationRegistry::new();
        registry.add_web_source("Blog", "https://x/a");
        registry.add_web_source("Survey", "https://arxiv.org/abs/2001.00001");
        registry.add_web_source("Manual", "https://docs.example.org/guide");
        let counts = registry.counts_by_type();
        assert_eq!(counts.get("web"), Some(&1));
        assert_eq!(counts.get("paper"), Some(&1));
        assert_eq!(counts.get("documentation"), Some(&1));
    }
}
