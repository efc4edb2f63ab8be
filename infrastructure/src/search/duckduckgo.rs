//! Web search adapter over the DuckDuckGo Instant Answer API
//!
//! The Instant Answer API needs no key. It returns an abstract plus related
//! topics rather than a full listing; each topic link is fetched best-effort
//! and reduced to text so hits carry real page content. Results are cached
//! on disk per query.

use super::cache::SearchCache;
use super::extract::html_to_text;
use async_trait::async_trait;
use colloquy_application::{SearchError, SearchHit, WebSearch};
use tracing::{debug, warn};

const DDG_API_URL: &str = "https://api.duckduckgo.com/";
const USER_AGENT: &str = "colloquy/0.1 (evidence retrieval)";

/// Maximum bytes read from a fetched page.
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// DuckDuckGo search with content extraction and caching.
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    cache: SearchCache,
    fetch_timeout: std::time::Duration,
    max_content_length: usize,
}

impl DuckDuckGoSearch {
    pub fn new(cache: SearchCache) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache,
            fetch_timeout: std::time::Duration::from_secs(10),
            max_content_length: 5000,
        }
    }

    async fn query_api(&self, query: &str) -> Result<serde_json::Value, SearchError> {
        let response = self
            .client
            .get(DDG_API_URL)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .header("User-Agent", USER_AGENT)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SearchError::Failed(format!(
                "search API returned status {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| SearchError::Failed(format!("malformed search response: {e}")))
    }

    /// Fetch a URL and extract its text. Any failure falls back to `None`.
    async fn fetch_content(&self, url: &str) -> Option<String> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }
        let body = response.bytes().await.ok()?;
        if body.len() > MAX_BODY_SIZE {
            return None;
        }

        let text = html_to_text(&String::from_utf8_lossy(&body));
        if text.is_empty() {
            None
        } else {
            Some(text.chars().take(self.max_content_length).collect())
        }
    }

    /// Turn the API response into result candidates: abstract first, then
    /// related topics.
    fn candidates(data: &serde_json::Value, max_results: usize) -> Vec<(String, String, String)> {
        let mut out: Vec<(String, String, String)> = Vec::new();

        let abstract_text = data["AbstractText"].as_str().unwrap_or("");
        let abstract_url = data["AbstractURL"].as_str().unwrap_or("");
        if !abstract_text.is_empty() && !abstract_url.is_empty() {
            let source = data["AbstractSource"].as_str().unwrap_or("Abstract");
            out.push((
                abstract_url.to_string(),
                source.to_string(),
                abstract_text.to_string(),
            ));
        }

        if let Some(topics) = data["RelatedTopics"].as_array() {
            for topic in topics {
                if out.len() >= max_results {
                    break;
                }
                let text = topic["Text"].as_str().unwrap_or("");
                let url = topic["FirstURL"].as_str().unwrap_or("");
                if text.is_empty() || url.is_empty() {
                    continue;
                }
                // The text's leading clause doubles as a title.
                let title = text.split(" - ").next().unwrap_or(text);
                out.push((url.to_string(), title.to_string(), text.to_string()));
            }
        }

        out.truncate(max_results);
        out
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        if let Some(cached) = self.cache.get(query) {
            return Ok(cached.into_iter().take(max_results).collect());
        }

        debug!(query, max_results, "Searching DuckDuckGo");
        let data = self.query_api(query).await?;
        let candidates = Self::candidates(&data, max_results);

        let mut hits = Vec::with_capacity(candidates.len());
        for (url, title, snippet) in candidates {
            let content = match self.fetch_content(&url).await {
                Some(content) => content,
                None => {
                    warn!(%url, "Content extraction failed, using snippet");
                    snippet.clone()
                }
            };
            hits.push(SearchHit {
                url,
                title,
                snippet,
                content,
            });
        }

        self.cache.put(query, &hits);
        Ok(hits)
    }
}
