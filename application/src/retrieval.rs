//! Evidence retrieval for the Grounder
//!
//! Fans out per-question queries to the web search and vector store
//! capabilities, ranks and deduplicates the hits, caps them per question,
//! and registers web sources with the citation registry. Sub-query failures
//! become warnings, never errors: the retriever always returns an outcome.

use crate::deadline::Deadline;
use crate::ports::vector_store::{VectorHit, VectorStore};
use crate::ports::web_search::{SearchHit, WebSearch};
use colloquy_domain::{CitationRegistry, ResearchQuestion, SourceOrigin, SourceRecord};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A non-fatal retrieval failure, recorded per question.
#[derive(Debug, Clone)]
pub struct RetrievalWarning {
    pub question_id: String,
    pub origin: SourceOrigin,
    pub message: String,
}

impl std::fmt::Display for RetrievalWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let origin = match self.origin {
            SourceOrigin::Web => "web",
            SourceOrigin::Vector => "vector",
        };
        write!(
            f,
            "{origin} retrieval warning for {}: {}",
            self.question_id, self.message
        )
    }
}

/// The retriever's result: evidence per question plus any warnings.
#[derive(Debug, Default)]
pub struct RetrievalOutcome {
    pub evidence: BTreeMap<String, Vec<SourceRecord>>,
    pub warnings: Vec<RetrievalWarning>,
}

type SubQueryResults = (
    Result<Vec<VectorHit>, String>,
    Result<Vec<SearchHit>, String>,
);

/// Per-question evidence assembly over the search capabilities.
pub struct EvidenceRetriever {
    web: Arc<dyn WebSearch>,
    vector: Arc<dyn VectorStore>,
    vector_k: usize,
    web_k: usize,
    content_cap: usize,
    concurrency: usize,
}

impl EvidenceRetriever {
    pub fn new(
        web: Arc<dyn WebSearch>,
        vector: Arc<dyn VectorStore>,
        config: &crate::config::EngineConfig,
    ) -> Self {
        Self {
            web,
            vector,
            vector_k: config.vector_k,
            web_k: config.web_k,
            content_cap: config.source_content_cap,
            concurrency: config.retrieval_concurrency,
        }
    }

    /// Retrieve up to `max_sources` records for each question.
    ///
    /// Queries for one question run concurrently with each other and with
    /// other questions' queries, bounded by the configured fanout limit.
    /// Citation registration happens sequentially in question order once the
    /// fanout joins, so citation ids are deterministic for a given result
    /// set. Cancellation returns whatever evidence has been assembled.
    pub async fn retrieve(
        &self,
        questions: &[ResearchQuestion],
        max_sources: usize,
        deadline: Deadline,
        cancel: &CancellationToken,
        registry: &mut CitationRegistry,
    ) -> RetrievalOutcome {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set: JoinSet<(usize, SubQueryResults)> = JoinSet::new();

        for (index, question) in questions.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let web = Arc::clone(&self.web);
            let vector = Arc::clone(&self.vector);
            let text = question.question.clone();
            let vector_k = self.vector_k;
            let web_k = self.web_k;

            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let remaining = deadline.remaining();

                let vector_query = tokio::time::timeout(remaining, vector.search(&text, vector_k));
                let web_query = tokio::time::timeout(remaining, web.search(&text, web_k));
                let (vector_result, web_result) = tokio::join!(vector_query, web_query);

                let vector_hits = match vector_result {
                    Ok(Ok(hits)) => Ok(hits),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err("vector query timed out".to_string()),
                };
                let web_hits = match web_result {
                    Ok(Ok(hits)) => Ok(hits),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err("web query timed out".to_string()),
                };

                (index, (vector_hits, web_hits))
            });
        }

        let mut results: Vec<Option<SubQueryResults>> = (0..questions.len()).map(|_| None).collect();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!("Retrieval cancelled, keeping partial results");
                    join_set.abort_all();
                    break;
                }
                joined = join_set.join_next() => {
                    match joined {
                        Some(Ok((index, result))) => results[index] = Some(result),
                        Some(Err(e)) => warn!(error = %e, "Retrieval task failed"),
                        None => break,
                    }
                }
            }
        }

        let mut outcome = RetrievalOutcome::default();
        for (index, question) in questions.iter().enumerate() {
            let Some((vector_hits, web_hits)) = results[index].take() else {
                continue;
            };
            let records = self.assemble_question(
                question,
                vector_hits,
                web_hits,
                max_sources,
                registry,
                &mut outcome.warnings,
            );
            debug!(question = %question.id, sources = records.len(), "Evidence assembled");
            outcome.evidence.insert(question.id.clone(), records);
        }
        outcome
    }

    /// Feed freshly fetched web content into the vector store so later runs
    /// can hit it semantically. Best-effort; failures are only logged.
    pub async fn seed_store(&self, evidence: &BTreeMap<String, Vec<SourceRecord>>) {
        let mut ids = Vec::new();
        let mut texts = Vec::new();
        let mut metadatas = Vec::new();

        for records in evidence.values() {
            for record in records {
                if record.origin != SourceOrigin::Web || record.content.trim().is_empty() {
                    continue;
                }
                let Some(url) = &record.url else { continue };
                ids.push(url.clone());
                texts.push(record.content.clone());
                metadatas.push(serde_json::json!({
                    "title": record.title,
                    "url": url,
                }));
            }
        }

        if ids.is_empty() {
            return;
        }
        if let Err(e) = self.vector.add_documents(ids, texts, metadatas).await {
            warn!(error = %e, "Seeding the vector store failed");
        }
    }

    fn assemble_question(
        &self,
        question: &ResearchQuestion,
        vector_hits: Result<Vec<VectorHit>, String>,
        web_hits: Result<Vec<SearchHit>, String>,
        max_sources: usize,
        registry: &mut CitationRegistry,
        warnings: &mut Vec<RetrievalWarning>,
    ) -> Vec<SourceRecord> {
        let mut incoming: Vec<SourceRecord> = Vec::new();

        match vector_hits {
            Ok(hits) => {
                for hit in hits {
                    incoming.push(self.vector_record(hit));
                }
            }
            Err(message) => {
                warn!(question = %question.id, %message, "Vector retrieval failed");
                warnings.push(RetrievalWarning {
                    question_id: question.id.clone(),
                    origin: SourceOrigin::Vector,
                    message,
                });
            }
        }

        match web_hits {
            Ok(hits) => {
                for (position, hit) in hits.into_iter().enumerate() {
                    incoming.push(self.web_record(hit, position, registry));
                }
            }
            Err(message) => {
                warn!(question = %question.id, %message, "Web retrieval failed");
                warnings.push(RetrievalWarning {
                    question_id: question.id.clone(),
                    origin: SourceOrigin::Web,
                    message,
                });
            }
        }

        let mut records = dedup(incoming);
        records.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.origin.tie_break_rank().cmp(&b.origin.tie_break_rank()))
        });
        records.truncate(max_sources);
        records
    }

    fn vector_record(&self, hit: VectorHit) -> SourceRecord {
        let title = hit
            .metadata
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or(&hit.id)
            .to_string();
        let url = hit
            .metadata
            .get("url")
            .and_then(|v| v.as_str())
            .map(String::from);
        SourceRecord {
            origin: SourceOrigin::Vector,
            title,
            url,
            content: truncate_chars(&hit.content, self.content_cap),
            snippet: None,
            citation_id: None,
            relevance_score: (1.0 - hit.distance).clamp(0.0, 1.0),
        }
    }

    fn web_record(
        &self,
        hit: SearchHit,
        position: usize,
        registry: &mut CitationRegistry,
    ) -> SourceRecord {
        let citation_id = registry.add_web_source(&hit.title, &hit.url);
        SourceRecord {
            origin: SourceOrigin::Web,
            title: hit.title,
            url: Some(hit.url),
            content: truncate_chars(&hit.content, self.content_cap),
            snippet: Some(hit.snippet),
            citation_id: Some(citation_id),
            relevance_score: rank_weight(position, self.web_k),
        }
    }
}

/// `1 − position / k`, the rank-decay weight for web results.
fn rank_weight(position: usize, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    (1.0 - position as f64 / k as f64).clamp(0.0, 1.0)
}

fn truncate_chars(text: &str, cap: usize) -> String {
    text.chars().take(cap).collect()
}

/// Deduplicate by URL, then by `(title, first 200 chars of content)` across
/// origins. On conflict the higher-scored record wins, in place.
fn dedup(incoming: Vec<SourceRecord>) -> Vec<SourceRecord> {
    let mut records: Vec<SourceRecord> = Vec::new();
    let mut by_url: HashMap<String, usize> = HashMap::new();
    let mut by_content: HashMap<(String, String), usize> = HashMap::new();

    for record in incoming {
        let existing = record
            .url_key()
            .and_then(|key| by_url.get(&key).copied())
            .or_else(|| by_content.get(&record.content_key()).copied());

        match existing {
            Some(index) => {
                if record.relevance_score > records[index].relevance_score {
                    if let Some(key) = record.url_key() {
                        by_url.insert(key, index);
                    }
                    by_content.insert(record.content_key(), index);
                    records[index] = record;
                }
            }
            None => {
                let index = records.len();
                if let Some(key) = record.url_key() {
                    by_url.insert(key, index);
                }
                by_content.insert(record.content_key(), index);
                records.push(record);
            }
        }
    }
    records
}
