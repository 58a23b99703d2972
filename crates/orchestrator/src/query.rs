//! Query Orchestrator (§4.11): clamps limits, parses the timeframe,
//! fans the three retrieval channels out concurrently, fuses with RRF,
//! and `enhance_prompt`'s prompt-stuffing on top of `search`.

use std::sync::Arc;
use std::time::Instant;

use index::{
    clamp_limit, expand_candidate_limit, fulltext_channel, fuse, tag_channel, vector_channel, Filters,
    InMemoryStore, MergedHit, SearchLog, SearchRecordMeta, SearchType,
};
use textmeta::{parse_timeframe, TimeframeInput};

use crate::error::RetrievalError;
use crate::EnrichmentContext;

/// Parameters accepted by [`QueryOrchestrator::search`], mirroring §6's
/// `search(query, {limit?, filters?, tags?, timeframe?, candidate_limit?,
/// session_id?, user_id?, track_search?})`.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub limit: Option<usize>,
    pub candidate_limit: Option<usize>,
    pub timeframe: TimeframeInput,
    pub tags: Vec<String>,
    pub filters: Filters,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    /// §6 `track_search?`: when `true` (the default) a finished search is
    /// recorded fire-and-forget into the attached [`SearchLog`] (§5 "Search
    /// tracking... must not fail the search", §9).
    pub track_search: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            limit: None,
            candidate_limit: None,
            timeframe: TimeframeInput::default(),
            tags: Vec::new(),
            filters: Filters::default(),
            session_id: None,
            user_id: None,
            track_search: true,
        }
    }
}

/// `{results, execution_time_ms}` per §6; `statistics` is left to the
/// caller (out of scope here — no metrics exporter in this crate).
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub results: Vec<MergedHit>,
    pub execution_time_ms: u64,
}

/// `{enhanced_prompt, context_sources}` per §6.
#[derive(Debug, Clone)]
pub struct EnhancedPrompt {
    pub enhanced_prompt: String,
    pub context_sources: Vec<String>,
}

/// Runs `search`/`enhance_prompt` against a shared [`InMemoryStore`] and
/// the embedding collaborator in [`EnrichmentContext`]. `search_log` is
/// `None` when no caller wants `Search`/`SearchResult` history at all;
/// `Some` still respects each request's `track_search` flag.
pub struct QueryOrchestrator {
    pub ctx: Arc<EnrichmentContext>,
    pub chunks: Arc<InMemoryStore>,
    pub search_log: Option<Arc<SearchLog>>,
}

impl QueryOrchestrator {
    pub fn new(ctx: Arc<EnrichmentContext>, chunks: Arc<InMemoryStore>) -> Self {
        Self { ctx, chunks, search_log: None }
    }

    pub fn with_search_log(mut self, search_log: Arc<SearchLog>) -> Self {
        self.search_log = Some(search_log);
        self
    }

    pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse, RetrievalError> {
        let started = Instant::now();

        let limit = clamp_limit(req.limit.unwrap_or(index::DEFAULT_CANDIDATE_LIMIT));
        let candidate_limit = expand_candidate_limit(req.candidate_limit);

        let parsed = parse_timeframe(req.timeframe, chrono::Utc::now())?;
        let cleaned_query = parsed.cleaned_query.unwrap_or_else(|| req.query.clone());
        let time_range = parsed.ranges.first().map(|r| (r.start, r.end));

        let breaker = self.ctx.breakers.get_or_create(embedding::SERVICE_NAME);
        let query_embedding = embedding::embed_guarded(
            &cleaned_query,
            &self.ctx.embedding_cfg,
            self.ctx.embedder.as_deref(),
            Some(&breaker),
        )
        .await?;

        // §4.11: null embedding, empty query string, no tags -> empty list.
        if query_embedding.is_none() && cleaned_query.trim().is_empty() && req.tags.is_empty() {
            return Ok(SearchResponse {
                results: Vec::new(),
                execution_time_ms: started.elapsed().as_millis() as u64,
            });
        }

        let query_vector = query_embedding.as_ref().map(|e| e.vector.as_slice());

        let (vector_hits, fulltext_hits, tag_hits) = tokio::join!(
            vector_channel(self.chunks.as_ref(), query_vector, &req.filters, time_range, candidate_limit),
            fulltext_channel(self.chunks.as_ref(), &cleaned_query, &req.filters, time_range, candidate_limit),
            tag_channel(self.chunks.as_ref(), &req.tags, &req.filters, time_range, candidate_limit),
        );

        let channels: Vec<(&'static str, Vec<index::ChannelHit>)> =
            vec![("vector", vector_hits), ("fulltext", fulltext_hits), ("tag", tag_hits)];

        let results = fuse(&channels, limit);
        let execution_time_ms = started.elapsed().as_millis() as u64;

        // §5: fire-and-forget. Tracking failures must never fail the
        // search itself, and this store is infallible (search_log.rs), so
        // spawning it is purely to keep the write off the caller's path.
        if req.track_search {
            if let Some(search_log) = self.search_log.clone() {
                let query = cleaned_query.clone();
                let results = results.clone();
                let search_type = if query_embedding.is_some() && !req.tags.is_empty() {
                    SearchType::Hybrid
                } else if query_embedding.is_some() {
                    SearchType::Semantic
                } else {
                    SearchType::Fulltext
                };
                let meta = SearchRecordMeta {
                    search_type: Some(search_type),
                    execution_time_ms,
                    filters: serde_json::json!({
                        "document_type": req.filters.document_type,
                        "keywords": req.filters.keywords,
                    }),
                    options: serde_json::json!({ "candidate_limit": candidate_limit, "limit": limit }),
                    session_id: req.session_id.clone(),
                    user_id: req.user_id.clone(),
                };
                tokio::spawn(async move {
                    search_log.record(&query, &results, meta);
                });
            }
        }

        Ok(SearchResponse { results, execution_time_ms })
    }

    pub async fn enhance_prompt(&self, prompt: &str, context_limit: Option<usize>) -> Result<EnhancedPrompt, RetrievalError> {
        let limit = context_limit.unwrap_or(5);
        let response = self
            .search(SearchRequest {
                query: prompt.to_string(),
                limit: Some(limit),
                ..Default::default()
            })
            .await?;

        let context_sources: Vec<String> = response.results.iter().map(|hit| hit.id.clone()).collect();
        let context_text: String = response
            .results
            .iter()
            .map(|hit| hit.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let enhanced_prompt = if context_text.is_empty() {
            prompt.to_string()
        } else {
            format!("{prompt}\n\nContext:\n{context_text}")
        };

        Ok(EnhancedPrompt { enhanced_prompt, context_sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{NullKeywordExtractor, NullPropositionExtractor, NullSummarizer, NullTagExtractor};
    use crate::tags::TagRegistry;
    use embedding::EmbeddingConfig;
    use index::ChunkRecord;
    use ingest::{AddDocumentRequest, DocumentStore, DocumentType};
    use resilience::{CircuitBreakerConfig, CircuitBreakerRegistry};

    fn make_orchestrator() -> QueryOrchestrator {
        let chunks = Arc::new(InMemoryStore::new());
        let ctx = Arc::new(EnrichmentContext {
            documents: Arc::new(DocumentStore::new()),
            chunks: chunks.clone(),
            tags: Arc::new(TagRegistry::new()),
            breakers: Arc::new(CircuitBreakerRegistry::new(CircuitBreakerConfig::default())),
            embedding_cfg: EmbeddingConfig::default(),
            embedder: None,
            summarizer: Arc::new(NullSummarizer),
            keyword_extractor: Arc::new(NullKeywordExtractor),
            tag_extractor: Arc::new(NullTagExtractor),
            proposition_extractor: Arc::new(NullPropositionExtractor),
        });
        QueryOrchestrator::new(ctx, chunks)
    }

    #[tokio::test]
    async fn empty_query_with_no_tags_returns_empty() {
        let orchestrator = make_orchestrator();
        let response = orchestrator
            .search(SearchRequest { query: String::new(), ..Default::default() })
            .await
            .unwrap();
        assert!(response.results.is_empty());
    }

    #[tokio::test]
    async fn search_finds_inserted_chunk_by_text() {
        let orchestrator = make_orchestrator();
        orchestrator.chunks.insert(ChunkRecord {
            id: "doc-1:0".to_string(),
            document_id: "doc-1".to_string(),
            chunk_index: 0,
            text: "postgres replication uses the write-ahead log".to_string(),
            embedding: None,
            tags: Vec::new(),
            document_type: DocumentType::Text,
            keywords: Vec::new(),
            created_at: chrono::Utc::now(),
        });

        let response = orchestrator
            .search(SearchRequest { query: "postgres replication".to_string(), ..Default::default() })
            .await
            .unwrap();

        assert!(response.results.iter().any(|hit| hit.id == "doc-1:0"));
    }

    #[tokio::test]
    async fn enhance_prompt_appends_context() {
        let orchestrator = make_orchestrator();
        orchestrator.chunks.insert(ChunkRecord {
            id: "doc-1:0".to_string(),
            document_id: "doc-1".to_string(),
            chunk_index: 0,
            text: "btree indexes speed up lookups".to_string(),
            embedding: None,
            tags: Vec::new(),
            document_type: DocumentType::Text,
            keywords: Vec::new(),
            created_at: chrono::Utc::now(),
        });

        let result = orchestrator.enhance_prompt("how do indexes work", None).await.unwrap();
        assert!(result.enhanced_prompt.contains("indexes"));
    }
}
