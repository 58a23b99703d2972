//! Umbrella crate for the hybrid RAG indexing & retrieval engine.
//!
//! This crate wires `ingest`, `canonical`, `embedding`, `resilience`,
//! `textmeta`, `index`, and `orchestrator` into one [`Engine`]:
//! [`Engine::add_document`] runs the dedup engine (§4.4) and the
//! Enrichment DAG (§4.5) for one document; [`Engine::search`] and
//! [`Engine::enhance_prompt`] run the Query Orchestrator (§4.11). Every
//! crate above stays independently usable — this one only adds the
//! construction glue, config loading, and process-wide observability
//! hooks an integrator would otherwise have to write by hand.
//!
//! ## Quick start
//!
//! ```
//! use rag_engine::{AddDocumentRequest, Engine, EngineConfig, SearchRequest};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let engine = Engine::new(EngineConfig::default());
//!
//! let (id, report) = engine
//!     .add_document(AddDocumentRequest::new(
//!         "/notes/postgres.md",
//!         "Postgres replication streams the write-ahead log to standbys \
//!          for durability. Btree indexes speed up point lookups.",
//!     ))
//!     .await
//!     .unwrap();
//! assert!(report.embeddings_count > 0);
//!
//! let results = engine
//!     .search(SearchRequest { query: "write-ahead log".into(), ..Default::default() })
//!     .await
//!     .unwrap();
//! assert!(results.results.iter().any(|hit| hit.id.starts_with(&id)));
//! # }
//! ```
//!
//! ## Observability
//!
//! Every call to [`Engine::add_document`] and [`Engine::search`] emits a
//! [`PipelineEvent`] through `tracing` and, if one is installed, through
//! a [`PipelineMetrics`] recorder ([`set_pipeline_metrics`]). This plays
//! the role of the Observability surface (§6) without depending on any
//! particular metrics backend.
//!
//! ## Errors
//!
//! [`EngineError`] aggregates the per-crate error types ([`IngestError`],
//! [`RetrievalError`]) so callers can handle engine-level failures
//! without depending on every workspace crate directly.

pub use canonical::{chunks, chunks_default, Chunk, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
pub use embedding::{Embedder, Embedding, EmbeddingConfig, EmbeddingError};
pub use index::{ChannelHit, ChunkRecord, Filters, InMemoryStore, MergedHit, Search, SearchLog, SearchResult, SearchType};
pub use ingest::{
    AddDocumentRequest, Content, Document, DocumentPatch, DocumentStatus, DocumentStore,
    DocumentType, DocumentView, IngestError,
};
pub use orchestrator::collaborators::{
    KeywordExtractor, NullKeywordExtractor, NullPropositionExtractor, NullSummarizer,
    NullTagExtractor, PropositionExtractor, Summarizer, TagExtractor,
};
pub use orchestrator::{
    EnhancedPrompt, EnrichError, EnrichmentContext, EnrichmentReport, QueryOrchestrator,
    RetrievalError, SearchRequest, SearchResponse, TagRegistry,
};
pub use resilience::{BreakerStats, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry};
pub use textmeta::{normalize_tag, normalize_tags, parse_timeframe, TimeframeInput};

pub mod config;

pub use config::EngineConfig;

use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

/// Errors surfaced by [`Engine`]'s top-level operations, aggregating
/// every wired crate's own error type (§7).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

/// Processing stage captured in observability events (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Ingest,
    Enrich,
    Search,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Ingest => "ingest",
            PipelineStage::Enrich => "enrich",
            PipelineStage::Search => "search",
        };
        f.write_str(name)
    }
}

/// Outcome of a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEventStatus {
    Success,
    Failure,
}

/// Structured observation describing the outcome of a pipeline stage,
/// handed to both the installed [`PipelineMetrics`] recorder and a
/// `tracing` event.
#[derive(Debug, Clone)]
pub struct PipelineEvent {
    pub stage: PipelineStage,
    pub status: PipelineEventStatus,
    pub latency: Duration,
    pub document_id: Option<String>,
    pub error: Option<String>,
}

/// Metrics observer for pipeline stages. Install one with
/// [`set_pipeline_metrics`] to export latencies/outcomes to a metrics
/// backend of the integrator's choice.
pub trait PipelineMetrics: Send + Sync {
    fn record(&self, event: &PipelineEvent);
}

static PIPELINE_METRICS: OnceLock<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceLock::new();

/// Install a process-wide [`PipelineMetrics`] recorder. Replaces any
/// previously installed recorder.
pub fn set_pipeline_metrics(metrics: Arc<dyn PipelineMetrics>) {
    let slot = PIPELINE_METRICS.get_or_init(|| RwLock::new(None));
    *slot.write().unwrap() = Some(metrics);
}

fn emit(event: PipelineEvent) {
    if let Some(slot) = PIPELINE_METRICS.get() {
        if let Some(metrics) = slot.read().unwrap().as_ref() {
            metrics.record(&event);
        }
    }
    match event.status {
        PipelineEventStatus::Success => tracing::info!(
            stage = %event.stage,
            latency_ms = event.latency.as_millis() as u64,
            document_id = ?event.document_id,
            "pipeline stage complete"
        ),
        PipelineEventStatus::Failure => tracing::warn!(
            stage = %event.stage,
            latency_ms = event.latency.as_millis() as u64,
            document_id = ?event.document_id,
            error = ?event.error,
            "pipeline stage failed"
        ),
    }
}

/// The wired-up engine: one [`DocumentStore`], one [`InMemoryStore`]
/// shared by the Enrichment DAG and the Query Orchestrator through a
/// single [`EnrichmentContext`], and a [`CircuitBreakerRegistry`]
/// guarding every external-model call the DAG and the query path make.
///
/// Built via [`Engine::new`] (deterministic stand-ins for every
/// collaborator) or [`Engine::with_collaborators`] (constructor
/// injection of real `Summarizer`/`KeywordExtractor`/`TagExtractor`/
/// `PropositionExtractor`/`Embedder` implementations — Design Note §9
/// prefers this over a global registry).
pub struct Engine {
    documents: Arc<DocumentStore>,
    ctx: Arc<EnrichmentContext>,
    query: QueryOrchestrator,
    search_log: Arc<SearchLog>,
}

impl Engine {
    /// Build an engine wired entirely with deterministic stand-ins.
    /// Every enrichment step still runs for real except the
    /// external-model calls, which fall back to the deterministic
    /// embedding generator and no-op summarizer/extractors.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_collaborators(
            config,
            None,
            Arc::new(NullSummarizer),
            Arc::new(NullKeywordExtractor),
            Arc::new(NullTagExtractor),
            Arc::new(NullPropositionExtractor),
        )
    }

    /// Build an engine with explicit collaborators, e.g. a real
    /// [`Embedder`] backed by a model server.
    pub fn with_collaborators(
        config: EngineConfig,
        embedder: Option<Arc<dyn Embedder>>,
        summarizer: Arc<dyn Summarizer>,
        keyword_extractor: Arc<dyn KeywordExtractor>,
        tag_extractor: Arc<dyn TagExtractor>,
        proposition_extractor: Arc<dyn PropositionExtractor>,
    ) -> Self {
        let documents = Arc::new(DocumentStore::new());
        let chunks = Arc::new(InMemoryStore::new());
        let ctx = Arc::new(EnrichmentContext {
            documents: documents.clone(),
            chunks: chunks.clone(),
            tags: Arc::new(TagRegistry::new()),
            breakers: Arc::new(CircuitBreakerRegistry::new(config.circuit_breaker)),
            embedding_cfg: config.embedding,
            embedder,
            summarizer,
            keyword_extractor,
            tag_extractor,
            proposition_extractor,
        });
        let search_log = Arc::new(SearchLog::new());
        let query = QueryOrchestrator::new(ctx.clone(), chunks).with_search_log(search_log.clone());
        Self { documents, ctx, query, search_log }
    }

    /// The in-process `Search`/`SearchResult` history (§3, §4.11 step 6)
    /// every tracked `search()` call writes to fire-and-forget.
    pub fn search_log(&self) -> &Arc<SearchLog> {
        &self.search_log
    }

    /// Ingest `request` (running the dedup engine, §4.4) then run the
    /// Enrichment DAG (§4.5) for the resulting document. Always returns
    /// the document id, even on a duplicate or a partially-failed
    /// enrichment run — per-step failures land in the returned
    /// [`EnrichmentReport::errors`] rather than as an `Err` (§7).
    pub async fn add_document(
        &self,
        request: AddDocumentRequest,
    ) -> Result<(String, EnrichmentReport), EngineError> {
        let started = Instant::now();
        let id = self.documents.add_document(request)?;
        let report = orchestrator::run_enrichment(self.ctx.clone(), id.clone()).await;

        let status = if report.errors.is_empty() {
            PipelineEventStatus::Success
        } else {
            PipelineEventStatus::Failure
        };
        emit(PipelineEvent {
            stage: PipelineStage::Enrich,
            status,
            latency: started.elapsed(),
            document_id: Some(id.clone()),
            error: report.errors.values().next().cloned(),
        });

        Ok((id, report))
    }

    pub fn get_document(&self, id: &str) -> Option<DocumentView> {
        self.documents.get_document(id)
    }

    /// Ordered by insertion (oldest first), per §6 `list_documents`.
    pub fn list_documents(&self, limit: Option<usize>, offset: Option<usize>) -> Vec<Document> {
        self.documents.list_documents(limit, offset)
    }

    pub fn delete_document(&self, id: &str) -> bool {
        self.documents.delete_document(id)
    }

    /// Run the Query Orchestrator's `search` (§4.11): clamp limits,
    /// parse the timeframe, fan the three retrieval channels out
    /// concurrently, and fuse with RRF (§4.10).
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, EngineError> {
        let started = Instant::now();
        let result = self.query.search(request).await;

        emit(PipelineEvent {
            stage: PipelineStage::Search,
            status: if result.is_ok() { PipelineEventStatus::Success } else { PipelineEventStatus::Failure },
            latency: started.elapsed(),
            document_id: None,
            error: result.as_ref().err().map(ToString::to_string),
        });

        Ok(result?)
    }

    /// `search`, then stuff the top results into `prompt` (§6).
    pub async fn enhance_prompt(
        &self,
        prompt: &str,
        context_limit: Option<usize>,
    ) -> Result<EnhancedPrompt, EngineError> {
        Ok(self.query.enhance_prompt(prompt, context_limit).await?)
    }
}
