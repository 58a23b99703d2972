//! # Orchestrator
//!
//! Wires the ingestion, canonicalization, embedding, retrieval and
//! resilience crates into the two operations the rest of a deployment
//! actually calls:
//!
//! - [`dag::run_enrichment`]: the Enrichment DAG — chunk, embed,
//!   summarize, extract keywords/tags/propositions for one ingested
//!   Document, writing results back into the `ingest` store, the
//!   `index` retrieval store, and the local [`tags::TagRegistry`].
//! - [`query::QueryOrchestrator`]: `search`/`enhance_prompt` — fans the
//!   three retrieval channels out concurrently and fuses them with RRF.
//!
//! Both share one [`dag::EnrichmentContext`]: the document store, the
//! retrieval store, the tag registry, a [`resilience::CircuitBreakerRegistry`]
//! keyed per external collaborator, and the collaborators themselves
//! (§6) — trait objects, with deterministic `Null*` stand-ins in
//! [`collaborators`] good enough to exercise the whole pipeline without
//! a network call.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ingest::{AddDocumentRequest, DocumentStore};
//! use index::InMemoryStore;
//! use embedding::EmbeddingConfig;
//! use resilience::{CircuitBreakerConfig, CircuitBreakerRegistry};
//! use orchestrator::collaborators::{
//!     NullKeywordExtractor, NullPropositionExtractor, NullSummarizer, NullTagExtractor,
//! };
//! use orchestrator::dag::{run_enrichment, EnrichmentContext};
//! use orchestrator::query::{QueryOrchestrator, SearchRequest};
//! use orchestrator::tags::TagRegistry;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let documents = Arc::new(DocumentStore::new());
//! let chunks = Arc::new(InMemoryStore::new());
//! let ctx = Arc::new(EnrichmentContext {
//!     documents: documents.clone(),
//!     chunks: chunks.clone(),
//!     tags: Arc::new(TagRegistry::new()),
//!     breakers: Arc::new(CircuitBreakerRegistry::new(CircuitBreakerConfig::default())),
//!     embedding_cfg: EmbeddingConfig::default(),
//!     embedder: None,
//!     summarizer: Arc::new(NullSummarizer),
//!     keyword_extractor: Arc::new(NullKeywordExtractor),
//!     tag_extractor: Arc::new(NullTagExtractor),
//!     proposition_extractor: Arc::new(NullPropositionExtractor),
//! });
//!
//! let id = documents
//!     .add_document(AddDocumentRequest::new("/doc.txt", "Postgres replication uses the write-ahead log."))
//!     .unwrap();
//! let report = run_enrichment(ctx.clone(), id).await;
//! assert!(report.embeddings_count > 0);
//!
//! let orchestrator = QueryOrchestrator::new(ctx, chunks);
//! let results = orchestrator
//!     .search(SearchRequest { query: "write-ahead log".into(), ..Default::default() })
//!     .await
//!     .unwrap();
//! assert!(!results.results.is_empty());
//! # }
//! ```

pub mod collaborators;
pub mod dag;
pub mod error;
pub mod query;
pub mod tags;

pub use crate::dag::{run_enrichment, EnrichmentContext, EnrichmentReport};
pub use crate::error::{EnrichError, RetrievalError};
pub use crate::query::{EnhancedPrompt, QueryOrchestrator, SearchRequest, SearchResponse};
pub use crate::tags::{TagRecord, TagRegistry, TagSource};
