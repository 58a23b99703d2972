//! Cross-crate integration tests for the wired-up [`Engine`]. Each
//! crate's own invariants are covered by its unit tests; these exercise
//! behavior that only exists once ingest, enrichment, and retrieval are
//! wired together.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rag_engine::{
    AddDocumentRequest, Embedder, EmbeddingError, Engine, EngineConfig, NullKeywordExtractor,
    NullPropositionExtractor, NullSummarizer, NullTagExtractor, SearchRequest,
};

#[tokio::test]
async fn ingest_enrich_search_round_trip_across_crates() {
    let engine = Engine::new(EngineConfig::default());

    let (postgres_id, postgres_report) = engine
        .add_document(AddDocumentRequest::new(
            "/notes/postgres.md",
            "Postgres replication streams the write-ahead log to standby servers \
             for durability guarantees. Btree indexes speed up point lookups and \
             range scans across large tables."
                .repeat(3),
        ))
        .await
        .unwrap();
    assert!(postgres_report.embeddings_count > 0);

    let (_redis_id, redis_report) = engine
        .add_document(AddDocumentRequest::new(
            "/notes/redis.md",
            "Redis keeps the working set in memory and persists it with an \
             append-only file for durability between restarts."
                .repeat(3),
        ))
        .await
        .unwrap();
    assert!(redis_report.embeddings_count > 0);

    let response = engine
        .search(SearchRequest { query: "write-ahead log durability".into(), ..Default::default() })
        .await
        .unwrap();

    assert!(!response.results.is_empty());
    assert!(response.results[0].id.starts_with(&postgres_id));
}

#[tokio::test]
async fn dedup_spans_ingest_and_enrichment() {
    let engine = Engine::new(EngineConfig::default());

    let (id1, _) = engine
        .add_document(AddDocumentRequest::new("/a/b.txt", "foo"))
        .await
        .unwrap();
    let (id2, _) = engine
        .add_document(AddDocumentRequest::new("/a/b.txt", "foo different"))
        .await
        .unwrap();

    assert_eq!(id1, id2);
    let view = engine.get_document(&id1).unwrap();
    assert_eq!(view.content.unwrap().content, "foo");
}

#[tokio::test]
async fn empty_content_leaves_document_in_error_status_with_no_search_hits() {
    let engine = Engine::new(EngineConfig::default());

    let (id, report) = engine
        .add_document(AddDocumentRequest::new("/empty.txt", "   "))
        .await
        .unwrap();
    assert!(report.errors.contains_key("generate_embeddings"));

    let view = engine.get_document(&id).unwrap();
    assert_eq!(view.document.status, rag_engine::DocumentStatus::Error);

    let response = engine
        .search(SearchRequest { query: "anything".into(), ..Default::default() })
        .await
        .unwrap();
    assert!(response.results.iter().all(|hit| !hit.id.starts_with(&id)));
}

/// An `Embedder` that always fails, to exercise the circuit breaker
/// across the embedding client and the enrichment DAG together: after
/// enough failed calls the breaker should open and every further
/// `add_document` should fall back to the deterministic embedding
/// instead of propagating an error.
struct AlwaysFailingEmbedder(AtomicUsize);

#[async_trait]
impl Embedder for AlwaysFailingEmbedder {
    async fn embed_raw(&self, _cleaned_text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Err(EmbeddingError::ProviderCall("simulated outage".into()))
    }

    fn current_model(&self) -> &str {
        "always-failing"
    }

    fn dimensions(&self) -> usize {
        384
    }
}

#[tokio::test]
async fn breaker_opens_and_enrichment_falls_back_to_deterministic_embedding() {
    let embedder: Arc<dyn Embedder> = Arc::new(AlwaysFailingEmbedder(AtomicUsize::new(0)));

    let engine = Engine::with_collaborators(
        EngineConfig::default(),
        Some(embedder),
        Arc::new(NullSummarizer),
        Arc::new(NullKeywordExtractor),
        Arc::new(NullTagExtractor),
        Arc::new(NullPropositionExtractor),
    );

    // Each document is one chunk; five documents exceed the default
    // failure_threshold of 5, so by the last one the breaker should
    // already be open and the call should never reach the embedder.
    let mut last_report = None;
    for i in 0..6 {
        let (_id, report) = engine
            .add_document(AddDocumentRequest::new(
                format!("/doc-{i}.txt"),
                format!("document number {i} has enough content to form one chunk of text"),
            ))
            .await
            .unwrap();
        last_report = Some(report);
    }

    let report = last_report.unwrap();
    // Fallback succeeds even though the real embedder is failing.
    assert!(report.embeddings_count > 0);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn enhance_prompt_draws_context_from_multiple_ingested_documents() {
    let engine = Engine::new(EngineConfig::default());
    engine
        .add_document(AddDocumentRequest::new(
            "/notes/indexes.md",
            "Btree indexes speed up point lookups and range scans.".repeat(3),
        ))
        .await
        .unwrap();
    engine
        .add_document(AddDocumentRequest::new(
            "/notes/vacuum.md",
            "Autovacuum reclaims space from dead tuples after updates and deletes.".repeat(3),
        ))
        .await
        .unwrap();

    let result = engine.enhance_prompt("tell me about indexes", Some(5)).await.unwrap();
    assert!(result.enhanced_prompt.contains("indexes"));
    assert!(!result.context_sources.is_empty());
}
