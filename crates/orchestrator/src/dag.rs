//! Enrichment DAG (§4.5): four parallelizable roots
//! (`generate_embeddings`, `generate_summary`, `extract_keywords`,
//! `extract_tags`) plus `extract_propositions` (depends on
//! `generate_embeddings`) and `finalize` (depends on all five). Each
//! step is its own `tokio::task`; a failing step never aborts its
//! siblings — its error lands in `EnrichmentReport.errors` instead.

use std::collections::HashMap;
use std::sync::Arc;

use canonical::chunk::chunks_default;
use embedding::{Embedder, EmbeddingConfig};
use ingest::{DocumentPatch, DocumentStatus, DocumentStore};
use index::{ChunkRecord, InMemoryStore, RetrievalStore};
use resilience::CircuitBreakerRegistry;
use textmeta::{normalize_tags, parse_propositions, PropositionInput};

use crate::collaborators::{KeywordExtractor, PropositionExtractor, Summarizer, TagExtractor};
use crate::tags::{TagRegistry, TagSource};

/// Content length above which `generate_summary` actually calls the
/// summarizer (§4.5).
pub const SUMMARY_MIN_LENGTH: usize = 300;

/// Shared collaborators and stores the DAG steps run against. One
/// context is typically shared across every document's enrichment run.
pub struct EnrichmentContext {
    pub documents: Arc<DocumentStore>,
    pub chunks: Arc<InMemoryStore>,
    pub tags: Arc<TagRegistry>,
    pub breakers: Arc<CircuitBreakerRegistry>,
    pub embedding_cfg: EmbeddingConfig,
    pub embedder: Option<Arc<dyn Embedder>>,
    pub summarizer: Arc<dyn Summarizer>,
    pub keyword_extractor: Arc<dyn KeywordExtractor>,
    pub tag_extractor: Arc<dyn TagExtractor>,
    pub proposition_extractor: Arc<dyn PropositionExtractor>,
}

/// Outcome of one full enrichment run, the `map<StepName, ErrorString>`
/// design note (§9) plus the facts `finalize` needs.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentReport {
    pub errors: HashMap<String, String>,
    pub embeddings_count: usize,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub tags: Vec<String>,
    pub propositions: Vec<String>,
    pub status: Option<DocumentStatus>,
}

/// Run the full DAG for `document_id` against `ctx` and return the
/// resulting report. Never returns an `Err` itself — every failure is
/// recorded per-step in `errors` (§4.5, §7).
pub async fn run_enrichment(ctx: Arc<EnrichmentContext>, document_id: String) -> EnrichmentReport {
    let _ = ctx
        .documents
        .update_document(
            &document_id,
            DocumentPatch {
                status: Some(DocumentStatus::Processing),
                ..Default::default()
            },
        );

    let embeddings_ctx = ctx.clone();
    let embeddings_doc = document_id.clone();
    let embeddings_handle =
        tokio::spawn(async move { step_generate_embeddings(&embeddings_ctx, &embeddings_doc).await });

    let summary_ctx = ctx.clone();
    let summary_doc = document_id.clone();
    let summary_handle = tokio::spawn(async move { step_generate_summary(&summary_ctx, &summary_doc).await });

    let keywords_ctx = ctx.clone();
    let keywords_doc = document_id.clone();
    let keywords_handle = tokio::spawn(async move { step_extract_keywords(&keywords_ctx, &keywords_doc).await });

    let tags_ctx = ctx.clone();
    let tags_doc = document_id.clone();
    let tags_handle = tokio::spawn(async move { step_extract_tags(&tags_ctx, &tags_doc).await });

    // extract_propositions depends on generate_embeddings: it owns that
    // task's JoinHandle and awaits it internally before doing any work,
    // while itself still running as an independent task (§4.5, §5).
    let propositions_ctx = ctx.clone();
    let propositions_doc = document_id.clone();
    let propositions_handle = tokio::spawn(async move {
        let embeddings_outcome = match embeddings_handle.await {
            Ok(outcome) => outcome,
            Err(join_err) => Err(format!("task panicked: {join_err}")),
        };
        let propositions_outcome = match &embeddings_outcome {
            Ok(_) => step_extract_propositions(&propositions_ctx, &propositions_doc).await,
            Err(_) => Err("skipped: generate_embeddings failed".to_string()),
        };
        (embeddings_outcome, propositions_outcome)
    });

    let (embeddings_outcome, propositions_outcome) = propositions_handle
        .await
        .unwrap_or_else(|join_err| (Err(format!("task panicked: {join_err}")), Err("skipped".to_string())));
    let summary_outcome = summary_handle.await.unwrap_or_else(|e| Err(format!("task panicked: {e}")));
    let keywords_outcome = keywords_handle.await.unwrap_or_else(|e| Err(format!("task panicked: {e}")));
    let tags_outcome = tags_handle.await.unwrap_or_else(|e| Err(format!("task panicked: {e}")));

    finalize(
        ctx,
        document_id,
        embeddings_outcome,
        summary_outcome,
        keywords_outcome,
        tags_outcome,
        propositions_outcome,
    )
    .await
}

async fn step_generate_embeddings(ctx: &EnrichmentContext, document_id: &str) -> Result<usize, String> {
    let view = ctx
        .documents
        .get_document(document_id)
        .ok_or_else(|| "document not found".to_string())?;
    let content = view.content.ok_or_else(|| "document has no content".to_string())?;

    let breaker = ctx.breakers.get_or_create(embedding::SERVICE_NAME);
    let chunks = chunks_default(&content.content);

    let mut count = 0usize;
    for chunk in chunks {
        let embedded = embedding::embed_guarded(
            &chunk.text,
            &ctx.embedding_cfg,
            ctx.embedder.as_deref(),
            Some(&breaker),
        )
        .await
        .map_err(|e| e.to_string())?;

        if let Some(embedding) = embedded {
            ctx.chunks.insert(ChunkRecord {
                id: format!("{document_id}:{}", chunk.index),
                document_id: document_id.to_string(),
                chunk_index: chunk.index,
                text: chunk.text,
                embedding: Some(embedding.vector),
                tags: Vec::new(),
                document_type: view.document.document_type,
                keywords: Vec::new(),
                created_at: view.document.created_at,
            });
            count += 1;
        }
    }

    Ok(count)
}

async fn step_generate_summary(ctx: &EnrichmentContext, document_id: &str) -> Result<Option<String>, String> {
    let view = ctx
        .documents
        .get_document(document_id)
        .ok_or_else(|| "document not found".to_string())?;
    let content = view.content.ok_or_else(|| "document has no content".to_string())?;

    if content.content.len() <= SUMMARY_MIN_LENGTH {
        return Ok(None);
    }

    let breaker = ctx.breakers.get_or_create("summarization");
    if !breaker.allow_request() {
        return Err("breaker open".to_string());
    }

    match ctx.summarizer.summarize(&content.content).await {
        Ok(Some(summary)) if !summary.trim().is_empty() => {
            breaker.record_success();
            let mut metadata = std::collections::HashMap::new();
            metadata.insert("summary".to_string(), serde_json::Value::String(summary.clone()));
            let _ = ctx.documents.update_document(
                document_id,
                DocumentPatch {
                    metadata: Some(metadata),
                    ..Default::default()
                },
            );
            Ok(Some(summary))
        }
        Ok(_) => {
            breaker.record_success();
            Ok(None)
        }
        Err(e) => {
            breaker.record_failure();
            Err(e.to_string())
        }
    }
}

async fn step_extract_keywords(ctx: &EnrichmentContext, document_id: &str) -> Result<Vec<String>, String> {
    let view = ctx
        .documents
        .get_document(document_id)
        .ok_or_else(|| "document not found".to_string())?;
    let content = view.content.ok_or_else(|| "document has no content".to_string())?;

    let breaker = ctx.breakers.get_or_create("keyword_extraction");
    if !breaker.allow_request() {
        return Err("breaker open".to_string());
    }

    match ctx.keyword_extractor.keywords(&content.content).await {
        Ok(keywords) if !keywords.is_empty() => {
            breaker.record_success();
            let mut metadata = std::collections::HashMap::new();
            metadata.insert(
                "keywords".to_string(),
                serde_json::Value::Array(keywords.iter().cloned().map(serde_json::Value::String).collect()),
            );
            let _ = ctx.documents.update_document(
                document_id,
                DocumentPatch {
                    metadata: Some(metadata),
                    ..Default::default()
                },
            );
            Ok(keywords)
        }
        Ok(_) => {
            breaker.record_success();
            Ok(Vec::new())
        }
        Err(e) => {
            breaker.record_failure();
            Err(e.to_string())
        }
    }
}

async fn step_extract_tags(ctx: &EnrichmentContext, document_id: &str) -> Result<Vec<String>, String> {
    let view = ctx
        .documents
        .get_document(document_id)
        .ok_or_else(|| "document not found".to_string())?;
    let content = view.content.ok_or_else(|| "document has no content".to_string())?;

    let breaker = ctx.breakers.get_or_create("tag_extraction");
    if !breaker.allow_request() {
        return Err("breaker open".to_string());
    }

    let raw_tags = match ctx.tag_extractor.raw_tags(&content.content, &[]).await {
        Ok(tags) => {
            breaker.record_success();
            tags
        }
        Err(e) => {
            breaker.record_failure();
            return Err(e.to_string());
        }
    };

    let normalized = normalize_tags(raw_tags);
    for tag in &normalized {
        let leaf = ctx.tags.find_or_create_with_hierarchy(tag);
        ctx.tags.associate(document_id, &leaf, 1.0, TagSource::Auto);
    }
    Ok(normalized)
}

async fn step_extract_propositions(ctx: &EnrichmentContext, document_id: &str) -> Result<Vec<String>, String> {
    let chunks: Vec<ChunkRecord> = ctx
        .chunks
        .all_chunks()
        .await
        .into_iter()
        .filter(|c| c.document_id == document_id && c.embedding.is_some())
        .collect();

    let breaker = ctx.breakers.get_or_create("proposition_extraction");
    let mut all_propositions = Vec::new();

    for chunk in chunks {
        if !breaker.allow_request() {
            return Err("breaker open".to_string());
        }
        match ctx.proposition_extractor.raw(&chunk.text).await {
            Ok(raw) => {
                breaker.record_success();
                let parsed = parse_propositions(PropositionInput::Lines(raw));
                all_propositions.extend(parsed);
            }
            Err(e) => {
                breaker.record_failure();
                return Err(e.to_string());
            }
        }
    }

    Ok(all_propositions)
}

#[allow(clippy::too_many_arguments)]
async fn finalize(
    ctx: Arc<EnrichmentContext>,
    document_id: String,
    embeddings: Result<usize, String>,
    summary: Result<Option<String>, String>,
    keywords: Result<Vec<String>, String>,
    tags: Result<Vec<String>, String>,
    propositions: Result<Vec<String>, String>,
) -> EnrichmentReport {
    let mut errors = HashMap::new();
    let mut report = EnrichmentReport::default();

    match embeddings {
        Ok(count) => report.embeddings_count = count,
        Err(e) => {
            errors.insert("generate_embeddings".to_string(), e);
        }
    }
    match summary {
        Ok(s) => report.summary = s,
        Err(e) => {
            errors.insert("generate_summary".to_string(), e);
        }
    }
    match keywords {
        Ok(k) => report.keywords = k,
        Err(e) => {
            errors.insert("extract_keywords".to_string(), e);
        }
    }
    match tags {
        Ok(t) => report.tags = t,
        Err(e) => {
            errors.insert("extract_tags".to_string(), e);
        }
    }
    match propositions {
        Ok(p) => report.propositions = p,
        Err(e) => {
            errors.insert("extract_propositions".to_string(), e);
        }
    }

    // finalize (§4.5): processed iff any embeddings exist; else error iff
    // any step failed; else left pending (idempotent).
    let status = if report.embeddings_count > 0 {
        DocumentStatus::Processed
    } else if !errors.is_empty() {
        DocumentStatus::Error
    } else {
        DocumentStatus::Pending
    };

    let mut metadata = std::collections::HashMap::new();
    if !errors.is_empty() {
        let errors_json: serde_json::Map<String, serde_json::Value> = errors
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        metadata.insert("errors".to_string(), serde_json::Value::Object(errors_json));
    }

    let _ = ctx.documents.update_document(
        &document_id,
        DocumentPatch {
            status: Some(status),
            metadata: if metadata.is_empty() { None } else { Some(metadata) },
            ..Default::default()
        },
    );

    report.errors = errors;
    report.status = Some(status);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{NullKeywordExtractor, NullPropositionExtractor, NullSummarizer, NullTagExtractor};
    use ingest::AddDocumentRequest;
    use resilience::CircuitBreakerConfig;

    fn make_context() -> (Arc<EnrichmentContext>, Arc<DocumentStore>) {
        let documents = Arc::new(DocumentStore::new());
        let ctx = Arc::new(EnrichmentContext {
            documents: documents.clone(),
            chunks: Arc::new(InMemoryStore::new()),
            tags: Arc::new(TagRegistry::new()),
            breakers: Arc::new(CircuitBreakerRegistry::new(CircuitBreakerConfig::default())),
            embedding_cfg: EmbeddingConfig::default(),
            embedder: None,
            summarizer: Arc::new(NullSummarizer),
            keyword_extractor: Arc::new(NullKeywordExtractor),
            tag_extractor: Arc::new(NullTagExtractor),
            proposition_extractor: Arc::new(NullPropositionExtractor),
        });
        (ctx, documents)
    }

    #[tokio::test]
    async fn full_run_marks_document_processed_with_embeddings() {
        let (ctx, documents) = make_context();
        let text = "Postgres stores rows in heap pages and indexes them with btree structures. \
                     Replication streams the write-ahead log to standbys for durability guarantees. "
            .repeat(5);
        let id = documents.add_document(AddDocumentRequest::new("/doc.txt", text)).unwrap();

        let report = run_enrichment(ctx, id.clone()).await;

        assert!(report.embeddings_count > 0);
        assert_eq!(report.status, Some(DocumentStatus::Processed));
        assert!(report.errors.is_empty());
        assert_eq!(documents.get_document(&id).unwrap().document.status, DocumentStatus::Processed);
    }

    #[tokio::test]
    async fn empty_content_leaves_document_pending() {
        let (ctx, documents) = make_context();
        let id = documents.add_document(AddDocumentRequest::new("/doc.txt", "   ")).unwrap();

        let report = run_enrichment(ctx, id.clone()).await;

        assert_eq!(report.embeddings_count, 0);
        assert_eq!(report.status, Some(DocumentStatus::Pending));
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn short_content_skips_summary_without_error() {
        let (ctx, documents) = make_context();
        let id = documents.add_document(AddDocumentRequest::new("/doc.txt", "short text")).unwrap();

        let report = run_enrichment(ctx, id).await;

        assert!(report.summary.is_none());
        assert!(!report.errors.contains_key("generate_summary"));
    }

    #[tokio::test]
    async fn tags_are_extracted_and_associated() {
        let (ctx, documents) = make_context();
        let text = "database systems postgres indexing replication durability".repeat(3);
        let id = documents.add_document(AddDocumentRequest::new("/doc.txt", text)).unwrap();

        let report = run_enrichment(ctx.clone(), id.clone()).await;

        assert!(!report.tags.is_empty());
        assert_eq!(ctx.tags.tags_for(&id).len(), report.tags.len());
    }
}
