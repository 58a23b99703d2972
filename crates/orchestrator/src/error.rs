//! Error types for the Enrichment DAG and Query Orchestrator.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("document not found: {0}")]
    DocumentNotFound(String),
    #[error(transparent)]
    Ingest(#[from] ingest::IngestError),
}

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] embedding::EmbeddingError),
    #[error("malformed timeframe: {0}")]
    Timeframe(#[from] textmeta::TimeframeError),
}
