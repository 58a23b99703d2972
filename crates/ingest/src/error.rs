//! Error types produced by the `ingest` crate.

use thiserror::Error;

/// Errors surfaced by [`crate::store::DocumentStore`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    #[error("document not found: {0}")]
    NotFound(String),
}
