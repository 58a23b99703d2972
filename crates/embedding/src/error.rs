use thiserror::Error;

/// Errors surfaced by the embedding client.
#[derive(Debug, Error, Clone)]
pub enum EmbeddingError {
    /// `embed`/`embed_batch` was given a direct client handle and the
    /// underlying call failed. Unlike the no-handle path, this is
    /// propagated rather than silently falling back (§4.3).
    #[error("embedding call failed: {0}")]
    ProviderCall(String),
    /// Required configuration (e.g. an API URL) is missing.
    #[error("embedding config error: {0}")]
    Config(String),
}
