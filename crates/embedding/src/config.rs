use serde::{Deserialize, Serialize};

/// Runtime configuration for an [`crate::Embedder`].
///
/// There is no model loading here on purpose: the concrete model/provider
/// is an external collaborator (§6 of the engine spec). This config only
/// carries what the *client* needs to know — the declared dimension
/// (used to size the deterministic fallback and to validate real model
/// output) and the model identifier surfaced on every [`crate::Embedding`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Identifier surfaced on every embedding (e.g. `"bge-small-en-v1.5"`).
    pub model_name: String,
    /// Fixed output dimension for `model_name`.
    pub dimensions: usize,
    /// Maximum characters kept after cleaning (§4.3 cleaning rule).
    pub max_chars: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: "bge-small-en-v1.5".into(),
            dimensions: 384,
            max_chars: 8000,
        }
    }
}

impl EmbeddingConfig {
    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    pub fn with_dimensions(mut self, dim: usize) -> Self {
        self.dimensions = dim;
        self
    }
}
