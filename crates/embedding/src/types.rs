use serde::{Deserialize, Serialize};

/// A dense embedding vector plus the provenance needed to interpret it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Embedding {
    /// The embedding values.
    pub vector: Vec<f32>,
    /// Identifier of the model that produced `vector` (or the fallback tag,
    /// see [`crate::FALLBACK_MODEL_ID`]).
    pub model: String,
    /// `true` when `vector` came from the deterministic fallback generator
    /// rather than a configured model call.
    pub is_fallback: bool,
}

impl Embedding {
    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }
}
