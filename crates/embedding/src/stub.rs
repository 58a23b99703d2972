//! Deterministic fallback embedding generator (§4.3).
//!
//! Used whenever no embedder handle is configured, or a configured call
//! fails on a retryable path. The vector must be reproducible across
//! processes, so it is *not* seeded from object identity or wall clock —
//! it is seeded from a SHA-256 digest of the cleaned text and the model
//! id, expanded into a stream of f32s with a splitmix64-style generator.

use sha2::{Digest, Sha256};

use crate::normalize::l2_normalize_in_place;
use crate::types::Embedding;

/// Tag used as `Embedding::model` for fallback vectors.
pub const FALLBACK_MODEL_ID: &str = "fallback-deterministic-v1";

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

fn seed_from(cleaned_text: &str, model_id: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(cleaned_text.as_bytes());
    hasher.update(b"\0");
    hasher.update(model_id.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[0..8]);
    u64::from_le_bytes(bytes)
}

/// Generate a deterministic fallback vector of `dimensions` length for
/// `cleaned_text` under `model_id`. Always logged as a fallback by the
/// caller — this function itself carries no I/O.
pub(crate) fn make_fallback_embedding(
    cleaned_text: &str,
    model_id: &str,
    dimensions: usize,
) -> Embedding {
    let mut state = seed_from(cleaned_text, model_id);
    let mut vector = Vec::with_capacity(dimensions);
    for _ in 0..dimensions {
        let bits = splitmix64(&mut state);
        // map to [-1, 1]
        let unit = (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64);
        vector.push((unit * 2.0 - 1.0) as f32);
    }
    l2_normalize_in_place(&mut vector);
    Embedding {
        vector,
        model: FALLBACK_MODEL_ID.to_string(),
        is_fallback: true,
    }
}
