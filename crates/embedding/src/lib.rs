//! Embedding client: turns cleaned text into dense vectors.
//!
//! A concrete embedding provider (a local ONNX model, a hosted API, a
//! Python microservice — whatever a deployment wires up) is an external
//! collaborator, not something this crate ships. What this crate owns is
//! the *contract* around that collaborator:
//!
//! - clean the input the same way every time ([`clean`])
//! - call the configured [`Embedder`] if one is supplied
//! - if none is supplied, or the call fails, fall back to a deterministic
//!   pseudorandom vector seeded from the cleaned text and model id, so a
//!   document can always be indexed and later re-embedded without drift
//! - guard every real provider call behind a [`resilience::CircuitBreaker`]
//!   so a flaky provider degrades to fallback vectors instead of stalling
//!   the enrichment pipeline
//! - expose [`cosine`] for the vector retrieval channel
//!
//! ## Quick example
//!
//! ```
//! use embedding::{embed, EmbeddingConfig};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cfg = EmbeddingConfig::default();
//! let embedding = embed("Some document text.", &cfg, None).await.unwrap().unwrap();
//! assert!(embedding.is_fallback);
//! assert_eq!(embedding.dimensions(), cfg.dimensions);
//! # }
//! ```

pub mod clean;
pub mod config;
pub mod cosine;
pub mod error;
mod normalize;
mod stub;
pub mod types;

pub use crate::clean::clean;
pub use crate::config::EmbeddingConfig;
pub use crate::cosine::cosine;
pub use crate::error::EmbeddingError;
pub use crate::stub::FALLBACK_MODEL_ID;
pub use crate::types::Embedding;

use std::sync::Arc;

use async_trait::async_trait;
use resilience::CircuitBreaker;

use crate::normalize::l2_normalize_in_place;
use crate::stub::make_fallback_embedding;

/// Service name this crate registers itself under in a shared
/// [`resilience::CircuitBreakerRegistry`].
pub const SERVICE_NAME: &str = "embedding";

/// A configured embedding provider. Implementations wrap whatever actually
/// talks to a model — an ONNX session, an HTTP client, an in-process
/// Python bridge. The client here never constructs one; callers supply it.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single (already cleaned) text, returning a raw, unnormalized
    /// vector of [`Embedder::dimensions`] length.
    async fn embed_raw(&self, cleaned_text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Model identifier surfaced on every [`Embedding`] this embedder
    /// produces.
    fn current_model(&self) -> &str;

    /// Fixed output dimension for `current_model`.
    fn dimensions(&self) -> usize;
}

/// Embed `text` against `cfg`, optionally calling through `embedder`.
///
/// Without an `embedder`, the deterministic fallback is returned directly —
/// this is the expected path in tests and in any deployment that hasn't
/// wired up a real provider yet. With an `embedder`, the call is guarded by
/// `breaker`: an open circuit or a failed call both fall back rather than
/// propagating the error, since a missing embedding should never block
/// ingestion (§4.3).
pub async fn embed(
    text: &str,
    cfg: &EmbeddingConfig,
    embedder: Option<&(dyn Embedder + Send + Sync)>,
) -> Result<Option<Embedding>, EmbeddingError> {
    embed_guarded(text, cfg, embedder, None).await
}

/// Like [`embed`] but guarded by an explicit [`CircuitBreaker`] rather than
/// a bare optional embedder. Use this when several call sites share one
/// breaker via a [`resilience::CircuitBreakerRegistry`].
///
/// Returns `Ok(None)` iff `text` is empty after cleaning (§4.3) — the
/// caller never gets a vector for nothing to embed, fallback included.
pub async fn embed_guarded(
    text: &str,
    cfg: &EmbeddingConfig,
    embedder: Option<&(dyn Embedder + Send + Sync)>,
    breaker: Option<&Arc<CircuitBreaker>>,
) -> Result<Option<Embedding>, EmbeddingError> {
    let Some(cleaned) = clean::clean(text, cfg.max_chars) else {
        return Ok(None);
    };

    let Some(embedder) = embedder else {
        tracing::debug!("embedding: no embedder configured, using fallback");
        return Ok(Some(make_fallback_embedding(&cleaned, &cfg.model_name, cfg.dimensions)));
    };

    if let Some(breaker) = breaker {
        if !breaker.allow_request() {
            tracing::warn!(service = SERVICE_NAME, "embedding: circuit open, using fallback");
            return Ok(Some(make_fallback_embedding(&cleaned, &cfg.model_name, cfg.dimensions)));
        }
    }

    match embedder.embed_raw(&cleaned).await {
        Ok(mut vector) => {
            if let Some(breaker) = breaker {
                breaker.record_success();
            }
            l2_normalize_in_place(&mut vector);
            Ok(Some(Embedding {
                vector,
                model: embedder.current_model().to_string(),
                is_fallback: false,
            }))
        }
        Err(err) => {
            if let Some(breaker) = breaker {
                breaker.record_failure();
            }
            tracing::warn!(error = %err, "embedding: provider call failed, using fallback");
            Ok(Some(make_fallback_embedding(&cleaned, &cfg.model_name, cfg.dimensions)))
        }
    }
}

/// Batch variant of [`embed`] that preserves input order; entries that
/// clean to empty produce no output entry at all (§4.3).
pub async fn embed_batch(
    texts: &[impl AsRef<str>],
    cfg: &EmbeddingConfig,
    embedder: Option<&(dyn Embedder + Send + Sync)>,
) -> Result<Vec<Embedding>, EmbeddingError> {
    let mut out = Vec::with_capacity(texts.len());
    for text in texts {
        if let Some(embedding) = embed(text.as_ref(), cfg, embedder).await? {
            out.push(embedding);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyEmbedder {
        model: String,
        dims: usize,
        fail_calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed_raw(&self, _cleaned_text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if self.fail_calls.fetch_sub(1, Ordering::SeqCst) > 0 {
                Err(EmbeddingError::ProviderCall("boom".into()))
            } else {
                Ok(vec![0.5f32; self.dims])
            }
        }

        fn current_model(&self) -> &str {
            &self.model
        }

        fn dimensions(&self) -> usize {
            self.dims
        }
    }

    #[tokio::test]
    async fn no_embedder_uses_fallback() {
        let cfg = EmbeddingConfig::default();
        let e = embed("hello world", &cfg, None).await.unwrap().unwrap();
        assert!(e.is_fallback);
        assert_eq!(e.dimensions(), cfg.dimensions);
    }

    #[tokio::test]
    async fn fallback_is_deterministic() {
        let cfg = EmbeddingConfig::default();
        let a = embed("same text", &cfg, None).await.unwrap().unwrap();
        let b = embed("same text", &cfg, None).await.unwrap().unwrap();
        assert_eq!(a.vector, b.vector);
    }

    #[tokio::test]
    async fn working_embedder_is_used_and_normalized() {
        let embedder = FlakyEmbedder {
            model: "test-model".into(),
            dims: 4,
            fail_calls: AtomicUsize::new(0),
        };
        let cfg = EmbeddingConfig::default().with_dimensions(4);
        let e = embed("hello", &cfg, Some(&embedder)).await.unwrap().unwrap();
        assert!(!e.is_fallback);
        assert_eq!(e.model, "test-model");
        let norm: f32 = e.vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn failed_embedder_call_falls_back() {
        let embedder = FlakyEmbedder {
            model: "test-model".into(),
            dims: 4,
            fail_calls: AtomicUsize::new(1),
        };
        let cfg = EmbeddingConfig::default().with_dimensions(4);
        let e = embed("hello", &cfg, Some(&embedder)).await.unwrap().unwrap();
        assert!(e.is_fallback);
    }

    #[tokio::test]
    async fn breaker_opens_after_repeated_failures_and_short_circuits() {
        use resilience::{CircuitBreaker, CircuitBreakerConfig};

        let embedder = FlakyEmbedder {
            model: "test-model".into(),
            dims: 4,
            fail_calls: AtomicUsize::new(10),
        };
        let breaker = Arc::new(CircuitBreaker::new(
            CircuitBreakerConfig::default().with_failure_threshold(2),
        ));
        let cfg = EmbeddingConfig::default().with_dimensions(4);

        for _ in 0..2 {
            let e = embed_guarded("hello", &cfg, Some(&embedder), Some(&breaker))
                .await
                .unwrap()
                .unwrap();
            assert!(e.is_fallback);
        }
        assert_eq!(breaker.current_state(), resilience::CircuitState::Open);

        // Circuit now open: embedder must not be called at all.
        let before = embedder.fail_calls.load(Ordering::SeqCst);
        let e = embed_guarded("hello", &cfg, Some(&embedder), Some(&breaker))
            .await
            .unwrap()
            .unwrap();
        assert!(e.is_fallback);
        assert_eq!(embedder.fail_calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn batch_preserves_order_and_determinism() {
        let cfg = EmbeddingConfig::default();
        let texts = vec!["first", "second", "third"];
        let embeddings = embed_batch(&texts, &cfg, None).await.unwrap();
        assert_eq!(embeddings.len(), 3);
        assert_ne!(embeddings[0].vector, embeddings[1].vector);

        let again = embed_batch(&texts, &cfg, None).await.unwrap();
        assert_eq!(embeddings, again);
    }

    #[tokio::test]
    async fn empty_text_embeds_to_nothing() {
        let cfg = EmbeddingConfig::default();
        assert!(embed("", &cfg, None).await.unwrap().is_none());
        assert!(embed("   \n\t  ", &cfg, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_entries_produce_no_batch_output() {
        let cfg = EmbeddingConfig::default();
        let texts = vec!["hello", "", "world"];
        let embeddings = embed_batch(&texts, &cfg, None).await.unwrap();
        assert_eq!(embeddings.len(), 2);
    }
}
