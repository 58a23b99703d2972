//! YAML configuration loading for the engine.
//!
//! [`EngineConfig`] bundles the tunables each wired-in crate exposes
//! (chunking, the embedding client, the circuit breaker, retrieval
//! limits) behind one `Default`-able, `serde`-deserializable struct, the
//! way an integrator would hand a single config file to [`crate::Engine::new`]
//! rather than wiring five crates' configs by hand.
//!
//! ## Example
//!
//! ```
//! use rag_engine::config::EngineConfig;
//!
//! let yaml = r#"
//! chunking:
//!   chunk_size: 800
//!   overlap: 150
//! embedding:
//!   model_name: "bge-small-en-v1.5"
//!   dimensions: 384
//!   max_chars: 8000
//! retrieval:
//!   default_result_limit: 10
//!   candidate_limit: 100
//! "#;
//!
//! let config = EngineConfig::from_yaml(yaml).unwrap();
//! assert_eq!(config.chunking.chunk_size, 800);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use embedding::EmbeddingConfig;
use resilience::CircuitBreakerConfig;

/// Errors that can occur while loading an [`EngineConfig`] from YAML.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Text Chunker tunables (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: canonical::DEFAULT_CHUNK_SIZE,
            overlap: canonical::DEFAULT_OVERLAP,
        }
    }
}

/// Query Orchestrator tunables (§4.9, §4.11).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct RetrievalConfig {
    pub default_result_limit: usize,
    pub candidate_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_result_limit: 10,
            candidate_limit: index::DEFAULT_CANDIDATE_LIMIT,
        }
    }
}

/// Top-level configuration for a wired-up [`crate::Engine`].
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.chunking.chunk_size == 0 {
            return Err(ConfigLoadError::Validation("chunking.chunk_size must be > 0".into()));
        }
        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(ConfigLoadError::Validation(
                "chunking.overlap must be smaller than chunking.chunk_size".into(),
            ));
        }
        if self.embedding.dimensions == 0 {
            return Err(ConfigLoadError::Validation("embedding.dimensions must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_yaml_parses_partial_overrides() {
        let yaml = "chunking:\n  chunk_size: 500\n  overlap: 50\n";
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.overlap, 50);
        // untouched sections keep their defaults
        assert_eq!(config.retrieval, RetrievalConfig::default());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        let yaml = "chunking:\n  chunk_size: 100\n  overlap: 100\n";
        let result = EngineConfig::from_yaml(yaml);
        assert!(matches!(result, Err(ConfigLoadError::Validation(_))));
    }

    #[test]
    fn rejects_zero_dimensions() {
        let yaml = "embedding:\n  model_name: x\n  dimensions: 0\n  max_chars: 100\n";
        let result = EngineConfig::from_yaml(yaml);
        assert!(matches!(result, Err(ConfigLoadError::Validation(_))));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let result = EngineConfig::from_yaml(": not: valid: yaml: [");
        assert!(matches!(result, Err(ConfigLoadError::Validation(_))) || matches!(result, Err(ConfigLoadError::YamlParse(_))));
    }
}
