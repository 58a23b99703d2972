//! External collaborators consumed by the Enrichment DAG (§6): the real
//! summarizer/keyword-extractor/tag-extractor/proposition-extractor are
//! out of scope (§1) — these traits are the seam, and the `Null*` types
//! are trivial deterministic stand-ins so the DAG is fully exercisable
//! without a network call.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
#[error("collaborator call failed: {0}")]
pub struct CollaboratorError(pub String);

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<Option<String>, CollaboratorError>;
}

#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    async fn keywords(&self, text: &str) -> Result<Vec<String>, CollaboratorError>;
}

#[async_trait]
pub trait TagExtractor: Send + Sync {
    async fn raw_tags(
        &self,
        text: &str,
        existing_ontology: &[String],
    ) -> Result<Vec<String>, CollaboratorError>;
}

#[async_trait]
pub trait PropositionExtractor: Send + Sync {
    async fn raw(&self, text: &str) -> Result<Vec<String>, CollaboratorError>;
}

/// Never produces a summary (content always stays below the threshold,
/// from this collaborator's point of view).
pub struct NullSummarizer;

#[async_trait]
impl Summarizer for NullSummarizer {
    async fn summarize(&self, _text: &str) -> Result<Option<String>, CollaboratorError> {
        Ok(None)
    }
}

/// Deterministic keyword stand-in: the 5 most frequent words longer than
/// 3 characters, lowercased.
pub struct NullKeywordExtractor;

#[async_trait]
impl KeywordExtractor for NullKeywordExtractor {
    async fn keywords(&self, text: &str) -> Result<Vec<String>, CollaboratorError> {
        use std::collections::HashMap;
        let mut counts: HashMap<String, usize> = HashMap::new();
        for word in text.split_whitespace() {
            let cleaned: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if cleaned.len() > 3 {
                *counts.entry(cleaned).or_insert(0) += 1;
            }
        }
        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(ranked.into_iter().take(5).map(|(word, _)| word).collect())
    }
}

/// Deterministic tag stand-in: every word longer than 4 characters
/// becomes a flat `"auto:<word>"` tag candidate.
pub struct NullTagExtractor;

#[async_trait]
impl TagExtractor for NullTagExtractor {
    async fn raw_tags(
        &self,
        text: &str,
        _existing_ontology: &[String],
    ) -> Result<Vec<String>, CollaboratorError> {
        let mut tags: Vec<String> = text
            .split_whitespace()
            .filter(|w| w.len() > 4)
            .map(|w| {
                let cleaned: String = w.chars().filter(|c| c.is_alphanumeric()).collect();
                format!("auto:{}", cleaned.to_lowercase())
            })
            .collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }
}

/// Deterministic proposition stand-in: every sentence-like fragment
/// (split on `.`) becomes a candidate proposition line.
pub struct NullPropositionExtractor;

#[async_trait]
impl PropositionExtractor for NullPropositionExtractor {
    async fn raw(&self, text: &str) -> Result<Vec<String>, CollaboratorError> {
        Ok(text
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }
}
