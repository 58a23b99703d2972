//! The three Retrieval Channels (§4.9): vector (dense cosine), full-text
//! (token match + trigram fallback), and tag (hierarchical-tag overlap).
//! Each is a pure function of `(query-inputs, filters, timeframe,
//! candidate_limit)` over a [`RetrievalStore`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use embedding::cosine;
use ingest::DocumentType;

use crate::retrieval::{matches_filters, matches_timeframe, Filters, RetrievalStore};

/// Fixed offset added to every token-match rank so full-text token
/// matches always outrank pure trigram-similarity matches (§4.9).
pub const TOKEN_MATCH_OFFSET: f32 = 1000.0;
/// Minimum trigram similarity a row must clear to join the full-text
/// union once it isn't already present from the token-match pass.
pub const TRIGRAM_MIN_SIMILARITY: f32 = 0.1;
/// Rank assigned to substring-match degradation hits when no trigram
/// index is available.
pub const SUBSTRING_FALLBACK_RANK: f32 = 0.5;

/// One candidate chunk as the retrieval channels see it. A thin,
/// denormalized view over Content/ChunkEmbedding/Document/Tag (§3) —
/// real persistence would join these at query time.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub id: String,
    pub document_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub embedding: Option<Vec<f32>>,
    pub tags: Vec<String>,
    pub document_type: DocumentType,
    pub keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A single channel's scored output, with enough identity to merge in
/// [`crate::fusion::fuse`].
#[derive(Debug, Clone)]
pub enum ChannelHit {
    Vector {
        id: String,
        content: String,
        similarity: f32,
    },
    FullText {
        id: String,
        content: String,
        text_rank: f32,
    },
    Tag {
        id: String,
        content: String,
        tag_score: f32,
        matched_tags: Vec<String>,
    },
}

impl ChannelHit {
    pub fn id(&self) -> &str {
        match self {
            ChannelHit::Vector { id, .. } => id,
            ChannelHit::FullText { id, .. } => id,
            ChannelHit::Tag { id, .. } => id,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ChannelHit::Vector { content, .. } => content,
            ChannelHit::FullText { content, .. } => content,
            ChannelHit::Tag { content, .. } => content,
        }
    }
}

/// Dense-vector channel: nearest neighbors under cosine similarity.
/// Returns the empty list if the query embedding is null/empty (§4.9).
pub async fn vector_channel(
    store: &dyn RetrievalStore,
    query_embedding: Option<&[f32]>,
    filters: &Filters,
    timeframe: Option<(DateTime<Utc>, DateTime<Utc>)>,
    candidate_limit: usize,
) -> Vec<ChannelHit> {
    let Some(query) = query_embedding else {
        return Vec::new();
    };
    if query.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(ChunkRecord, f32)> = store
        .all_chunks()
        .await
        .into_iter()
        .filter(|c| matches_filters(c, filters) && matches_timeframe(c, timeframe))
        .filter_map(|c| {
            let embedding = c.embedding.clone()?;
            let similarity = cosine(query, &embedding);
            Some((c, similarity))
        })
        .collect();

    scored.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(candidate_limit);

    scored
        .into_iter()
        .map(|(c, similarity)| ChannelHit::Vector {
            id: c.id,
            content: c.text,
            similarity,
        })
        .collect()
}

/// Full-text channel: token-based match ranked above trigram-similarity
/// match; falls back to substring match when the store has no trigram
/// index, logging the degradation (§4.9).
pub async fn fulltext_channel(
    store: &dyn RetrievalStore,
    cleaned_query: &str,
    filters: &Filters,
    timeframe: Option<(DateTime<Utc>, DateTime<Utc>)>,
    candidate_limit: usize,
) -> Vec<ChannelHit> {
    if cleaned_query.trim().is_empty() {
        return Vec::new();
    }

    let candidates: Vec<ChunkRecord> = store
        .all_chunks()
        .await
        .into_iter()
        .filter(|c| matches_filters(c, filters) && matches_timeframe(c, timeframe))
        .collect();

    let query_tokens: HashSet<String> = cleaned_query
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect();

    let mut selected: Vec<(String, String, f32)> = Vec::new();
    let mut selected_ids: HashSet<String> = HashSet::new();

    for chunk in &candidates {
        let chunk_tokens: HashSet<String> =
            chunk.text.split_whitespace().map(|t| t.to_lowercase()).collect();
        let matched = query_tokens.intersection(&chunk_tokens).count();
        if matched > 0 {
            let rank = TOKEN_MATCH_OFFSET + matched as f32;
            selected.push((chunk.id.clone(), chunk.text.clone(), rank));
            selected_ids.insert(chunk.id.clone());
        }
    }

    match store.trigram_similar(cleaned_query, TRIGRAM_MIN_SIMILARITY) {
        Some(trigram_hits) => {
            let texts: std::collections::HashMap<&str, &str> =
                candidates.iter().map(|c| (c.id.as_str(), c.text.as_str())).collect();
            for (id, similarity) in trigram_hits {
                if selected_ids.contains(&id) {
                    continue;
                }
                if let Some(&text) = texts.get(id.as_str()) {
                    selected.push((id.clone(), text.to_string(), similarity));
                    selected_ids.insert(id);
                }
            }
        }
        None => {
            tracing::warn!(
                "retrieval channel degradation: no trigram index, falling back to substring match"
            );
            let needle = cleaned_query.to_lowercase();
            for chunk in &candidates {
                if selected_ids.contains(&chunk.id) {
                    continue;
                }
                if chunk.text.to_lowercase().contains(&needle) {
                    selected.push((chunk.id.clone(), chunk.text.clone(), SUBSTRING_FALLBACK_RANK));
                    selected_ids.insert(chunk.id.clone());
                }
            }
        }
    }

    selected.sort_by(|(_, _, a), (_, _, b)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    selected.truncate(candidate_limit);

    selected
        .into_iter()
        .map(|(id, content, text_rank)| ChannelHit::FullText { id, content, text_rank })
        .collect()
}

/// Tag channel: chunks whose associated tags intersect the query tag
/// set. Returns the empty list if `tags` is empty (§4.9).
pub async fn tag_channel(
    store: &dyn RetrievalStore,
    tags: &[String],
    filters: &Filters,
    timeframe: Option<(DateTime<Utc>, DateTime<Utc>)>,
    candidate_limit: usize,
) -> Vec<ChannelHit> {
    if tags.is_empty() {
        return Vec::new();
    }
    let query_tags: HashSet<&str> = tags.iter().map(String::as_str).collect();

    let mut scored: Vec<(ChunkRecord, f32, Vec<String>)> = store
        .all_chunks()
        .await
        .into_iter()
        .filter(|c| matches_filters(c, filters) && matches_timeframe(c, timeframe))
        .filter_map(|c| {
            let chunk_tags: HashSet<&str> = c.tags.iter().map(String::as_str).collect();
            let matched: Vec<String> = query_tags
                .intersection(&chunk_tags)
                .map(|s| s.to_string())
                .collect();
            if matched.is_empty() {
                return None;
            }
            let tag_score = matched.len() as f32 / query_tags.len() as f32;
            Some((c, tag_score, matched))
        })
        .collect();

    scored.sort_by(|(_, a, _), (_, b, _)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(candidate_limit);

    scored
        .into_iter()
        .map(|(c, tag_score, matched_tags)| ChannelHit::Tag {
            id: c.id,
            content: c.text,
            tag_score,
            matched_tags,
        })
        .collect()
}
