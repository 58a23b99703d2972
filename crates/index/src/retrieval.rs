//! `RetrievalStore` trait + in-memory reference implementation backing
//! the three retrieval channels (§4.9). The concrete relational/vector/
//! full-text store is an external collaborator (§6); `InMemoryStore` is
//! just enough of one to exercise every channel invariant in tests.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use ingest::DocumentType;
use roaring::RoaringBitmap;

use crate::channels::ChunkRecord;

/// Equality/overlap filters shared by all three channels (§4.9 "Common
/// filters").
#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub document_type: Option<DocumentType>,
    /// Array-overlap against the chunk's owning Document's keywords.
    pub keywords: Vec<String>,
}

pub fn matches_filters(chunk: &ChunkRecord, filters: &Filters) -> bool {
    if let Some(document_type) = filters.document_type {
        if chunk.document_type != document_type {
            return false;
        }
    }
    if !filters.keywords.is_empty()
        && !filters
            .keywords
            .iter()
            .any(|k| chunk.keywords.iter().any(|ck| ck == k))
    {
        return false;
    }
    true
}

pub fn matches_timeframe(chunk: &ChunkRecord, range: Option<(DateTime<Utc>, DateTime<Utc>)>) -> bool {
    match range {
        None => true,
        Some((start, end)) => chunk.created_at >= start && chunk.created_at < end,
    }
}

/// Source of candidate chunks for the retrieval channels. A real backend
/// would push filtering/ranking into the database; the in-memory
/// reference store instead hands back every chunk and lets the channel
/// functions in `channels.rs` do the work, plus a pre-built trigram index
/// for the full-text fallback path.
#[async_trait::async_trait]
pub trait RetrievalStore: Send + Sync {
    async fn all_chunks(&self) -> Vec<ChunkRecord>;

    /// `None` simulates a store with no trigram index, forcing the
    /// full-text channel onto its substring-match degradation path.
    fn trigram_similar(&self, query: &str, min_similarity: f32) -> Option<Vec<(String, f32)>>;
}

/// Minimal in-memory `RetrievalStore`, grounded in the teacher's
/// `InMemoryBackend` (`crates/index/src/backend`): a plain `Vec` behind a
/// lock, plus a `HashMap<trigram, RoaringBitmap>` postings index so the
/// trigram-similarity path is real rather than a stub.
pub struct InMemoryStore {
    chunks: RwLock<Vec<ChunkRecord>>,
    trigram_index: RwLock<HashMap<String, RoaringBitmap>>,
    trigram_enabled: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_trigram_index(true)
    }

    /// `trigram_enabled = false` simulates a store without the index, per
    /// §4.9's degradation path.
    pub fn with_trigram_index(trigram_enabled: bool) -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
            trigram_index: RwLock::new(HashMap::new()),
            trigram_enabled,
        }
    }

    pub fn insert(&self, chunk: ChunkRecord) {
        let mut chunks = self.chunks.write().unwrap();
        let ordinal = chunks.len() as u32;
        if self.trigram_enabled {
            let mut index = self.trigram_index.write().unwrap();
            for trigram in trigrams(&chunk.text) {
                index.entry(trigram).or_default().insert(ordinal);
            }
        }
        chunks.push(chunk);
    }

    pub fn len(&self) -> usize {
        self.chunks.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RetrievalStore for InMemoryStore {
    async fn all_chunks(&self) -> Vec<ChunkRecord> {
        self.chunks.read().unwrap().clone()
    }

    fn trigram_similar(&self, query: &str, min_similarity: f32) -> Option<Vec<(String, f32)>> {
        if !self.trigram_enabled {
            return None;
        }

        let query_trigrams: HashSet<String> = trigrams(query).into_iter().collect();
        if query_trigrams.is_empty() {
            return Some(Vec::new());
        }

        let index = self.trigram_index.read().unwrap();
        let chunks = self.chunks.read().unwrap();

        let mut matched_ordinals: RoaringBitmap = RoaringBitmap::new();
        for trigram in &query_trigrams {
            if let Some(postings) = index.get(trigram) {
                matched_ordinals |= postings;
            }
        }

        let mut out = Vec::new();
        for ordinal in matched_ordinals.iter() {
            let Some(chunk) = chunks.get(ordinal as usize) else {
                continue;
            };
            let chunk_trigrams: HashSet<String> = trigrams(&chunk.text).into_iter().collect();
            let similarity = jaccard(&query_trigrams, &chunk_trigrams);
            if similarity >= min_similarity {
                out.push((chunk.id.clone(), similarity));
            }
        }
        Some(out)
    }
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f32;
    let union = a.union(b).count() as f32;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Lowercased, whitespace-collapsed 3-char shingles of `text`, the
/// standard trigram-similarity unit (matches Postgres `pg_trgm`'s
/// padding-free variant closely enough for ranking purposes).
fn trigrams(text: &str) -> Vec<String> {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    let chars: Vec<char> = normalized.chars().collect();
    if chars.len() < 3 {
        return Vec::new();
    }
    chars.windows(3).map(|w| w.iter().collect()).collect()
}
