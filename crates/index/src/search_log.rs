//! Search tracking (§3 Search/SearchResult entities, §4.11 step 6, §9
//! search-result-cleanup decision): records each query and its result set
//! as a fire-and-forget side effect of [`crate::fuse`], so long as a
//! caller opts in by handing `SearchLog::record` a finished
//! [`crate::MergedHit`] list.
//!
//! Grounded on the same `RwLock<Vec<_>>`/`HashMap` shape as
//! [`crate::retrieval::InMemoryStore`] — this is another in-memory stand-in
//! for the relational store (§6), not a production log sink.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fusion::MergedHit;

/// §3 `Search.search_type`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Semantic,
    Hybrid,
    Fulltext,
    TextFallback,
    SemanticWithKeywords,
}

/// One row per ranked hit returned to the caller (§3 `Search` "per-result
/// rank, similarity_score, clicked, clicked_at").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub search_id: String,
    pub chunk_id: String,
    pub rank: usize,
    pub similarity_score: f32,
    pub clicked: bool,
    pub clicked_at: Option<DateTime<Utc>>,
}

/// A recorded query and its outcome (§3 Search).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Search {
    pub id: String,
    pub query: String,
    pub query_embedding: Option<Vec<f32>>,
    pub search_type: SearchType,
    pub results_count: usize,
    pub execution_time_ms: u64,
    pub filters: Value,
    pub options: Value,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub min_similarity_score: Option<f32>,
    pub max_similarity_score: Option<f32>,
    pub avg_similarity_score: Option<f32>,
    pub created_at: DateTime<Utc>,
}

/// Parameters [`SearchLog::record`] needs beyond the fused hits themselves.
#[derive(Debug, Clone, Default)]
pub struct SearchRecordMeta {
    pub search_type: Option<SearchType>,
    pub execution_time_ms: u64,
    pub filters: Value,
    pub options: Value,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

/// In-memory `Search`/`SearchResult` store. Writes are meant to be spawned
/// fire-and-forget (§5 "Search tracking... must not fail the search") —
/// every method here is infallible so a caller can `tokio::spawn` it
/// without a `Result` to discard.
#[derive(Default)]
pub struct SearchLog {
    searches: RwLock<HashMap<String, Search>>,
    results: RwLock<HashMap<String, Vec<SearchResult>>>,
}

impl SearchLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a `Search` plus one `SearchResult` per fused hit. Similarity
    /// statistics are computed from each hit's best available score
    /// (`similarity`, falling back to `text_rank`/`tag_score` when the
    /// vector channel didn't contribute) — §8 "Search-record consistency"
    /// requires `results_count == |search_results|` and the min/max/avg to
    /// equal the aggregate of the rows actually stored, which this
    /// derives the stats from directly rather than recomputing them.
    pub fn record(&self, query: &str, hits: &[MergedHit], meta: SearchRecordMeta) -> String {
        let search_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        let rows: Vec<SearchResult> = hits
            .iter()
            .enumerate()
            .map(|(idx, hit)| SearchResult {
                id: uuid::Uuid::new_v4().to_string(),
                search_id: search_id.clone(),
                chunk_id: hit.id.clone(),
                rank: idx + 1,
                similarity_score: hit_score(hit),
                clicked: false,
                clicked_at: None,
            })
            .collect();

        let scores: Vec<f32> = rows.iter().map(|r| r.similarity_score).collect();
        let (min_similarity_score, max_similarity_score, avg_similarity_score) = if scores.is_empty() {
            (None, None, None)
        } else {
            let min = scores.iter().cloned().fold(f32::INFINITY, f32::min);
            let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            let avg = scores.iter().sum::<f32>() / scores.len() as f32;
            (Some(min), Some(max), Some(avg))
        };

        let search = Search {
            id: search_id.clone(),
            query: query.to_string(),
            query_embedding: None,
            search_type: meta.search_type.unwrap_or(SearchType::Hybrid),
            results_count: rows.len(),
            execution_time_ms: meta.execution_time_ms,
            filters: meta.filters,
            options: meta.options,
            session_id: meta.session_id,
            user_id: meta.user_id,
            min_similarity_score,
            max_similarity_score,
            avg_similarity_score,
            created_at: now,
        };

        // A Search with zero results is never persisted: per §9's
        // search-result-cleanup decision, a Search and its last
        // SearchResult are deleted together transactionally, not via an
        // after-destroy cascade — symmetrically, one with no results is
        // never created in the first place.
        if rows.is_empty() {
            tracing::debug!(query, "search_log: zero results, not recorded");
            return search_id;
        }

        tracing::debug!(query, results_count = rows.len(), "search_log: recorded search");
        self.searches.write().unwrap().insert(search_id.clone(), search);
        self.results.write().unwrap().insert(search_id.clone(), rows);
        search_id
    }

    pub fn get(&self, search_id: &str) -> Option<Search> {
        self.searches.read().unwrap().get(search_id).cloned()
    }

    pub fn results_for(&self, search_id: &str) -> Vec<SearchResult> {
        self.results.read().unwrap().get(search_id).cloned().unwrap_or_default()
    }

    /// Marks one result row clicked. If the owning `Search` has already
    /// been removed (race with a concurrent delete) this is a no-op.
    pub fn mark_clicked(&self, search_id: &str, chunk_id: &str, at: DateTime<Utc>) {
        if let Some(rows) = self.results.write().unwrap().get_mut(search_id) {
            for row in rows.iter_mut() {
                if row.chunk_id == chunk_id {
                    row.clicked = true;
                    row.clicked_at = Some(at);
                }
            }
        }
    }

    /// Deletes one `SearchResult`; if it was the last one for its Search,
    /// deletes the Search in the same critical section (§9 decision:
    /// transactional-with-last-result, not a lazy after-destroy cascade).
    pub fn delete_result(&self, search_id: &str, result_id: &str) {
        let mut results = self.results.write().unwrap();
        let Some(rows) = results.get_mut(search_id) else {
            return;
        };
        rows.retain(|r| r.id != result_id);
        if rows.is_empty() {
            results.remove(search_id);
            self.searches.write().unwrap().remove(search_id);
        }
    }

    pub fn len(&self) -> usize {
        self.searches.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn hit_score(hit: &MergedHit) -> f32 {
    hit.similarity
        .or(hit.text_rank)
        .or(hit.tag_score)
        .unwrap_or(hit.rrf_score as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn hit(id: &str, similarity: Option<f32>) -> MergedHit {
        MergedHit {
            id: id.to_string(),
            content: format!("content-{id}"),
            similarity,
            text_rank: None,
            tag_score: None,
            matched_tags: Vec::new(),
            rrf_score: 0.01,
            per_channel_ranks: Map::new(),
            sources: Default::default(),
            seen_at: 0,
        }
    }

    #[test]
    fn record_stores_one_result_row_per_hit() {
        let log = SearchLog::new();
        let hits = vec![hit("a", Some(0.9)), hit("b", Some(0.5))];
        let id = log.record("postgres", &hits, SearchRecordMeta::default());

        let search = log.get(&id).unwrap();
        let results = log.results_for(&id);
        assert_eq!(search.results_count, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[1].rank, 2);
    }

    #[test]
    fn similarity_statistics_match_result_aggregate() {
        let log = SearchLog::new();
        let hits = vec![hit("a", Some(0.2)), hit("b", Some(0.8)), hit("c", Some(0.5))];
        let id = log.record("q", &hits, SearchRecordMeta::default());
        let search = log.get(&id).unwrap();

        assert_eq!(search.min_similarity_score, Some(0.2));
        assert_eq!(search.max_similarity_score, Some(0.8));
        let avg = search.avg_similarity_score.unwrap();
        assert!((avg - 0.5).abs() < 1e-6);
    }

    #[test]
    fn empty_hit_list_is_not_persisted() {
        let log = SearchLog::new();
        let id = log.record("no matches", &[], SearchRecordMeta::default());
        assert!(log.get(&id).is_none());
        assert!(log.is_empty());
    }

    #[test]
    fn deleting_last_result_removes_the_search() {
        let log = SearchLog::new();
        let hits = vec![hit("a", Some(0.9))];
        let id = log.record("q", &hits, SearchRecordMeta::default());
        let result_id = log.results_for(&id)[0].id.clone();

        log.delete_result(&id, &result_id);

        assert!(log.get(&id).is_none());
        assert!(log.results_for(&id).is_empty());
    }

    #[test]
    fn mark_clicked_sets_clicked_and_timestamp() {
        let log = SearchLog::new();
        let hits = vec![hit("a", Some(0.9))];
        let id = log.record("q", &hits, SearchRecordMeta::default());

        let now = Utc::now();
        log.mark_clicked(&id, "a", now);

        let results = log.results_for(&id);
        assert!(results[0].clicked);
        assert_eq!(results[0].clicked_at, Some(now));
    }
}
