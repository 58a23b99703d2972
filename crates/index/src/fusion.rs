//! Reciprocal Rank Fusion (§4.10): merges the three channels' rank lists
//! into one unified scored ranking.

use std::collections::{HashMap, HashSet};

use crate::channels::ChannelHit;

/// RRF smoothing constant.
pub const RRF_K: f64 = 60.0;
/// `candidate_limit` default before the per-channel 3x fusion-headroom
/// multiplier (§4.10).
pub const DEFAULT_CANDIDATE_LIMIT: usize = 100;
/// Multiplier applied to `candidate_limit` before calling each channel.
pub const CANDIDATE_LIMIT_OVERSAMPLE: usize = 3;

/// Clamp a caller-supplied result `limit` to `[1, 1000]` (§4.10).
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, 1000)
}

/// Expand a caller-supplied `candidate_limit` by the fusion headroom
/// multiplier (§4.10), defaulting to [`DEFAULT_CANDIDATE_LIMIT`].
pub fn expand_candidate_limit(candidate_limit: Option<usize>) -> usize {
    candidate_limit.unwrap_or(DEFAULT_CANDIDATE_LIMIT) * CANDIDATE_LIMIT_OVERSAMPLE
}

/// One fused hit: the union of every channel's contribution for a given
/// chunk id (§4.11's `{id, content, similarity, text_rank, tag_score,
/// matched_tags, rrf_score, per-channel ranks, sources}`).
#[derive(Debug, Clone)]
pub struct MergedHit {
    pub id: String,
    pub content: String,
    pub similarity: Option<f32>,
    pub text_rank: Option<f32>,
    pub tag_score: Option<f32>,
    pub matched_tags: Vec<String>,
    pub rrf_score: f64,
    /// 1-based rank this id held within each channel that surfaced it.
    pub per_channel_ranks: HashMap<&'static str, usize>,
    pub sources: HashSet<&'static str>,
    /// Order this id was first seen across `channels`, used to break
    /// `rrf_score` ties by appearance (§8 scenario 3) instead of the
    /// merge map's nondeterministic iteration order.
    pub seen_at: usize,
}

impl MergedHit {
    fn seed(id: String, content: String, seen_at: usize) -> Self {
        Self {
            id,
            content,
            similarity: None,
            text_rank: None,
            tag_score: None,
            matched_tags: Vec::new(),
            rrf_score: 0.0,
            per_channel_ranks: HashMap::new(),
            sources: HashSet::new(),
            seen_at,
        }
    }

    fn apply(&mut self, hit: &ChannelHit, channel: &'static str, rank: usize) {
        self.rrf_score += 1.0 / (RRF_K + rank as f64);
        self.per_channel_ranks.insert(channel, rank);
        self.sources.insert(channel);
        match hit {
            ChannelHit::Vector { similarity, .. } => self.similarity = Some(*similarity),
            ChannelHit::FullText { text_rank, .. } => self.text_rank = Some(*text_rank),
            ChannelHit::Tag {
                tag_score,
                matched_tags,
                ..
            } => {
                self.tag_score = Some(*tag_score);
                for tag in matched_tags {
                    if !self.matched_tags.contains(tag) {
                        self.matched_tags.push(tag.clone());
                    }
                }
            }
        }
    }
}

/// Fuse `(channel_name, ordered hits)` pairs via RRF and return the top
/// `limit` (already clamp-able via [`clamp_limit`]).
pub fn fuse(channels: &[(&'static str, Vec<ChannelHit>)], limit: usize) -> Vec<MergedHit> {
    let mut merged: HashMap<String, MergedHit> = HashMap::new();
    let mut next_seen_at = 0usize;

    for (channel_name, hits) in channels {
        for (idx, hit) in hits.iter().enumerate() {
            let rank = idx + 1;
            let entry = merged.entry(hit.id().to_string()).or_insert_with(|| {
                let seed = MergedHit::seed(hit.id().to_string(), hit.content().to_string(), next_seen_at);
                next_seen_at += 1;
                seed
            });
            entry.apply(hit, channel_name, rank);
        }
    }

    let mut out: Vec<MergedHit> = merged.into_values().collect();
    out.sort_by(|a, b| {
        b.rrf_score
            .partial_cmp(&a.rrf_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.seen_at.cmp(&b.seen_at))
    });
    out.truncate(limit);
    out
}
