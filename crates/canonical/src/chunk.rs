//! Word-boundary-aware text chunking for downstream embedding.
//!
//! [`chunks`] walks a cursor across the input, pulling each tentative
//! chunk boundary back to the nearest preceding whitespace so a chunk
//! never splits a word, then advances with enough overlap to give the
//! embedding client shared context between adjacent chunks.
//!
//! # Algorithm
//!
//! 1. Tentative `end = min(start + chunk_size, len(text))`.
//! 2. If `end < len(text)`, search backward from `end` for the last
//!    whitespace strictly after `start`; if found, pull `end` there.
//! 3. Emit the trimmed, non-empty slice `text[start..end]`.
//! 4. Advance `start = max(end - overlap, start + 1)` — the `+ 1` floor
//!    guarantees forward progress even when `overlap >= chunk_size`.
//! 5. Stop once `end >= len(text)`.
//!
//! # Examples
//!
//! ```rust
//! use canonical::chunk::chunks;
//!
//! let text = "the quick brown fox jumps over the lazy dog";
//! let parts = chunks(text, 20, 5);
//! assert!(parts.len() > 1);
//! assert_eq!(parts[0].index, 0);
//! ```

use serde::{Deserialize, Serialize};

/// Default chunk size in characters, per the chunker's documented defaults.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap in characters between adjacent chunks.
pub const DEFAULT_OVERLAP: usize = 200;

/// One chunk of a larger text, with its byte offsets into the original
/// (post-canonicalization) string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub index: usize,
}

/// Split `text` into overlapping, word-boundary-aligned chunks.
///
/// Pure and `O(n)`: every byte is visited a bounded number of times across
/// the whole walk, since the backward whitespace search only scans the
/// tail of the current window.
pub fn chunks(text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let len = text.len();
    if len == 0 || chunk_size == 0 {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut start = 0usize;
    let mut index = 0usize;

    loop {
        let mut end = (start + chunk_size).min(len);

        if end < len {
            if let Some(boundary) = last_whitespace_after(text, start, end) {
                end = boundary;
            }
        }

        let slice = text[start..end].trim();
        if !slice.is_empty() {
            out.push(Chunk {
                text: slice.to_string(),
                start,
                end,
                index,
            });
            index += 1;
        }

        if end >= len {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }

    out
}

/// Split with the documented defaults (`chunk_size = 1000`, `overlap = 200`).
pub fn chunks_default(text: &str) -> Vec<Chunk> {
    chunks(text, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP)
}

/// Find the byte offset of the last whitespace char-boundary in
/// `text[start..end]` strictly after `start`, if any.
fn last_whitespace_after(text: &str, start: usize, end: usize) -> Option<usize> {
    text[start..end]
        .char_indices()
        .filter(|(_, c)| c.is_whitespace())
        .map(|(i, _)| start + i)
        .filter(|&pos| pos > start)
        .next_back()
}
