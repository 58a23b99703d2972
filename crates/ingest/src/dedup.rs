//! Multi-stage duplicate detection on ingest (§4.4).
//!
//! Order matters: each stage is cheaper and more certain than the next,
//! so the engine checks exact matches before falling back to content
//! similarity. `force` bypasses every stage by mangling the location so
//! the caller always gets a fresh Document.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::document::{filename_stem, Document, DocumentType};

/// Facts about an about-to-be-ingested document, gathered before dedup
/// runs. `file_bytes` is `Some` only when `location` refers to a local
/// file the caller can actually read; otherwise hashing falls back to
/// the in-memory `content`.
pub struct IncomingDocument<'a> {
    pub location: &'a str,
    pub file_modified_at: Option<DateTime<Utc>>,
    pub file_bytes: Option<&'a [u8]>,
    pub content: &'a str,
    pub title: Option<&'a str>,
    pub document_type: DocumentType,
}

/// Append a short unique suffix to `location` so a forced ingest never
/// collides with an existing document.
pub fn mangle_location(location: &str) -> String {
    format!("{location}#force-{}", uuid::Uuid::new_v4())
}

/// Run the dedup stages against `existing` and return the id of the
/// duplicate, if any. Never called when `force` is set — callers handle
/// that branch by mangling the location and skipping this function
/// entirely (§4.4 step 1).
pub fn find_duplicate(incoming: &IncomingDocument<'_>, existing: &[Document]) -> Option<String> {
    // (a) exact location match
    if let Some(doc) = existing.iter().find(|d| d.location == incoming.location) {
        return Some(doc.id.clone());
    }

    // (b) exact (location, file_modified_at) match
    if let Some(modified) = incoming.file_modified_at {
        if let Some(doc) = existing.iter().find(|d| {
            d.location == incoming.location && d.file_modified_at == Some(modified)
        }) {
            return Some(doc.id.clone());
        }
    }

    if let Some(bytes) = incoming.file_bytes {
        // (c) local file: SHA-256(file_bytes) against metadata.file_hash
        let hash = hex_sha256(bytes);
        if let Some(doc) = existing.iter().find(|d| d.file_hash() == Some(hash.as_str())) {
            return Some(doc.id.clone());
        }

        // (d) among documents with identical file_size, run the similarity predicate
        let incoming_size = bytes.len() as u64;
        if let Some(doc) = existing
            .iter()
            .filter(|d| d.file_size() == Some(incoming_size))
            .find(|d| is_similar(incoming, d))
        {
            return Some(doc.id.clone());
        }
    } else {
        // (e) not a local file: SHA-256(content) against metadata.content_hash,
        // else title + content length within 5%
        let hash = hex_sha256(incoming.content.as_bytes());
        if let Some(doc) = existing
            .iter()
            .find(|d| d.content_hash() == Some(hash.as_str()))
        {
            return Some(doc.id.clone());
        }

        if let Some(title) = incoming.title {
            let incoming_len = incoming.content.len();
            if let Some(doc) = existing.iter().find(|d| {
                d.title.as_deref() == Some(title) && within_five_percent(incoming_len, content_len_hint(d))
            }) {
                return Some(doc.id.clone());
            }
        }
    }

    None
}

/// The similarity predicate from §4.4(d): same filename stem, content
/// lengths within 5% of the larger, same document type, same non-null
/// title.
fn is_similar(incoming: &IncomingDocument<'_>, existing: &Document) -> bool {
    if filename_stem(incoming.location) != filename_stem(&existing.location) {
        return false;
    }
    if incoming.document_type != existing.document_type {
        return false;
    }
    match (incoming.title, existing.title.as_deref()) {
        (Some(a), Some(b)) if a == b => {}
        _ => return false,
    }
    within_five_percent(incoming.content.len(), content_len_hint(existing))
}

fn content_len_hint(doc: &Document) -> usize {
    doc.metadata
        .get("content_length")
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .unwrap_or(0)
}

fn within_five_percent(a: usize, b: usize) -> bool {
    if a == 0 && b == 0 {
        return true;
    }
    let larger = a.max(b) as f64;
    let diff = (a as f64 - b as f64).abs();
    diff <= larger * 0.05
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn doc(id: &str, location: &str, file_hash: Option<&str>, content_len: usize) -> Document {
        let mut metadata = HashMap::new();
        if let Some(h) = file_hash {
            metadata.insert("file_hash".into(), json!(h));
        }
        metadata.insert("content_length".into(), json!(content_len));
        Document {
            id: id.into(),
            location: location.into(),
            title: Some("Report".into()),
            document_type: DocumentType::Text,
            status: crate::document::DocumentStatus::Pending,
            file_modified_at: None,
            metadata,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn exact_location_is_duplicate() {
        let existing = vec![doc("d1", "/a/report.pdf", None, 100)];
        let incoming = IncomingDocument {
            location: "/a/report.pdf",
            file_modified_at: None,
            file_bytes: None,
            content: "anything",
            title: None,
            document_type: DocumentType::Text,
        };
        assert_eq!(find_duplicate(&incoming, &existing), Some("d1".into()));
    }

    #[test]
    fn file_hash_match_is_duplicate() {
        let bytes = b"hello world";
        let hash = hex_sha256(bytes);
        let existing = vec![doc("d1", "/other/path.pdf", Some(&hash), 11)];
        let incoming = IncomingDocument {
            location: "/a/report.pdf",
            file_modified_at: None,
            file_bytes: Some(bytes),
            content: "hello world",
            title: None,
            document_type: DocumentType::Text,
        };
        assert_eq!(find_duplicate(&incoming, &existing), Some("d1".into()));
    }

    #[test]
    fn similarity_predicate_matches_renamed_file() {
        let existing = vec![doc("d1", "/a/report.pdf", None, 100)];
        let incoming = IncomingDocument {
            location: "/b/report.docx",
            file_modified_at: None,
            file_bytes: Some(&[0u8; 103]),
            content: &"x".repeat(103),
            title: Some("Report"),
            document_type: DocumentType::Text,
        };
        assert_eq!(find_duplicate(&incoming, &existing), Some("d1".into()));
    }

    #[test]
    fn content_too_different_is_not_duplicate() {
        let existing = vec![doc("d1", "/a/report.pdf", None, 100)];
        let incoming = IncomingDocument {
            location: "/b/report.docx",
            file_modified_at: None,
            file_bytes: Some(&[0u8; 500]),
            content: &"x".repeat(500),
            title: Some("Report"),
            document_type: DocumentType::Text,
        };
        assert_eq!(find_duplicate(&incoming, &existing), None);
    }

    #[test]
    fn mangled_location_is_unique() {
        let a = mangle_location("/a/report.pdf");
        let b = mangle_location("/a/report.pdf");
        assert_ne!(a, b);
        assert!(a.starts_with("/a/report.pdf#force-"));
    }

    #[test]
    fn no_match_returns_none() {
        let existing = vec![doc("d1", "/a/report.pdf", None, 100)];
        let incoming = IncomingDocument {
            location: "/z/unrelated.pdf",
            file_modified_at: None,
            file_bytes: None,
            content: "totally different content",
            title: Some("Unrelated"),
            document_type: DocumentType::Text,
        };
        assert_eq!(find_duplicate(&incoming, &existing), None);
    }
}
