//! Document/Content record types (§3) and their in-process repository.
//!
//! These are the durable entities the rest of the pipeline hangs off of.
//! Persistence here is an in-memory map — a stand-in for whatever real
//! store a deployment wires up (the relational/vector store behind this
//! is an external collaborator, §6) — but the invariants it enforces
//! (unique `(location, file_modified_at)`, one `Content` per `Document`)
//! are the ones any backend must uphold.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kinds of source material a [`Document`] can represent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Text,
    Markdown,
    Html,
    Pdf,
    Docx,
    Image,
    Audio,
    Video,
    Csv,
    Json,
    Xml,
    Yaml,
    Unknown,
}

/// Lifecycle state of a [`Document`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Processed,
    Error,
}

/// One ingested source (§3 Document).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub location: String,
    pub title: Option<String>,
    pub document_type: DocumentType,
    pub status: DocumentStatus,
    pub file_modified_at: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn file_hash(&self) -> Option<&str> {
        self.metadata.get("file_hash").and_then(Value::as_str)
    }

    pub fn file_size(&self) -> Option<u64> {
        self.metadata.get("file_size").and_then(Value::as_u64)
    }

    pub fn content_hash(&self) -> Option<&str> {
        self.metadata.get("content_hash").and_then(Value::as_str)
    }

    /// A Document moves to `processed` iff at least one embedding exists for
    /// it; callers pass that fact in explicitly since the document record
    /// itself does not own chunk embeddings.
    pub fn mark_processed(&mut self, had_embeddings: bool) {
        self.status = if had_embeddings {
            DocumentStatus::Processed
        } else {
            DocumentStatus::Error
        };
        self.updated_at = Utc::now();
    }
}

/// A canonical text payload attached to exactly one [`Document`] (§3 Content).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub document_id: String,
    pub content: String,
    pub original_media_type: DocumentType,
    pub embedding_model: Option<String>,
    pub metadata: HashMap<String, Value>,
}

impl Content {
    /// §3 invariant: `content` is non-empty.
    pub fn validate(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// basename with extension stripped, used by the dedup similarity predicate.
pub(crate) fn filename_stem(location: &str) -> String {
    let basename = location.rsplit(['/', '\\']).next().unwrap_or(location);
    match basename.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem.to_string(),
        _ => basename.to_string(),
    }
}
