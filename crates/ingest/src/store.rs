//! Ingestion Orchestrator: the `add_document`/`get_document`/`update_document`/
//! `delete_document`/`list_documents` surface from §6, backed by an
//! in-memory [`DocumentStore`] (the relational store behind it is an
//! external collaborator — §6 persistence contract).
//!
//! `add_document` is the only operation that runs the dedup engine
//! (§4.4): every other operation is a plain CRUD call against the
//! store. Enrichment itself (chunk/embed/summarize/tag/extract) is a
//! separate concern layered on top by the `orchestrator` crate, which
//! takes the `pending` document this module just created and drives it
//! through the DAG.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use serde_json::Value;

use crate::dedup::{find_duplicate, mangle_location, IncomingDocument};
use crate::document::{Content, Document, DocumentStatus, DocumentType};
use crate::error::IngestError;

/// Request shape for [`DocumentStore::add_document`].
#[derive(Debug, Clone)]
pub struct AddDocumentRequest {
    pub location: String,
    pub content: String,
    pub title: Option<String>,
    pub document_type: DocumentType,
    pub file_modified_at: Option<chrono::DateTime<Utc>>,
    pub file_bytes: Option<Vec<u8>>,
    pub metadata: HashMap<String, Value>,
    /// Skip all dedup checks and always create a fresh Document (§4.4 step 1).
    pub force: bool,
}

impl AddDocumentRequest {
    pub fn new(location: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            content: content.into(),
            title: None,
            document_type: DocumentType::Text,
            file_modified_at: None,
            file_bytes: None,
            metadata: HashMap::new(),
            force: false,
        }
    }
}

/// Patch applied by [`DocumentStore::update_document`]; `None` fields are
/// left untouched.
#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub metadata: Option<HashMap<String, Value>>,
    pub status: Option<DocumentStatus>,
    pub document_type: Option<DocumentType>,
}

/// A Document plus its canonical [`Content`], the shape `get_document`
/// returns per §6 ("document view with canonical text").
#[derive(Debug, Clone)]
pub struct DocumentView {
    pub document: Document,
    pub content: Option<Content>,
}

/// In-memory repository for [`Document`]/[`Content`] records, and the
/// `add_document` dedup entry point (§4.4, §6). A real deployment swaps
/// the `RwLock<HashMap<..>>` bodies for the relational store (§6); the
/// invariants enforced here (unique id, one Content per Document) are
/// the ones that store must uphold too.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: RwLock<HashMap<String, Document>>,
    contents: RwLock<HashMap<String, Content>>,
    /// Preserves first-seen order for `list_documents`.
    order: RwLock<Vec<String>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// §4.4: dedupe, then either return the existing id or create a new
    /// `pending` Document and its Content. Always returns an id — never an
    /// error for a duplicate (§7: `DuplicateDocument` is not an error).
    pub fn add_document(&self, req: AddDocumentRequest) -> Result<String, IngestError> {
        let location = if req.force {
            mangle_location(&req.location)
        } else {
            let existing = self.documents.read().unwrap();
            let existing_docs: Vec<Document> = existing.values().cloned().collect();
            drop(existing);

            let incoming = IncomingDocument {
                location: &req.location,
                file_modified_at: req.file_modified_at,
                file_bytes: req.file_bytes.as_deref(),
                content: &req.content,
                title: req.title.as_deref(),
                document_type: req.document_type,
            };
            if let Some(existing_id) = find_duplicate(&incoming, &existing_docs) {
                tracing::info!(document_id = %existing_id, location = %req.location, "ingest: duplicate, reusing existing document");
                return Ok(existing_id);
            }
            req.location.clone()
        };

        let mut metadata = req.metadata;
        metadata
            .entry("content_length".to_string())
            .or_insert_with(|| Value::from(req.content.len() as u64));

        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();
        let document = Document {
            id: id.clone(),
            location,
            title: req.title,
            document_type: req.document_type,
            status: DocumentStatus::Pending,
            file_modified_at: req.file_modified_at,
            metadata,
            created_at: now,
            updated_at: now,
        };

        let content = Content {
            document_id: id.clone(),
            content: req.content,
            original_media_type: req.document_type,
            embedding_model: None,
            metadata: HashMap::new(),
        };

        self.documents
            .write()
            .unwrap()
            .insert(id.clone(), document);
        self.contents.write().unwrap().insert(id.clone(), content);
        self.order.write().unwrap().push(id.clone());

        tracing::info!(document_id = %id, "ingest: created pending document");
        Ok(id)
    }

    pub fn get_document(&self, id: &str) -> Option<DocumentView> {
        let document = self.documents.read().unwrap().get(id).cloned()?;
        let content = self.contents.read().unwrap().get(id).cloned();
        Some(DocumentView { document, content })
    }

    pub fn update_document(&self, id: &str, patch: DocumentPatch) -> Result<(), IngestError> {
        let mut documents = self.documents.write().unwrap();
        let document = documents
            .get_mut(id)
            .ok_or_else(|| IngestError::NotFound(id.to_string()))?;
        if let Some(title) = patch.title {
            document.title = Some(title);
        }
        if let Some(metadata) = patch.metadata {
            document.metadata.extend(metadata);
        }
        if let Some(status) = patch.status {
            document.status = status;
        }
        if let Some(document_type) = patch.document_type {
            document.document_type = document_type;
        }
        document.updated_at = Utc::now();
        Ok(())
    }

    pub fn delete_document(&self, id: &str) -> bool {
        let removed = self.documents.write().unwrap().remove(id).is_some();
        self.contents.write().unwrap().remove(id);
        if removed {
            self.order.write().unwrap().retain(|existing| existing != id);
        }
        removed
    }

    /// Ordered by insertion (oldest first), per §6 `list_documents`.
    pub fn list_documents(&self, limit: Option<usize>, offset: Option<usize>) -> Vec<Document> {
        let order = self.order.read().unwrap();
        let documents = self.documents.read().unwrap();
        let offset = offset.unwrap_or(0);
        let limit = limit.unwrap_or(usize::MAX);
        order
            .iter()
            .skip(offset)
            .take(limit)
            .filter_map(|id| documents.get(id).cloned())
            .collect()
    }

    /// Replace a Document's Content wholesale (used after re-conversion or
    /// by the enrichment DAG when persisting the canonical text).
    pub fn put_content(&self, content: Content) {
        self.contents
            .write()
            .unwrap()
            .insert(content.document_id.clone(), content);
    }
}
