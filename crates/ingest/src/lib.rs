//! Ingestion Orchestrator + Dedup Engine (§4.4) + Document/Content data
//! model (§3).
//!
//! This is where content enters the pipeline. [`store::DocumentStore::add_document`]
//! runs the multi-stage dedup engine (§4.4) before creating a `pending`
//! [`Document`]; everything after that — chunk, embed, summarize,
//! extract keywords/tags/propositions — is the `orchestrator` crate's
//! Enrichment DAG, layered on top of the `pending` document this crate
//! just created.
//!
//! ## Example
//!
//! ```
//! use ingest::{AddDocumentRequest, DocumentStore};
//!
//! let store = DocumentStore::new();
//! let id = store
//!     .add_document(AddDocumentRequest::new("/docs/report.txt", "Q3 revenue grew 12%."))
//!     .unwrap();
//!
//! // Same location dedupes to the same id and does not mutate content (§4.4, §8).
//! let id2 = store
//!     .add_document(AddDocumentRequest::new("/docs/report.txt", "a different draft"))
//!     .unwrap();
//! assert_eq!(id, id2);
//! ```

pub mod dedup;
pub mod document;
mod error;
pub mod store;

pub use crate::dedup::{find_duplicate, mangle_location, IncomingDocument};
pub use crate::document::{Content, Document, DocumentStatus, DocumentType};
pub use crate::error::IngestError;
pub use crate::store::{AddDocumentRequest, DocumentPatch, DocumentStore, DocumentView};
