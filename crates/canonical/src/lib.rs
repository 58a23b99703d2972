//! Text Chunker (§4.2): splits a Document's canonical text into
//! overlapping, word-boundary-aligned chunks ready for embedding.
//!
//! The pipeline's format-specific extraction (PDF/DOCX/HTML/image
//! captioning/audio transcription) is an external collaborator — this
//! crate starts from whatever canonical text that collaborator already
//! produced and owns only the deterministic chunking step that every
//! media type shares once it's text.

pub mod chunk;

pub use crate::chunk::{chunks, chunks_default, Chunk, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
