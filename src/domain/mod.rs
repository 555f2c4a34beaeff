//! Domain types: documents, ids, and relations between notes.

pub mod document;
pub mod error;

pub use document::{Document, DocumentId, Note, Relation, Sibling, Track};
