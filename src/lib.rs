//! Folio: a terminal reader for a personal notes site.
//!
//! The crate hydrates note and page views from a remote content API, keeps
//! fetched notes in a session-wide store, gates protected or scheduled notes
//! behind a reveal state machine, and notices when a displayed note changes.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod testing;
