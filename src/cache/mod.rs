//! Folio entity cache
//!
//! A session-wide store of notes shared by every mounted view:
//!
//! - **Entries**: documents keyed by opaque id, reachable by sequence number,
//!   bounded by an LRU limit and a freshness TTL
//! - **Relations**: previous/next siblings captured from each fetch envelope
//! - **Liked markers**: the viewer's likes, optionally persisted to disk
//! - **Subscriptions**: per-document observers released by dropping a guard
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! entry_limit = 500
//! ttl_seconds = 300
//! liked_path = "liked.json"
//! ```

mod config;
mod events;
mod liked;
pub(crate) mod lock;
mod store;
mod subscription;

pub use config::CacheConfig;
pub use events::{CacheEvent, Epoch, EventKind};
pub use liked::LikedSet;
pub use store::{CacheEntry, FetchOptions, NoteStore};
pub use subscription::{Callback, Subscription};
