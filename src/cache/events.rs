//! Change events delivered to subscribers of the note store.

use time::OffsetDateTime;

/// Monotonic counter shared by events and fetch tickets.
///
/// A larger epoch always describes a later store mutation or a later request.
pub type Epoch = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    pub epoch: Epoch,
    /// Opaque key of the affected document.
    pub key: String,
    /// Sequence number of the affected document.
    pub nid: u64,
    pub kind: EventKind,
    pub timestamp: OffsetDateTime,
}

impl CacheEvent {
    pub fn new(epoch: Epoch, key: impl Into<String>, nid: u64, kind: EventKind) -> Self {
        Self {
            epoch,
            key: key.into(),
            nid,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Inserted from a side channel without a network call.
    Seeded,
    /// Replaced by a completed fetch.
    Replaced,
    /// The local liked marker flipped.
    LikeToggled { liked: bool },
}
