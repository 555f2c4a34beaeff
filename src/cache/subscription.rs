//! Per-document observers of the note store.
//!
//! Views subscribe on mount and hold the returned [`Subscription`]; dropping it
//! unsubscribes. Callbacks are invoked after every store lock is released, but
//! they still must not mutate the store synchronously.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::domain::DocumentId;

use super::events::CacheEvent;
use super::lock;

pub type Callback = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

#[derive(Default)]
pub(crate) struct SubscriberSet {
    next_token: AtomicU64,
    entries: Mutex<HashMap<u64, (DocumentId, Callback)>>,
}

impl SubscriberSet {
    pub(crate) fn insert(&self, id: DocumentId, callback: Callback) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        lock::lock(&self.entries, "subscribers.insert").insert(token, (id, callback));
        token
    }

    pub(crate) fn remove(&self, token: u64) {
        lock::lock(&self.entries, "subscribers.remove").remove(&token);
    }

    /// Callbacks registered for the document with this key or sequence number.
    pub(crate) fn matching(&self, key: &str, nid: u64) -> Vec<Callback> {
        lock::lock(&self.entries, "subscribers.matching")
            .values()
            .filter(|(id, _)| match id {
                DocumentId::Seq(seq) => *seq == nid,
                DocumentId::Key(k) => k == key,
            })
            .map(|(_, callback)| Arc::clone(callback))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        lock::lock(&self.entries, "subscribers.len").len()
    }
}

/// Scoped registration; the callback stays active until this guard is dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    token: u64,
    set: Weak<SubscriberSet>,
}

impl Subscription {
    pub(crate) fn new(token: u64, set: &Arc<SubscriberSet>) -> Self {
        Self {
            token,
            set: Arc::downgrade(set),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(set) = self.set.upgrade() {
            set.remove(self.token);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("token", &self.token)
            .finish()
    }
}
