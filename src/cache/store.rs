//! The note store.
//!
//! Holds fetched documents keyed by their opaque id, an alias index from
//! sequence number to key, the previous/next relation of each document, and
//! the viewer's liked markers. Entries are replaced wholesale on every
//! successful fetch; fields are never merged.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use folio_api_types::NoteEnvelope;
use lru::LruCache;
use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::application::error::FetchError;
use crate::application::ports::NoteGateway;
use crate::domain::{Document, DocumentId, Note, Relation, Sibling};

use super::config::CacheConfig;
use super::events::{CacheEvent, Epoch, EventKind};
use super::liked::LikedSet;
use super::lock;
use super::subscription::{SubscriberSet, Subscription};

const METRIC_CACHE_HIT: &str = "folio_cache_hit_total";
const METRIC_CACHE_MISS: &str = "folio_cache_miss_total";
const METRIC_CACHE_EVICT: &str = "folio_cache_evict_total";
const METRIC_CACHE_STALE_WRITE: &str = "folio_cache_stale_write_total";
const LATEST_ALIAS: &str = "latest";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Skip the cached entry and always ask the gateway.
    pub force: bool,
}

impl FetchOptions {
    pub fn forced() -> Self {
        Self { force: true }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub document: Document,
    pub fetched_at: Instant,
    epoch: Epoch,
}

struct Index {
    entries: LruCache<String, CacheEntry>,
    by_nid: HashMap<u64, String>,
    relations: HashMap<String, Relation>,
}

impl Index {
    fn resolve(&self, id: &DocumentId) -> Option<String> {
        match id {
            DocumentId::Seq(nid) => self.by_nid.get(nid).cloned(),
            DocumentId::Key(key) => Some(key.clone()),
        }
    }

    fn insert(&mut self, entry: CacheEntry, relation: Option<Relation>) {
        let key = entry.document.id.clone();
        self.by_nid.insert(entry.document.nid, key.clone());
        if let Some(relation) = relation {
            self.relations.insert(key.clone(), relation);
        }

        if let Some((evicted_key, evicted)) = self.entries.push(key.clone(), entry)
            && evicted_key != key
        {
            counter!(METRIC_CACHE_EVICT).increment(1);
            debug!(key = %evicted_key, "evicted least recently read note");
            if self.by_nid.get(&evicted.document.nid) == Some(&evicted_key) {
                self.by_nid.remove(&evicted.document.nid);
            }
            self.relations.remove(&evicted_key);
        }
    }
}

/// Session-wide store of notes, shared by reference between every mounted view.
pub struct NoteStore {
    config: CacheConfig,
    gateway: Arc<dyn NoteGateway>,
    index: RwLock<Index>,
    issued: Mutex<HashMap<String, Epoch>>,
    liked: LikedSet,
    epoch: AtomicU64,
    subscribers: Arc<SubscriberSet>,
    outbound: Mutex<Vec<JoinHandle<()>>>,
}

impl NoteStore {
    pub fn new(config: CacheConfig, gateway: Arc<dyn NoteGateway>) -> Self {
        let liked = LikedSet::load(config.liked_path.clone());
        let index = Index {
            entries: LruCache::new(config.entry_limit_non_zero()),
            by_nid: HashMap::new(),
            relations: HashMap::new(),
        };
        Self {
            config,
            gateway,
            index: RwLock::new(index),
            issued: Mutex::new(HashMap::new()),
            liked,
            epoch: AtomicU64::new(0),
            subscribers: Arc::new(SubscriberSet::default()),
            outbound: Mutex::new(Vec::new()),
        }
    }

    /// Cached document for `id`, without any network I/O.
    pub fn get(&self, id: &DocumentId) -> Option<Document> {
        let mut index = lock::write(&self.index, "get");
        let key = index.resolve(id)?;
        index.entries.get(&key).map(|entry| entry.document.clone())
    }

    pub fn relation(&self, id: &DocumentId) -> Option<Relation> {
        let index = lock::read(&self.index, "relation");
        let key = index.resolve(id)?;
        index.relations.get(&key).cloned()
    }

    pub fn has_relation(&self, id: &DocumentId) -> bool {
        self.relation(id).is_some()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock::read(&self.index, "len").entries.len()
    }

    /// Look a note up, going to the gateway unless a fresh entry exists.
    ///
    /// A 403 without a password resolves to [`Note::PasswordRequired`]; with a
    /// password it fails with [`FetchError::InvalidPassword`].
    #[instrument(skip(self, password), fields(id = %id, force = options.force))]
    pub async fn fetch_by_id(
        &self,
        id: &DocumentId,
        password: Option<&str>,
        options: FetchOptions,
    ) -> Result<Note, FetchError> {
        if !options.force
            && let Some(document) = self.fresh(id)
        {
            counter!(METRIC_CACHE_HIT).increment(1);
            debug!("note served from cache");
            return Ok(Note::Resolved(document));
        }
        counter!(METRIC_CACHE_MISS).increment(1);

        let alias = alias_of(id);
        let ticket = self.issue(&alias);
        match self.gateway.note(id, password).await {
            Ok(envelope) => Ok(Note::Resolved(self.apply(&alias, ticket, envelope))),
            Err(error) => match FetchError::classify(error, password.is_some()) {
                FetchError::NeedsPassword => {
                    info!("note requires a password");
                    Ok(Note::PasswordRequired { id: id.clone() })
                }
                other => {
                    warn!(error = %other, "note fetch failed");
                    Err(other)
                }
            },
        }
    }

    /// Fetch the most recent note. Never served from cache.
    #[instrument(skip(self))]
    pub async fn fetch_latest(&self) -> Result<Document, FetchError> {
        counter!(METRIC_CACHE_MISS).increment(1);
        let ticket = self.issue(LATEST_ALIAS);
        let envelope = self.gateway.latest_note().await.map_err(|error| {
            let error = FetchError::classify(error, false);
            warn!(error = %error, "latest note fetch failed");
            error
        })?;
        Ok(self.apply(LATEST_ALIAS, ticket, envelope))
    }

    /// Seed the store with a document that arrived without a fetch.
    pub fn add(&self, document: Document) {
        let epoch = self.next_epoch();
        let (key, nid) = (document.id.clone(), document.nid);
        let entry = CacheEntry {
            document,
            fetched_at: Instant::now(),
            epoch,
        };
        lock::write(&self.index, "add").insert(entry, None);
        debug!(%key, nid, "note seeded");
        self.emit(&key, nid, EventKind::Seeded);
    }

    pub fn is_liked(&self, nid: u64) -> bool {
        self.liked.contains(nid)
    }

    /// Flip the local liked marker; a new like is sent to the gateway in the background.
    ///
    /// The local marker is never rolled back if the remote call fails.
    pub fn like(&self, nid: u64) -> bool {
        let liked = self.liked.toggle(nid);
        if liked {
            self.send_like(nid);
        }
        let key = lock::read(&self.index, "like").by_nid.get(&nid).cloned();
        if let Some(key) = key {
            self.emit(&key, nid, EventKind::LikeToggled { liked });
        }
        liked
    }

    /// Observe changes to one document until the returned guard is dropped.
    pub fn subscribe<F>(&self, id: DocumentId, callback: F) -> Subscription
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        let token = self.subscribers.insert(id, Arc::new(callback));
        Subscription::new(token, &self.subscribers)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Wait for like requests that are still on the wire.
    pub async fn settle(&self) {
        let pending = std::mem::take(&mut *lock::lock(&self.outbound, "settle"));
        for task in pending {
            if let Err(error) = task.await {
                warn!(%error, "like request task failed");
            }
        }
    }

    fn fresh(&self, id: &DocumentId) -> Option<Document> {
        let mut index = lock::write(&self.index, "fresh");
        let key = index.resolve(id)?;
        let entry = index.entries.get(&key)?;
        (entry.fetched_at.elapsed() < self.config.ttl).then(|| entry.document.clone())
    }

    fn next_epoch(&self) -> Epoch {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn issue(&self, alias: &str) -> Epoch {
        let ticket = self.next_epoch();
        lock::lock(&self.issued, "issue").insert(alias.to_string(), ticket);
        ticket
    }

    /// True when a request newer than `ticket` was issued under the same alias.
    fn superseded(&self, alias: &str, ticket: Epoch) -> bool {
        let mut issued = lock::lock(&self.issued, "superseded");
        match issued.get(alias).copied() {
            Some(latest) if latest > ticket => true,
            Some(_) => {
                issued.remove(alias);
                false
            }
            None => false,
        }
    }

    fn apply(&self, alias: &str, ticket: Epoch, envelope: NoteEnvelope) -> Document {
        let NoteEnvelope { data, prev, next } = envelope;
        let document = Document::from(data);
        let relation = Relation {
            previous: prev.map(Sibling::from),
            next: next.map(Sibling::from),
        };

        let applied = !self.superseded(alias, ticket) && {
            let mut index = lock::write(&self.index, "apply");
            let newer_applied = index
                .entries
                .peek(&document.id)
                .is_some_and(|entry| entry.epoch > ticket);
            if !newer_applied {
                let entry = CacheEntry {
                    document: document.clone(),
                    fetched_at: Instant::now(),
                    epoch: ticket,
                };
                index.insert(entry, Some(relation));
            }
            !newer_applied
        };

        if applied {
            self.emit(&document.id, document.nid, EventKind::Replaced);
        } else {
            counter!(METRIC_CACHE_STALE_WRITE).increment(1);
            info!(
                key = %document.id,
                nid = document.nid,
                ticket,
                "discarded response superseded by a newer request"
            );
        }
        document
    }

    fn emit(&self, key: &str, nid: u64, kind: EventKind) {
        let callbacks = self.subscribers.matching(key, nid);
        if callbacks.is_empty() {
            return;
        }
        let event = CacheEvent::new(self.next_epoch(), key, nid, kind);
        for callback in callbacks {
            callback(&event);
        }
    }

    fn send_like(&self, nid: u64) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(nid, "no async runtime available; like kept locally only");
            return;
        };
        let gateway = Arc::clone(&self.gateway);
        let handle = runtime.spawn(async move {
            if let Err(error) = gateway.like_note(nid).await {
                warn!(nid, %error, "failed to record like");
            }
        });
        let mut outbound = lock::lock(&self.outbound, "send_like");
        outbound.retain(|task| !task.is_finished());
        outbound.push(handle);
    }
}

fn alias_of(id: &DocumentId) -> String {
    match id {
        DocumentId::Seq(nid) => format!("nid:{nid}"),
        DocumentId::Key(key) => format!("key:{key}"),
    }
}
