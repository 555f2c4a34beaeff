//! Set of notes the viewer has liked, optionally persisted as a JSON array.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, warn};

use super::lock;

pub struct LikedSet {
    ids: RwLock<BTreeSet<u64>>,
    path: Option<PathBuf>,
}

impl LikedSet {
    pub fn in_memory() -> Self {
        Self {
            ids: RwLock::new(BTreeSet::new()),
            path: None,
        }
    }

    /// Load from `path`; a missing or unreadable file starts empty.
    pub fn load(path: Option<PathBuf>) -> Self {
        let ids = path.as_deref().map(read_ids).unwrap_or_default();
        Self {
            ids: RwLock::new(ids),
            path,
        }
    }

    pub fn contains(&self, nid: u64) -> bool {
        lock::read(&self.ids, "liked.contains").contains(&nid)
    }

    /// Flip membership of `nid`; returns whether it is liked afterwards.
    pub fn toggle(&self, nid: u64) -> bool {
        let snapshot = {
            let mut ids = lock::write(&self.ids, "liked.toggle");
            if !ids.remove(&nid) {
                ids.insert(nid);
            }
            ids.clone()
        };
        self.persist(&snapshot);
        snapshot.contains(&nid)
    }

    fn persist(&self, ids: &BTreeSet<u64>) {
        let Some(path) = self.path.as_deref() else {
            return;
        };
        let result = serde_json::to_vec(ids)
            .map_err(|err| err.to_string())
            .and_then(|bytes| fs::write(path, bytes).map_err(|err| err.to_string()));
        if let Err(reason) = result {
            warn!(path = %path.display(), %reason, "failed to persist liked notes");
        }
    }
}

fn read_ids(path: &Path) -> BTreeSet<u64> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!(path = %path.display(), reason = %err, "liked notes file not loaded");
            return BTreeSet::new();
        }
    };
    serde_json::from_slice(&bytes).unwrap_or_else(|err| {
        warn!(path = %path.display(), reason = %err, "liked notes file is malformed; ignoring");
        BTreeSet::new()
    })
}
