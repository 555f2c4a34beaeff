//! Notices for server-side changes to the displayed note.

use std::sync::{Arc, Mutex};

use time::OffsetDateTime;
use tracing::{debug, info};

use crate::application::ports::{Navigator, Notice, Notices};
use crate::application::route::NOTES_PATH;
use crate::cache::lock;
use crate::domain::Document;

/// Fields whose change the viewer is told about.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    id: String,
    title: String,
    body: String,
    created_at: OffsetDateTime,
    modified_at: Option<OffsetDateTime>,
    mood: Option<String>,
    weather: Option<String>,
    hidden: bool,
}

impl From<&Document> for Snapshot {
    fn from(document: &Document) -> Self {
        Self {
            id: document.id.clone(),
            title: document.title.clone(),
            body: document.body.clone(),
            created_at: document.created_at,
            modified_at: document.modified_at,
            mood: document.mood.clone(),
            weather: document.weather.clone(),
            hidden: document.hidden,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// First observation, or a different document than before.
    Baseline,
    Unchanged,
    Updated,
    /// Became hidden for a viewer who may not see it; the view was navigated away.
    Removed,
}

pub struct ChangeNotifier {
    baseline: Mutex<Option<Snapshot>>,
    navigator: Arc<dyn Navigator>,
    notices: Arc<dyn Notices>,
}

impl ChangeNotifier {
    pub fn new(navigator: Arc<dyn Navigator>, notices: Arc<dyn Notices>) -> Self {
        Self {
            baseline: Mutex::new(None),
            navigator,
            notices,
        }
    }

    /// Compare `current` with the retained snapshot, notify, then keep `current` as baseline.
    pub fn observe(&self, current: &Document, privileged: bool) -> Change {
        let current = Snapshot::from(current);
        let previous = lock::lock(&self.baseline, "notifier.observe").replace(current.clone());

        let change = match previous {
            None => Change::Baseline,
            Some(previous) if previous.id != current.id => Change::Baseline,
            Some(previous) if previous == current => Change::Unchanged,
            Some(previous) if !previous.hidden && current.hidden && !privileged => Change::Removed,
            Some(_) => Change::Updated,
        };

        match change {
            Change::Baseline => debug!(id = %current.id, "change baseline recorded"),
            Change::Unchanged => {}
            Change::Removed => {
                info!(id = %current.id, "displayed note was hidden");
                self.navigator.navigate(NOTES_PATH);
                self.notices.notify(Notice::Removed);
            }
            Change::Updated => {
                info!(id = %current.id, "displayed note was updated");
                self.notices.notify(Notice::Updated);
            }
        }
        change
    }

    /// Forget the baseline, as when the view is torn down.
    pub fn reset(&self) {
        lock::lock(&self.baseline, "notifier.reset").take();
    }
}
