//! Controller for a mounted note view.
//!
//! Mounting seeds the store from the handoff props, subscribes to the
//! displayed note, resolves the `latest` alias, fills in missing sibling
//! relations, hands the note's tracks to the playlist and arms the reveal
//! gate. Unmounting releases all of it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use folio_api_types::NoteProps;
use tracing::{debug, info, instrument, warn};

use crate::application::error::FetchError;
use crate::application::note_page::note_from_props;
use crate::application::notifier::{Change, ChangeNotifier};
use crate::application::ports::{Navigator, Notices, Playlist, Session};
use crate::application::reveal::{RevealGate, RevealState};
use crate::application::route::{RouteContext, note_path};
use crate::cache::{FetchOptions, NoteStore, Subscription, lock};
use crate::domain::{Document, DocumentId, Note, Relation};

/// Collaborators a note view talks to.
#[derive(Clone)]
pub struct ViewContext {
    pub store: Arc<NoteStore>,
    pub session: Arc<dyn Session>,
    pub navigator: Arc<dyn Navigator>,
    pub notices: Arc<dyn Notices>,
    pub playlist: Arc<dyn Playlist>,
}

/// Everything the renderer needs for one frame of the note view.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteViewModel {
    pub note: Note,
    pub reveal: RevealState,
    pub relation: Relation,
    pub liked: bool,
    pub privileged: bool,
    /// Outcome of comparing this frame with the previous one.
    pub change: Option<Change>,
}

struct Mounted {
    id: DocumentId,
    _subscription: Subscription,
}

pub struct NoteView {
    ctx: ViewContext,
    gate: RevealGate,
    notifier: ChangeNotifier,
    mounted: Mutex<Option<Mounted>>,
    revision: Arc<AtomicU64>,
    rendered: AtomicU64,
}

impl NoteView {
    pub fn new(ctx: ViewContext) -> Self {
        let gate = RevealGate::new(Arc::clone(&ctx.notices));
        let notifier = ChangeNotifier::new(Arc::clone(&ctx.navigator), Arc::clone(&ctx.notices));
        Self {
            ctx,
            gate,
            notifier,
            mounted: Mutex::new(None),
            revision: Arc::new(AtomicU64::new(0)),
            rendered: AtomicU64::new(0),
        }
    }

    #[instrument(skip(self, route, props), fields(marker = route.marker()))]
    pub async fn mount(&self, route: &RouteContext, props: NoteProps) -> NoteViewModel {
        let note = note_from_props(props);
        let privileged = self.ctx.session.is_privileged();

        let id = match &note {
            Note::Resolved(document) => {
                let id = DocumentId::Seq(document.nid);
                if self.ctx.store.get(&id).is_none() {
                    self.ctx.store.add(document.clone());
                }
                id
            }
            Note::PasswordRequired { id } => id.clone(),
        };
        self.attach(id.clone());

        if let Note::Resolved(document) = &note {
            if route.is_latest() {
                let target = note_path(document.nid);
                info!(%target, "resolved latest alias");
                self.ctx.navigator.navigate(&target);
            }
            if !self.ctx.store.has_relation(&id) {
                self.refresh_relation(&id).await;
            }
            self.start_playlist(document);
        }

        // The relation refresh may have stored a newer copy than the props.
        let note = if matches!(note, Note::Resolved(_)) {
            self.ctx.store.get(&id).map(Note::Resolved).unwrap_or(note)
        } else {
            note
        };
        self.gate.arm(&note, privileged);
        self.render()
            .unwrap_or_else(|| self.model(note, privileged, None))
    }

    /// Build the current frame from the store, running change detection.
    pub fn render(&self) -> Option<NoteViewModel> {
        let id = lock::lock(&self.mounted, "view.render")
            .as_ref()
            .map(|mounted| mounted.id.clone())?;
        self.rendered
            .store(self.revision.load(Ordering::SeqCst), Ordering::SeqCst);
        let privileged = self.ctx.session.is_privileged();

        match self.ctx.store.get(&id) {
            Some(document) => {
                let change = self.notifier.observe(&document, privileged);
                let note = Note::Resolved(document);
                self.gate.follow(&note, privileged);
                Some(self.model(note, privileged, Some(change)))
            }
            None => match self.gate.state() {
                RevealState::PasswordLocked { id } => {
                    Some(self.model(Note::PasswordRequired { id }, privileged, None))
                }
                _ => None,
            },
        }
    }

    /// Whether the store changed the displayed note since the last render.
    pub fn has_changes(&self) -> bool {
        self.revision.load(Ordering::SeqCst) != self.rendered.load(Ordering::SeqCst)
    }

    /// Re-fetch the displayed note, bypassing the cache.
    pub async fn refresh(&self) -> Result<(), FetchError> {
        let Some(id) = self.current_id() else {
            return Ok(());
        };
        self.ctx
            .store
            .fetch_by_id(&id, None, FetchOptions::forced())
            .await
            .map(|_| ())
    }

    /// Refresh, then return a frame only when the viewer has something new to see.
    pub async fn poll(&self) -> Result<Option<NoteViewModel>, FetchError> {
        self.refresh().await?;
        if !self.has_changes() {
            return Ok(None);
        }
        Ok(self
            .render()
            .filter(|model| model.change != Some(Change::Unchanged)))
    }

    pub async fn submit_password(&self, password: &str) -> Result<NoteViewModel, FetchError> {
        self.gate.submit_password(&self.ctx.store, password).await?;
        if let Some(id) = self.current_id()
            && let Some(document) = self.ctx.store.get(&id)
        {
            self.start_playlist(&document);
        }
        self.render()
            .ok_or_else(|| FetchError::local("no note is mounted"))
    }

    /// Toggle the like marker of the displayed note.
    pub fn like(&self) -> Option<bool> {
        let id = self.current_id()?;
        let document = self.ctx.store.get(&id)?;
        Some(self.ctx.store.like(document.nid))
    }

    pub fn reveal_state(&self) -> RevealState {
        self.gate.state()
    }

    #[instrument(skip(self))]
    pub fn unmount(&self) {
        let released = lock::lock(&self.mounted, "view.unmount").take();
        if let Some(mounted) = released {
            debug!(id = %mounted.id, "note view unmounted");
        }
        self.gate.cancel();
        self.notifier.reset();
        self.ctx.playlist.empty();
    }

    fn current_id(&self) -> Option<DocumentId> {
        lock::lock(&self.mounted, "view.current_id")
            .as_ref()
            .map(|mounted| mounted.id.clone())
    }

    fn attach(&self, id: DocumentId) {
        let mut mounted = lock::lock(&self.mounted, "view.attach");
        if mounted.as_ref().is_some_and(|current| current.id == id) {
            return;
        }
        let revision = Arc::clone(&self.revision);
        let subscription = self.ctx.store.subscribe(id.clone(), move |event| {
            debug!(key = %event.key, epoch = event.epoch, "displayed note changed");
            revision.fetch_add(1, Ordering::SeqCst);
        });
        // Replacing drops the previous subscription.
        *mounted = Some(Mounted {
            id,
            _subscription: subscription,
        });
    }

    async fn refresh_relation(&self, id: &DocumentId) {
        debug!(%id, "relation unknown; refreshing");
        if let Err(error) = self
            .ctx
            .store
            .fetch_by_id(id, None, FetchOptions::forced())
            .await
        {
            warn!(%id, error = %error, "failed to load sibling relation");
        }
    }

    fn start_playlist(&self, document: &Document) {
        let tracks = document.playable_tracks();
        if !tracks.is_empty() {
            self.ctx.playlist.set_playlist(tracks);
        }
    }

    fn model(&self, note: Note, privileged: bool, change: Option<Change>) -> NoteViewModel {
        let (relation, liked) = match &note {
            Note::Resolved(document) => (
                self.ctx
                    .store
                    .relation(&DocumentId::Seq(document.nid))
                    .unwrap_or_default(),
                self.ctx.store.is_liked(document.nid),
            ),
            Note::PasswordRequired { .. } => (Relation::default(), false),
        };
        NoteViewModel {
            reveal: self.gate.state(),
            note,
            relation,
            liked,
            privileged,
            change,
        }
    }
}

impl Drop for NoteView {
    fn drop(&mut self) {
        if lock::lock(&self.mounted, "view.drop").is_some() {
            self.unmount();
        }
    }
}
