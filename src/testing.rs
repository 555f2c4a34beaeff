//! Test doubles shared by unit tests across the crate.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use folio_api_types::{NoteDto, NoteEnvelope, NoteSiblingDto, PageDto, PageEnvelope};
use time::macros::datetime;

use crate::application::ports::{
    GatewayError, Navigator, NoteGateway, Notice, Notices, PageGateway, Playlist, Session,
};
use crate::domain::{Document, DocumentId};

pub(crate) fn document(nid: u64) -> Document {
    Document {
        id: format!("key-{nid}"),
        nid,
        title: "Morning".to_string(),
        body: "Coffee first.".to_string(),
        created_at: datetime!(2024-05-01 07:00:00 UTC),
        modified_at: None,
        hidden: false,
        secret_until: None,
        allows_password: false,
        read_count: 1,
        like_count: 0,
        mood: None,
        weather: None,
        music: Vec::new(),
        bookmarked: false,
        allow_comment: true,
    }
}

pub(crate) fn envelope(document: Document) -> NoteEnvelope {
    NoteEnvelope {
        data: NoteDto::from(document),
        prev: None,
        next: None,
    }
}

pub(crate) fn sibling(nid: u64) -> NoteSiblingDto {
    NoteSiblingDto {
        id: format!("key-{nid}"),
        nid,
        title: format!("Note {nid}"),
    }
}

pub(crate) fn page(slug: &str) -> PageEnvelope {
    PageEnvelope {
        data: PageDto {
            id: format!("page-{slug}"),
            slug: slug.to_string(),
            title: "About".to_string(),
            subtitle: None,
            text: "Hello.".to_string(),
            created: datetime!(2024-01-01 00:00:00 UTC),
            modified: None,
        },
    }
}

/// In-memory gateway with call counting, password checks and scripted replies.
#[derive(Default)]
pub(crate) struct MockGateway {
    notes: Mutex<HashMap<u64, NoteEnvelope>>,
    passwords: Mutex<HashMap<u64, String>>,
    failures: Mutex<HashMap<u64, GatewayError>>,
    scripted: Mutex<VecDeque<(Duration, NoteEnvelope)>>,
    pages: Mutex<HashMap<String, PageEnvelope>>,
    latest: Mutex<Option<u64>>,
    likes: Mutex<Vec<u64>>,
    fail_likes: AtomicBool,
    calls: AtomicUsize,
}

impl MockGateway {
    pub(crate) fn put(&self, envelope: NoteEnvelope) {
        self.notes
            .lock()
            .expect("notes")
            .insert(envelope.data.nid, envelope);
    }

    pub(crate) fn put_protected(&self, envelope: NoteEnvelope, password: &str) {
        self.passwords
            .lock()
            .expect("passwords")
            .insert(envelope.data.nid, password.to_string());
        self.put(envelope);
    }

    pub(crate) fn put_page(&self, envelope: PageEnvelope) {
        self.pages
            .lock()
            .expect("pages")
            .insert(envelope.data.slug.clone(), envelope);
    }

    pub(crate) fn fail(&self, nid: u64, error: GatewayError) {
        self.failures.lock().expect("failures").insert(nid, error);
    }

    pub(crate) fn fail_likes(&self) {
        self.fail_likes.store(true, Ordering::SeqCst);
    }

    /// Replies handed out in call order, each after its delay, ahead of stored notes.
    pub(crate) fn script(&self, replies: Vec<(Duration, NoteEnvelope)>) {
        self.scripted.lock().expect("scripted").extend(replies);
    }

    pub(crate) fn set_latest(&self, nid: u64) {
        *self.latest.lock().expect("latest") = Some(nid);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn likes(&self) -> Vec<u64> {
        self.likes.lock().expect("likes").clone()
    }

    fn lookup(&self, id: &DocumentId) -> Option<NoteEnvelope> {
        let notes = self.notes.lock().expect("notes");
        match id {
            DocumentId::Seq(nid) => notes.get(nid).cloned(),
            DocumentId::Key(key) => notes.values().find(|env| env.data.id == *key).cloned(),
        }
    }
}

#[async_trait]
impl NoteGateway for MockGateway {
    async fn note(
        &self,
        id: &DocumentId,
        password: Option<&str>,
    ) -> Result<NoteEnvelope, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self.scripted.lock().expect("scripted").pop_front();
        if let Some((delay, envelope)) = scripted {
            tokio::time::sleep(delay).await;
            return Ok(envelope);
        }

        if let DocumentId::Seq(nid) = id
            && let Some(error) = self.failures.lock().expect("failures").get(nid).cloned()
        {
            return Err(error);
        }

        let envelope = self
            .lookup(id)
            .ok_or_else(|| GatewayError::status(404, "not found"))?;
        let expected = self
            .passwords
            .lock()
            .expect("passwords")
            .get(&envelope.data.nid)
            .cloned();
        match (expected, password) {
            (None, _) => Ok(envelope),
            (Some(expected), Some(given)) if expected == given => Ok(envelope),
            (Some(_), _) => Err(GatewayError::status(403, "password required")),
        }
    }

    async fn latest_note(&self) -> Result<NoteEnvelope, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let nid = (*self.latest.lock().expect("latest"))
            .ok_or_else(|| GatewayError::status(404, "no notes"))?;
        self.lookup(&DocumentId::Seq(nid))
            .ok_or_else(|| GatewayError::status(404, "not found"))
    }

    async fn like_note(&self, nid: u64) -> Result<(), GatewayError> {
        if self.fail_likes.load(Ordering::SeqCst) {
            return Err(GatewayError::transport("connection reset"));
        }
        self.likes.lock().expect("likes").push(nid);
        Ok(())
    }
}

#[async_trait]
impl PageGateway for MockGateway {
    async fn page_by_slug(&self, slug: &str) -> Result<PageEnvelope, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .lock()
            .expect("pages")
            .get(slug)
            .cloned()
            .ok_or_else(|| GatewayError::status(404, "not found"))
    }
}

pub(crate) struct StaticSession(pub bool);

impl Session for StaticSession {
    fn is_privileged(&self) -> bool {
        self.0
    }
}

#[derive(Default)]
pub(crate) struct RecordingNavigator {
    paths: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub(crate) fn paths(&self) -> Vec<String> {
        self.paths.lock().expect("paths").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.paths.lock().expect("paths").push(path.to_string());
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotices {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotices {
    pub(crate) fn notices(&self) -> Vec<Notice> {
        self.notices.lock().expect("notices").clone()
    }
}

impl Notices for RecordingNotices {
    fn notify(&self, notice: Notice) {
        self.notices.lock().expect("notices").push(notice);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlaylistCall {
    Set(Vec<u64>),
    Empty,
}

#[derive(Default)]
pub(crate) struct RecordingPlaylist {
    calls: Mutex<Vec<PlaylistCall>>,
}

impl RecordingPlaylist {
    pub(crate) fn calls(&self) -> Vec<PlaylistCall> {
        self.calls.lock().expect("playlist").clone()
    }
}

impl Playlist for RecordingPlaylist {
    fn set_playlist(&self, tracks: Vec<u64>) {
        self.calls
            .lock()
            .expect("playlist")
            .push(PlaylistCall::Set(tracks));
    }

    fn empty(&self) {
        self.calls.lock().expect("playlist").push(PlaylistCall::Empty);
    }
}

/// Collaborators wired together the way a note view expects them.
pub(crate) struct Harness {
    pub gateway: Arc<MockGateway>,
    pub navigator: Arc<RecordingNavigator>,
    pub notices: Arc<RecordingNotices>,
    pub playlist: Arc<RecordingPlaylist>,
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            gateway: Arc::new(MockGateway::default()),
            navigator: Arc::new(RecordingNavigator::default()),
            notices: Arc::new(RecordingNotices::default()),
            playlist: Arc::new(RecordingPlaylist::default()),
        }
    }
}
