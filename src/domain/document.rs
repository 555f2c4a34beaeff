//! Documents, their identifiers, and the placeholder shown for password-locked notes.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use folio_api_types::{CountDto, MusicDto, NoteDto, NoteSiblingDto};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::debug;

const PLAYABLE_PROVIDER: &str = "netease";

/// Identifier a route uses to address a document.
///
/// Numeric input addresses the document by sequence number; anything else is
/// treated as the document's opaque key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum DocumentId {
    Seq(u64),
    Key(String),
}

impl DocumentId {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<u64>() {
            Ok(nid) => Self::Seq(nid),
            Err(err) => {
                debug!(raw, reason = %err, "id is not a sequence number; using it as a key");
                Self::Key(raw.to_string())
            }
        }
    }
}

impl FromStr for DocumentId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seq(nid) => write!(f, "{nid}"),
            Self::Key(key) => f.write_str(key),
        }
    }
}

impl From<u64> for DocumentId {
    fn from(nid: u64) -> Self {
        Self::Seq(nid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    pub id: String,
    pub provider: String,
}

/// A fully resolved note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub nid: u64,
    pub title: String,
    pub body: String,
    pub created_at: OffsetDateTime,
    pub modified_at: Option<OffsetDateTime>,
    pub hidden: bool,
    pub secret_until: Option<OffsetDateTime>,
    pub allows_password: bool,
    pub read_count: u64,
    pub like_count: u64,
    pub mood: Option<String>,
    pub weather: Option<String>,
    pub music: Vec<Track>,
    pub bookmarked: bool,
    pub allow_comment: bool,
}

impl Document {
    /// Whether this document is the one `id` addresses.
    pub fn matches(&self, id: &DocumentId) -> bool {
        match id {
            DocumentId::Seq(nid) => self.nid == *nid,
            DocumentId::Key(key) => self.id == *key,
        }
    }

    /// True when the unlock time lies strictly after `now`.
    pub fn is_secret_at(&self, now: OffsetDateTime) -> bool {
        self.secret_until.is_some_and(|until| until > now)
    }

    /// Track ids the playlist collaborator can play.
    pub fn playable_tracks(&self) -> Vec<u64> {
        self.music
            .iter()
            .filter(|track| track.provider == PLAYABLE_PROVIDER && !track.id.is_empty())
            .filter_map(|track| track.id.parse::<u64>().ok())
            .collect()
    }
}

impl From<NoteDto> for Document {
    fn from(dto: NoteDto) -> Self {
        Self {
            id: dto.id,
            nid: dto.nid,
            title: dto.title,
            body: dto.text,
            created_at: dto.created,
            modified_at: dto.modified,
            hidden: dto.hide,
            secret_until: dto.secret,
            allows_password: dto.allows_password,
            read_count: dto.count.read,
            like_count: dto.count.like,
            mood: dto.mood,
            weather: dto.weather,
            music: dto
                .music
                .into_iter()
                .map(|music| Track {
                    id: music.id,
                    provider: music.kind,
                })
                .collect(),
            bookmarked: dto.has_memory,
            allow_comment: dto.allow_comment.unwrap_or(true),
        }
    }
}

impl From<Document> for NoteDto {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            nid: doc.nid,
            title: doc.title,
            text: doc.body,
            created: doc.created_at,
            modified: doc.modified_at,
            hide: doc.hidden,
            secret: doc.secret_until,
            allows_password: doc.allows_password,
            count: CountDto {
                read: doc.read_count,
                like: doc.like_count,
            },
            mood: doc.mood,
            weather: doc.weather,
            music: doc
                .music
                .into_iter()
                .map(|track| MusicDto {
                    id: track.id,
                    kind: track.provider,
                })
                .collect(),
            has_memory: doc.bookmarked,
            allow_comment: Some(doc.allow_comment),
        }
    }
}

/// Result of looking a note up: either the document or a request for a password.
///
/// A locked note carries nothing but the id it was requested under.
#[derive(Debug, Clone, PartialEq)]
pub enum Note {
    Resolved(Document),
    PasswordRequired { id: DocumentId },
}

impl Note {
    pub fn document(&self) -> Option<&Document> {
        match self {
            Note::Resolved(doc) => Some(doc),
            Note::PasswordRequired { .. } => None,
        }
    }

    pub fn needs_password(&self) -> bool {
        matches!(self, Note::PasswordRequired { .. })
    }
}

/// A neighbouring document in the note ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sibling {
    pub id: String,
    pub nid: u64,
    pub title: String,
}

impl From<NoteSiblingDto> for Sibling {
    fn from(dto: NoteSiblingDto) -> Self {
        Self {
            id: dto.id,
            nid: dto.nid,
            title: dto.title,
        }
    }
}

/// Previous/next pointers recorded alongside a cache entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Relation {
    pub previous: Option<Sibling>,
    pub next: Option<Sibling>,
}

impl Relation {
    pub fn is_empty(&self) -> bool {
        self.previous.is_none() && self.next.is_none()
    }
}
