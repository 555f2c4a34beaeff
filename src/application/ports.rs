//! Collaborator traits the core consumes: the remote gateway, session,
//! navigation, user notices, and the playback queue.

use std::fmt;

use async_trait::async_trait;
use folio_api_types::{NoteEnvelope, PageEnvelope};
use thiserror::Error;

use crate::domain::DocumentId;

/// Classified failure raised by the remote gateway.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("remote responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("request did not complete: {0}")]
    Transport(String),
    #[error("response could not be decoded: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// HTTP status code when the remote produced a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }
}

#[async_trait]
pub trait NoteGateway: Send + Sync {
    /// Fetch a note with its neighbours. `password` unlocks protected notes.
    async fn note(
        &self,
        id: &DocumentId,
        password: Option<&str>,
    ) -> Result<NoteEnvelope, GatewayError>;

    /// Fetch the most recent note.
    async fn latest_note(&self) -> Result<NoteEnvelope, GatewayError>;

    /// Record a like for the note with sequence number `nid`.
    async fn like_note(&self, nid: u64) -> Result<(), GatewayError>;
}

#[async_trait]
pub trait PageGateway: Send + Sync {
    async fn page_by_slug(&self, slug: &str) -> Result<PageEnvelope, GatewayError>;
}

/// Read-only view of the viewer's session.
pub trait Session: Send + Sync {
    fn is_privileged(&self) -> bool;
}

/// Route provider the core redirects through.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// User-visible notices raised by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The displayed note changed on the server.
    Updated,
    /// The displayed note was hidden and the viewer may not see it.
    Removed,
    /// A time lock expired; the page must be reloaded to show the body.
    RefreshToUnlock,
    /// A submitted password was rejected.
    InvalidPassword,
    /// A password submission failed for another reason.
    PasswordCheckFailed(String),
}

impl Notice {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Notice::Removed | Notice::InvalidPassword | Notice::PasswordCheckFailed(_)
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Updated => f.write_str("This note has been updated."),
            Notice::Removed => f.write_str("This note was deleted or hidden."),
            Notice::RefreshToUnlock => f.write_str("Refresh to read the unlocked note."),
            Notice::InvalidPassword => f.write_str("Wrong password."),
            Notice::PasswordCheckFailed(reason) => {
                write!(f, "Could not check the password: {reason}")
            }
        }
    }
}

pub trait Notices: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Playback queue owned by the surrounding application.
pub trait Playlist: Send + Sync {
    fn set_playlist(&self, tracks: Vec<u64>);
    fn empty(&self);
}
