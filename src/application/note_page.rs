//! Page unit for `/notes/<id>` and `/notes/latest`.

use std::sync::Arc;

use async_trait::async_trait;
use folio_api_types::{LockedNoteDto, NoteDto, NoteProps};
use tracing::instrument;

use crate::application::error::FetchError;
use crate::application::loader::PageUnit;
use crate::application::route::{Route, RouteContext};
use crate::cache::{FetchOptions, NoteStore};
use crate::domain::{Document, DocumentId, Note};

pub struct NotePage {
    store: Arc<NoteStore>,
}

impl NotePage {
    pub fn new(store: Arc<NoteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PageUnit for NotePage {
    type Props = NoteProps;

    #[instrument(skip(self, ctx), fields(marker = ctx.marker()))]
    async fn load_initial_data(&self, ctx: &RouteContext) -> Result<NoteProps, FetchError> {
        match ctx.route() {
            Route::LatestNote => {
                let document = self.store.fetch_latest().await?;
                Ok(props_from_note(Note::Resolved(document)))
            }
            Route::Note(id) => {
                let note = self
                    .store
                    .fetch_by_id(id, ctx.password(), FetchOptions::forced())
                    .await?;
                Ok(props_from_note(note))
            }
            Route::Page(slug) => Err(FetchError::local(format!(
                "`{slug}` does not address a note"
            ))),
        }
    }
}

pub fn props_from_note(note: Note) -> NoteProps {
    match note {
        Note::Resolved(document) => NoteProps::Resolved(Box::new(NoteDto::from(document))),
        Note::PasswordRequired { id } => NoteProps::Locked(LockedNoteDto {
            id: id.to_string(),
            needs_password: true,
        }),
    }
}

pub fn note_from_props(props: NoteProps) -> Note {
    match props {
        NoteProps::Resolved(dto) => Note::Resolved(Document::from(*dto)),
        NoteProps::Locked(locked) => Note::PasswordRequired {
            id: DocumentId::parse(&locked.id),
        },
    }
}
