//! Content API gateway backed by [`Ctx`].

use std::time::Duration;

use async_trait::async_trait;
use folio_api_types::{NoteEnvelope, PageEnvelope};
use reqwest::Url;

use crate::application::ports::{GatewayError, NoteGateway, PageGateway};
use crate::domain::DocumentId;
use crate::infra::error::InfraError;

use super::client::Ctx;

const NOTES: &str = "notes";
const PAGES: &str = "pages";
const LATEST: &str = "latest";

#[derive(Clone, Debug)]
pub struct HttpGateway {
    ctx: Ctx,
}

impl HttpGateway {
    pub fn new(base: &Url, timeout: Duration, token: Option<String>) -> Result<Self, InfraError> {
        Ok(Self {
            ctx: Ctx::new(base, timeout, token)?,
        })
    }
}

#[async_trait]
impl NoteGateway for HttpGateway {
    async fn note(
        &self,
        id: &DocumentId,
        password: Option<&str>,
    ) -> Result<NoteEnvelope, GatewayError> {
        let query: Vec<(&str, &str)> = password.map(|pw| ("password", pw)).into_iter().collect();
        match id {
            DocumentId::Seq(nid) => {
                self.ctx
                    .get(NOTES, Some("nid"))
                    .fetch(&nid.to_string(), &query)
                    .await
            }
            DocumentId::Key(key) => self.ctx.get(NOTES, None).fetch(key, &query).await,
        }
    }

    async fn latest_note(&self) -> Result<NoteEnvelope, GatewayError> {
        self.ctx.get(NOTES, None).fetch(LATEST, &[]).await
    }

    async fn like_note(&self, nid: u64) -> Result<(), GatewayError> {
        self.ctx
            .get(NOTES, Some("like"))
            .touch(&nid.to_string())
            .await
    }
}

#[async_trait]
impl PageGateway for HttpGateway {
    async fn page_by_slug(&self, slug: &str) -> Result<PageEnvelope, GatewayError> {
        self.ctx.get(PAGES, Some("slug")).fetch(slug, &[]).await
    }
}
