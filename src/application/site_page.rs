//! Page unit for standalone pages addressed by slug. Not cached.

use std::sync::Arc;

use async_trait::async_trait;
use folio_api_types::PageDto;
use tracing::{instrument, warn};

use crate::application::error::FetchError;
use crate::application::loader::PageUnit;
use crate::application::ports::PageGateway;
use crate::application::route::{Route, RouteContext};

pub struct SitePage {
    gateway: Arc<dyn PageGateway>,
}

impl SitePage {
    pub fn new(gateway: Arc<dyn PageGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl PageUnit for SitePage {
    type Props = PageDto;

    #[instrument(skip(self, ctx), fields(marker = ctx.marker()))]
    async fn load_initial_data(&self, ctx: &RouteContext) -> Result<PageDto, FetchError> {
        let Route::Page(slug) = ctx.route() else {
            return Err(FetchError::local(format!(
                "`{}` does not address a page",
                ctx.path()
            )));
        };
        let envelope = self.gateway.page_by_slug(slug).await.map_err(|error| {
            let error = FetchError::classify(error, false);
            warn!(%slug, error = %error, "page fetch failed");
            error
        })?;
        Ok(envelope.data)
    }
}
