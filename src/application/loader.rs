//! Dual-mode data loading for page units.
//!
//! A page's initial data is produced once by the server pass and handed to
//! the interactive side inside a [`HandoffPayload`]. When the payload's
//! navigation marker matches the route being hydrated it is used as-is;
//! otherwise, and on every later navigation, the unit's loader runs again.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use folio_api_types::HandoffPayload;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::application::error::{ErrorView, FetchError};
use crate::application::route::RouteContext;
use crate::cache::lock;

/// A page-level render unit with an optional initial-data loader.
#[async_trait]
pub trait PageUnit: Send + Sync + 'static {
    type Props: Clone + Send + Sync + Serialize + DeserializeOwned + 'static;

    /// Units without a loader render straight away with no props.
    fn has_initial_data(&self) -> bool {
        true
    }

    async fn load_initial_data(&self, ctx: &RouteContext) -> Result<Self::Props, FetchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initial,
    Loading,
    Ready,
    Errored,
}

/// What the surrounding view should draw right now.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame<P> {
    Loading,
    Page(Option<P>),
    Error(ErrorView),
}

impl<P> Frame<P> {
    pub fn props(&self) -> Option<&P> {
        match self {
            Frame::Page(props) => props.as_ref(),
            Frame::Loading | Frame::Error(_) => None,
        }
    }
}

struct LoaderState<P> {
    phase: Phase,
    props: Option<P>,
    error: Option<ErrorView>,
    generation: u64,
    mounted: bool,
}

impl<P: Clone> LoaderState<P> {
    fn frame(&self) -> Frame<P> {
        match (&self.error, self.phase) {
            (Some(view), _) => Frame::Error(view.clone()),
            (None, Phase::Initial) => Frame::Loading,
            (None, Phase::Loading) if self.props.is_none() => Frame::Loading,
            (None, _) => Frame::Page(self.props.clone()),
        }
    }
}

/// Per-mount loader state machine wrapping one page unit.
pub struct DataLoader<U: PageUnit> {
    unit: Arc<U>,
    state: Arc<Mutex<LoaderState<U::Props>>>,
}

impl<U: PageUnit> Clone for DataLoader<U> {
    fn clone(&self) -> Self {
        Self {
            unit: Arc::clone(&self.unit),
            state: Arc::clone(&self.state),
        }
    }
}

impl<U: PageUnit> DataLoader<U> {
    pub fn new(unit: Arc<U>) -> Self {
        Self {
            unit,
            state: Arc::new(Mutex::new(LoaderState {
                phase: Phase::Initial,
                props: None,
                error: None,
                generation: 0,
                mounted: false,
            })),
        }
    }

    /// Run the loader the way the server pass does and tag the result with the route marker.
    ///
    /// Returns `None` when the unit declares no loader.
    #[instrument(skip(self, ctx), fields(marker = ctx.marker()))]
    pub async fn server_pass(
        &self,
        ctx: &RouteContext,
    ) -> Result<Option<HandoffPayload<U::Props>>, FetchError> {
        if !self.unit.has_initial_data() {
            return Ok(None);
        }
        let props = self.unit.load_initial_data(ctx).await?;
        info!("server pass produced handoff payload");
        Ok(Some(HandoffPayload::new(props, ctx.marker())))
    }

    /// First render of a navigation, optionally with a server-produced payload.
    #[instrument(skip(self, ctx, payload), fields(marker = ctx.marker()))]
    pub async fn hydrate(
        &self,
        ctx: &RouteContext,
        payload: Option<HandoffPayload<U::Props>>,
    ) -> Frame<U::Props> {
        {
            let mut state = lock::lock(&self.state, "loader.hydrate");
            state.mounted = true;
            if !self.unit.has_initial_data() {
                state.phase = Phase::Ready;
                state.props = None;
                state.error = None;
                debug!("unit has no loader; ready without props");
                return state.frame();
            }
        }

        match payload {
            Some(payload) if payload.marker == ctx.marker() => {
                let mut state = lock::lock(&self.state, "loader.hydrate");
                state.phase = Phase::Ready;
                state.props = Some(payload.props);
                state.error = None;
                info!("hydrated from handoff payload");
                state.frame()
            }
            Some(payload) => {
                debug!(payload_marker = %payload.marker, "handoff marker mismatch; loading");
                self.load(ctx).await
            }
            None => self.load(ctx).await,
        }
    }

    /// Client-side navigation to `ctx`; previously rendered props stay on screen while loading.
    #[instrument(skip(self, ctx), fields(marker = ctx.marker()))]
    pub async fn navigate(&self, ctx: &RouteContext) -> Frame<U::Props> {
        lock::lock(&self.state, "loader.navigate").mounted = true;
        if !self.unit.has_initial_data() {
            return self.frame();
        }
        self.load(ctx).await
    }

    pub fn frame(&self) -> Frame<U::Props> {
        lock::lock(&self.state, "loader.frame").frame()
    }

    pub fn phase(&self) -> Phase {
        lock::lock(&self.state, "loader.phase").phase
    }

    /// Results of loads still in flight are dropped once unmounted.
    pub fn unmount(&self) {
        let mut state = lock::lock(&self.state, "loader.unmount");
        state.mounted = false;
        state.generation += 1;
        debug!("loader unmounted");
    }

    async fn load(&self, ctx: &RouteContext) -> Frame<U::Props> {
        let generation = {
            let mut state = lock::lock(&self.state, "loader.load");
            state.generation += 1;
            state.phase = Phase::Loading;
            state.error = None;
            state.generation
        };

        let result = self.unit.load_initial_data(ctx).await;

        let mut state = lock::lock(&self.state, "loader.load");
        if !state.mounted || state.generation != generation {
            debug!(generation, "discarding result of superseded load");
            return state.frame();
        }
        match result {
            Ok(props) => {
                state.phase = Phase::Ready;
                state.props = Some(props);
            }
            Err(error) => {
                warn!(error = %error, "initial data load failed");
                state.phase = Phase::Errored;
                state.error = Some(ErrorView::from(&error));
            }
        }
        state.frame()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Notify;

    use super::*;
    use crate::application::error::StatusClass;
    use crate::application::ports::GatewayError;

    #[derive(Default)]
    struct EchoUnit {
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
        fail: Option<FetchError>,
    }

    #[async_trait]
    impl PageUnit for EchoUnit {
        type Props = String;

        async fn load_initial_data(&self, ctx: &RouteContext) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match &self.fail {
                Some(error) => Err(error.clone()),
                None => Ok(ctx.marker().to_string()),
            }
        }
    }

    struct StaticUnit;

    #[async_trait]
    impl PageUnit for StaticUnit {
        type Props = String;

        fn has_initial_data(&self) -> bool {
            false
        }

        async fn load_initial_data(&self, _ctx: &RouteContext) -> Result<String, FetchError> {
            Err(FetchError::local("static units have no loader"))
        }
    }

    fn route(raw: &str) -> RouteContext {
        RouteContext::parse(raw).expect("route")
    }

    #[tokio::test]
    async fn matching_marker_hydrates_without_loading() {
        let unit = Arc::new(EchoUnit::default());
        let loader = DataLoader::new(Arc::clone(&unit));
        let ctx = route("/notes/9");

        let payload = HandoffPayload::new("from server".to_string(), "/notes/9");
        let frame = loader.hydrate(&ctx, Some(payload)).await;

        assert_eq!(frame, Frame::Page(Some("from server".to_string())));
        assert_eq!(loader.phase(), Phase::Ready);
        assert_eq!(unit.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn mismatched_marker_loads_again() {
        let unit = Arc::new(EchoUnit::default());
        let loader = DataLoader::new(Arc::clone(&unit));

        let payload = HandoffPayload::new("stale".to_string(), "/notes/8");
        let frame = loader.hydrate(&route("/notes/9"), Some(payload)).await;

        assert_eq!(frame, Frame::Page(Some("/notes/9".to_string())));
        assert_eq!(unit.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn client_entry_without_payload_loads() {
        let unit = Arc::new(EchoUnit::default());
        let loader = DataLoader::new(Arc::clone(&unit));

        loader.hydrate(&route("/about"), None).await;
        assert_eq!(unit.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unit_without_loader_is_ready_without_props() {
        let loader = DataLoader::new(Arc::new(StaticUnit));
        let frame = loader.hydrate(&route("/about"), None).await;
        assert_eq!(frame, Frame::Page(None));
        assert_eq!(loader.phase(), Phase::Ready);
        assert_eq!(loader.server_pass(&route("/about")).await, Ok(None));
    }

    #[tokio::test]
    async fn failures_become_error_frames() {
        let unit = Arc::new(EchoUnit {
            fail: Some(FetchError::Remote(GatewayError::transport("timed out"))),
            ..Default::default()
        });
        let loader = DataLoader::new(unit);

        let frame = loader.hydrate(&route("/notes/1"), None).await;
        let Frame::Error(view) = frame else {
            panic!("expected error frame, got {frame:?}");
        };
        assert_eq!(view.status, StatusClass::Code(408));
        assert_eq!(loader.phase(), Phase::Errored);
    }

    #[tokio::test]
    async fn loading_indicator_only_without_previous_content() {
        let gate = Arc::new(Notify::new());
        let unit = Arc::new(EchoUnit {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        });
        let loader = DataLoader::new(unit);

        let first = tokio::spawn({
            let loader = loader.clone();
            async move { loader.hydrate(&route("/notes/1"), None).await }
        });
        tokio::task::yield_now().await;
        assert_eq!(loader.frame(), Frame::Loading);
        gate.notify_one();
        first.await.expect("first load");

        let second = tokio::spawn({
            let loader = loader.clone();
            async move { loader.navigate(&route("/notes/2")).await }
        });
        tokio::task::yield_now().await;
        assert_eq!(loader.phase(), Phase::Loading);
        assert_eq!(loader.frame(), Frame::Page(Some("/notes/1".to_string())));
        gate.notify_one();

        let frame = second.await.expect("second load");
        assert_eq!(frame, Frame::Page(Some("/notes/2".to_string())));
    }

    #[tokio::test]
    async fn results_after_unmount_are_discarded() {
        let gate = Arc::new(Notify::new());
        let unit = Arc::new(EchoUnit {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        });
        let loader = DataLoader::new(unit);

        let pending = tokio::spawn({
            let loader = loader.clone();
            async move { loader.hydrate(&route("/notes/1"), None).await }
        });
        tokio::task::yield_now().await;
        loader.unmount();
        gate.notify_one();

        assert_eq!(pending.await.expect("load"), Frame::Loading);
        assert_eq!(loader.phase(), Phase::Loading);
    }

    #[tokio::test]
    async fn server_pass_tags_payload_with_marker() {
        let loader = DataLoader::new(Arc::new(EchoUnit::default()));
        let payload = loader
            .server_pass(&route("/notes/9?password=x"))
            .await
            .expect("server pass")
            .expect("payload");
        assert_eq!(payload.marker, "/notes/9");
        assert_eq!(payload.props, "/notes/9");
    }
}
