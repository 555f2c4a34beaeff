use std::{
    io::Write,
    path::{Path, PathBuf},
    process,
    sync::{Arc, PoisonError},
};

use folio::{
    application::{
        error::{AppError, FetchError},
        loader::{DataLoader, Frame, PageUnit},
        note_page::NotePage,
        note_view::{NoteView, ViewContext},
        ports::{NoteGateway, PageGateway},
        route::{NOTES_PATH, Route, RouteContext},
        site_page::SitePage,
    },
    cache::{CacheConfig, NoteStore},
    config::{self, Command, PrerenderArgs, ReadArgs, RouteArgs, Settings},
    domain::error::DomainError,
    infra::{
        error::InfraError,
        http::HttpGateway,
        telemetry,
        terminal::{self, Output, TerminalNavigator, TerminalNotices, TerminalPlaylist, TokenSession},
    },
    presentation::views::{NoteScreen, PageScreen, render_frame},
};
use folio_api_types::{HandoffPayload, NoteProps};
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    let route = route_context(cli_args.command.target())?;
    let reader = Reader::build(&settings)?;

    match cli_args.command {
        Command::Read(args) => run_read(&reader, &route, &args).await,
        Command::Watch(_) => run_watch(&reader, &route, &settings).await,
        Command::Prerender(args) => run_prerender(&reader, &route, &args).await,
    }
}

fn route_context(target: &RouteArgs) -> Result<RouteContext, DomainError> {
    let route = RouteContext::parse(&target.route)?;
    Ok(match target.password.as_deref() {
        Some(password) => route.with_password(password),
        None => route,
    })
}

/// Wired collaborators shared by every command.
struct Reader {
    store: Arc<NoteStore>,
    gateway: Arc<HttpGateway>,
    session: Arc<TokenSession>,
    navigator: Arc<TerminalNavigator>,
    notices: Arc<TerminalNotices>,
    playlist: Arc<TerminalPlaylist>,
    output: Output,
}

impl Reader {
    fn build(settings: &Settings) -> Result<Self, InfraError> {
        let token = settings.session.token.clone();
        let gateway = Arc::new(HttpGateway::new(
            &settings.gateway.base_url,
            settings.gateway.timeout,
            token.clone(),
        )?);
        let note_gateway: Arc<dyn NoteGateway> = gateway.clone();
        let store = Arc::new(NoteStore::new(
            CacheConfig::from(&settings.cache),
            note_gateway,
        ));
        let output = terminal::stdout();

        info!(
            base_url = %settings.gateway.base_url,
            privileged = token.is_some(),
            "reader initialised"
        );

        Ok(Self {
            store,
            gateway,
            session: Arc::new(TokenSession::new(token.as_deref())),
            navigator: Arc::new(TerminalNavigator::new(output.clone())),
            notices: Arc::new(TerminalNotices::new(output.clone())),
            playlist: Arc::new(TerminalPlaylist::new(output.clone())),
            output,
        })
    }

    fn view_context(&self) -> ViewContext {
        ViewContext {
            store: Arc::clone(&self.store),
            session: self.session.clone(),
            navigator: self.navigator.clone(),
            notices: self.notices.clone(),
            playlist: self.playlist.clone(),
        }
    }

    fn note_loader(&self) -> DataLoader<NotePage> {
        DataLoader::new(Arc::new(NotePage::new(Arc::clone(&self.store))))
    }

    fn page_loader(&self) -> DataLoader<SitePage> {
        let gateway: Arc<dyn PageGateway> = self.gateway.clone();
        DataLoader::new(Arc::new(SitePage::new(gateway)))
    }

    fn print(&self, text: &str) -> Result<(), AppError> {
        let mut out = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_all(text.as_bytes())
            .and_then(|()| out.flush())
            .map_err(InfraError::from)?;
        Ok(())
    }
}

async fn run_read(reader: &Reader, route: &RouteContext, args: &ReadArgs) -> Result<(), AppError> {
    if let Route::Page(_) = route.route() {
        let loader = reader.page_loader();
        let payload = read_handoff(args.handoff.as_deref())?;
        let frame = loader.hydrate(route, payload).await;
        let text = render_frame(&frame, |page| {
            page.map(|page| PageScreen::from(page).to_string())
                .unwrap_or_default()
        });
        loader.unmount();
        return reader.print(&text);
    }

    let loader = reader.note_loader();
    let payload = read_handoff::<NoteProps>(args.handoff.as_deref())?;
    let frame = loader.hydrate(route, payload).await;

    let props = match frame {
        Frame::Page(Some(props)) => props,
        other => {
            loader.unmount();
            return reader.print(&render_frame(&other, |_| String::new()));
        }
    };

    let view = NoteView::new(reader.view_context());
    view.mount(route, props).await;
    reader.navigator.take_redirect();

    if args.like {
        match view.like() {
            Some(liked) => info!(liked, "like toggled"),
            None => warn!("nothing to like on this note"),
        }
    }

    let result = match view.render() {
        Some(model) => reader.print(&NoteScreen::new(&model, OffsetDateTime::now_utc()).to_string()),
        None => Ok(()),
    };
    view.unmount();
    loader.unmount();
    reader.store.settle().await;
    result
}

async fn run_watch(reader: &Reader, route: &RouteContext, settings: &Settings) -> Result<(), AppError> {
    if let Route::Page(slug) = route.route() {
        return Err(DomainError::validation(format!(
            "`{slug}` is a page; only notes can be watched"
        ))
        .into());
    }

    let loader = reader.note_loader();
    let frame = loader.hydrate(route, None).await;
    let props = match frame {
        Frame::Page(Some(props)) => props,
        other => {
            loader.unmount();
            return reader.print(&render_frame(&other, |_| String::new()));
        }
    };

    let view = NoteView::new(reader.view_context());
    let model = view.mount(route, props).await;
    reader.navigator.take_redirect();
    reader.print(&NoteScreen::new(&model, OffsetDateTime::now_utc()).to_string())?;

    let mut interval = tokio::time::interval(settings.watch.interval);
    interval.tick().await;
    info!(interval_ms = settings.watch.interval.as_millis() as u64, "watching note");

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }

        let model = match view.poll().await {
            Ok(Some(model)) => model,
            Ok(None) => continue,
            Err(error @ FetchError::NotFound) => {
                warn!(error = %error, "watched note is gone");
                reader.print(&render_frame::<()>(
                    &Frame::Error((&error).into()),
                    |_| String::new(),
                ))?;
                break;
            }
            Err(error) => {
                warn!(error = %error, "refresh failed");
                continue;
            }
        };
        if reader.navigator.take_redirect().as_deref() == Some(NOTES_PATH) {
            break;
        }
        reader.print(&NoteScreen::new(&model, OffsetDateTime::now_utc()).to_string())?;
    }

    view.unmount();
    loader.unmount();
    Ok(())
}

async fn run_prerender(
    reader: &Reader,
    route: &RouteContext,
    args: &PrerenderArgs,
) -> Result<(), AppError> {
    match route.route() {
        Route::Page(_) => prerender(reader, &reader.page_loader(), route, args.output.as_ref()).await,
        Route::Note(_) | Route::LatestNote => {
            prerender(reader, &reader.note_loader(), route, args.output.as_ref()).await
        }
    }
}

async fn prerender<U: PageUnit>(
    reader: &Reader,
    loader: &DataLoader<U>,
    route: &RouteContext,
    output: Option<&PathBuf>,
) -> Result<(), AppError> {
    let Some(payload) = loader.server_pass(route).await? else {
        info!("route has no initial data; nothing to hand off");
        return Ok(());
    };
    let json = serde_json::to_string(&payload)
        .map_err(|err| InfraError::handoff(format!("failed to encode payload: {err}")))?;

    match output {
        Some(path) => {
            tokio::fs::write(path, json.as_bytes())
                .await
                .map_err(InfraError::from)?;
            info!(path = %path.display(), "handoff payload written");
            Ok(())
        }
        None => reader.print(&format!("{json}\n")),
    }
}

fn read_handoff<P>(path: Option<&Path>) -> Result<Option<HandoffPayload<P>>, InfraError>
where
    P: DeserializeOwned,
{
    let Some(path) = path else {
        return Ok(None);
    };
    let bytes = std::fs::read(path)?;
    let payload = serde_json::from_slice(&bytes).map_err(|err| {
        InfraError::handoff(format!("{} is not a handoff payload: {err}", path.display()))
    })?;
    Ok(Some(payload))
}
