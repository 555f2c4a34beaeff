//! Plain-text views of the reader's frames.

use std::fmt;

use folio_api_types::PageDto;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

use crate::application::error::{ErrorView, StatusClass};
use crate::application::loader::Frame;
use crate::application::note_view::NoteViewModel;
use crate::application::reveal::RevealState;
use crate::application::route::{TIMELINE_PATH, note_path};
use crate::domain::{Document, Note, Sibling};

const RULE: &str = "----------------------------------------";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationLinkView {
    pub label: String,
    pub href: String,
}

impl NavigationLinkView {
    fn sibling(prefix: &str, sibling: &Sibling) -> Self {
        let title = if sibling.title.is_empty() {
            format!("#{}", sibling.nid)
        } else {
            sibling.title.clone()
        };
        Self {
            label: format!("{prefix} {title}"),
            href: note_path(sibling.nid),
        }
    }
}

impl fmt::Display for NavigationLinkView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.href)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FooterView {
    pub previous: Option<NavigationLinkView>,
    pub next: Option<NavigationLinkView>,
    pub timeline: NavigationLinkView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyView {
    Text(String),
    /// Reason the body is withheld.
    Withheld(String),
}

/// Everything printed for a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteScreen {
    pub title: String,
    pub banner: Option<String>,
    pub meta: Option<String>,
    pub stats: Option<String>,
    pub body: BodyView,
    pub liked: Option<bool>,
    pub footer: Option<FooterView>,
}

impl NoteScreen {
    pub fn new(model: &NoteViewModel, now: OffsetDateTime) -> Self {
        match &model.note {
            Note::PasswordRequired { id } => Self {
                title: format!("Note {id}"),
                banner: None,
                meta: None,
                stats: None,
                body: BodyView::Withheld(
                    "This note is protected. Run again with --password <PASSWORD>.".to_string(),
                ),
                liked: None,
                footer: None,
            },
            Note::Resolved(document) => Self::resolved(model, document, now),
        }
    }

    fn resolved(model: &NoteViewModel, document: &Document, now: OffsetDateTime) -> Self {
        let body = match &model.reveal {
            RevealState::TimeLocked { until } => BodyView::Withheld(format!(
                "This note unlocks at {}.",
                until.format(&Rfc3339).unwrap_or_default()
            )),
            RevealState::PasswordLocked { .. } => {
                BodyView::Withheld("This note is protected.".to_string())
            }
            RevealState::Unlocked => BodyView::Text(document.body.clone()),
        };

        let mut banners = Vec::new();
        if document.hidden {
            banners.push("hidden from visitors".to_string());
        }
        if model.privileged && document.is_secret_at(now) {
            banners.push(format!(
                "visitors see this from {}",
                document
                    .secret_until
                    .and_then(|until| until.format(&Rfc3339).ok())
                    .unwrap_or_default()
            ));
        }

        let meta = [document.mood.as_deref(), document.weather.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();

        let relation = &model.relation;
        Self {
            title: document.title.clone(),
            banner: (!banners.is_empty()).then(|| banners.join("; ")),
            meta: (!meta.is_empty()).then(|| meta.join(" · ")),
            stats: Some(stats_line(document)),
            body,
            liked: Some(model.liked),
            footer: Some(FooterView {
                previous: relation
                    .previous
                    .as_ref()
                    .map(|sibling| NavigationLinkView::sibling("<-", sibling)),
                next: relation
                    .next
                    .as_ref()
                    .map(|sibling| NavigationLinkView::sibling("->", sibling)),
                timeline: NavigationLinkView {
                    label: "Timeline".to_string(),
                    href: TIMELINE_PATH.to_string(),
                },
            }),
        }
    }
}

impl fmt::Display for NoteScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        if let Some(banner) = &self.banner {
            writeln!(f, "[{banner}]")?;
        }
        if let Some(meta) = &self.meta {
            writeln!(f, "{meta}")?;
        }
        writeln!(f, "{RULE}")?;
        match &self.body {
            BodyView::Text(text) => writeln!(f, "{}", text.trim_end())?,
            BodyView::Withheld(reason) => writeln!(f, "({reason})")?,
        }
        writeln!(f, "{RULE}")?;
        if let Some(stats) = &self.stats {
            writeln!(f, "{stats}")?;
        }
        if let Some(liked) = self.liked {
            writeln!(f, "{}", if liked { "[liked]" } else { "[not liked]" })?;
        }
        if let Some(footer) = &self.footer {
            if let Some(previous) = &footer.previous {
                writeln!(f, "{previous}")?;
            }
            if let Some(next) = &footer.next {
                writeln!(f, "{next}")?;
            }
            writeln!(f, "{}", footer.timeline)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageScreen {
    pub title: String,
    pub subtitle: Option<String>,
    pub text: String,
}

impl From<&PageDto> for PageScreen {
    fn from(page: &PageDto) -> Self {
        Self {
            title: page.title.clone(),
            subtitle: page.subtitle.clone().filter(|s| !s.is_empty()),
            text: page.text.clone(),
        }
    }
}

impl fmt::Display for PageScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        if let Some(subtitle) = &self.subtitle {
            writeln!(f, "{subtitle}")?;
        }
        writeln!(f, "{RULE}")?;
        writeln!(f, "{}", self.text.trim_end())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl From<&ErrorView> for ErrorPageView {
    fn from(view: &ErrorView) -> Self {
        let title = match view.status {
            StatusClass::Code(404) => "404 Not Found".to_string(),
            StatusClass::Code(403) => "403 Forbidden".to_string(),
            status => status.to_string(),
        };
        Self {
            title,
            message: view.message.clone(),
        }
    }
}

impl fmt::Display for ErrorPageView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", self.message)
    }
}

/// Text for a loader frame; `render` draws the page itself.
pub fn render_frame<P>(frame: &Frame<P>, render: impl FnOnce(Option<&P>) -> String) -> String {
    match frame {
        Frame::Loading => "Loading...\n".to_string(),
        Frame::Error(view) => ErrorPageView::from(view).to_string(),
        Frame::Page(props) => render(props.as_ref()),
    }
}

fn stats_line(document: &Document) -> String {
    let format = format_description!("[year]-[month]-[day] [weekday]");
    let created = document.created_at.format(format).unwrap_or_default();
    let mut line = format!("Created {created}");
    if let Some(modified) = document.modified_at {
        let modified = modified.format(format).unwrap_or_default();
        line.push_str(&format!(", modified {modified}"));
    }
    line.push_str(&format!(
        ", {} words, {} reads, {} likes",
        word_count(&document.body),
        document.read_count,
        document.like_count
    ));
    line
}

/// Whitespace-separated words, with each CJK character counted on its own.
fn word_count(text: &str) -> usize {
    text.split_whitespace()
        .map(|token| {
            let cjk = token.chars().filter(|c| is_cjk(*c)).count();
            let rest = token
                .split(is_cjk)
                .filter(|part| part.chars().any(char::is_alphanumeric))
                .count();
            cjk + rest
        })
        .sum()
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30ff}'
        | '\u{3400}'..='\u{4dbf}'
        | '\u{4e00}'..='\u{9fff}'
        | '\u{ac00}'..='\u{d7af}'
        | '\u{f900}'..='\u{faff}')
}
