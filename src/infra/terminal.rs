//! Collaborators for the terminal reader: session, navigation, notices and playlist.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::application::ports::{Navigator, Notice, Notices, Playlist, Session};
use crate::cache::lock;

/// Privileged when an API token was configured.
#[derive(Debug, Clone, Copy)]
pub struct TokenSession {
    privileged: bool,
}

impl TokenSession {
    pub fn new(token: Option<&str>) -> Self {
        Self {
            privileged: token.is_some_and(|token| !token.trim().is_empty()),
        }
    }
}

impl Session for TokenSession {
    fn is_privileged(&self) -> bool {
        self.privileged
    }
}

/// Shared line sink; stdout in the binary, a buffer in tests.
pub type Output = Arc<Mutex<dyn Write + Send>>;

pub fn stdout() -> Output {
    Arc::new(Mutex::new(std::io::stdout()))
}

fn emit(output: &Output, line: &str) {
    let mut out = lock::lock(output, "terminal.emit");
    if let Err(err) = writeln!(out, "{line}").and_then(|()| out.flush()) {
        warn!(reason = %err, "failed to write to terminal");
    }
}

/// Remembers the last navigation request so the reader loop can follow it.
pub struct TerminalNavigator {
    output: Output,
    pending: Mutex<Option<String>>,
}

impl TerminalNavigator {
    pub fn new(output: Output) -> Self {
        Self {
            output,
            pending: Mutex::new(None),
        }
    }

    pub fn take_redirect(&self) -> Option<String> {
        lock::lock(&self.pending, "navigator.take").take()
    }
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, path: &str) {
        info!(%path, "navigate");
        emit(&self.output, &format!("-> {path}"));
        *lock::lock(&self.pending, "navigator.navigate") = Some(path.to_string());
    }
}

pub struct TerminalNotices {
    output: Output,
}

impl TerminalNotices {
    pub fn new(output: Output) -> Self {
        Self { output }
    }
}

impl Notices for TerminalNotices {
    fn notify(&self, notice: Notice) {
        let prefix = if notice.is_error() { "!!" } else { "**" };
        debug!(?notice, "notice raised");
        emit(&self.output, &format!("{prefix} {notice}"));
    }
}

pub struct TerminalPlaylist {
    output: Output,
}

impl TerminalPlaylist {
    pub fn new(output: Output) -> Self {
        Self { output }
    }
}

impl Playlist for TerminalPlaylist {
    fn set_playlist(&self, tracks: Vec<u64>) {
        let ids: Vec<String> = tracks.iter().map(u64::to_string).collect();
        emit(&self.output, &format!("~ playlist: {}", ids.join(", ")));
    }

    fn empty(&self) {
        debug!("playlist emptied");
    }
}
