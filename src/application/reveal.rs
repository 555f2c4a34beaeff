//! Visibility gate for time-locked and password-locked notes.

use std::sync::{Arc, Mutex};

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::error::FetchError;
use crate::application::ports::{Notice, Notices};
use crate::cache::{FetchOptions, NoteStore, lock};
use crate::domain::{DocumentId, Note};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealState {
    Unlocked,
    TimeLocked { until: OffsetDateTime },
    PasswordLocked { id: DocumentId },
}

impl RevealState {
    pub fn is_unlocked(&self) -> bool {
        matches!(self, RevealState::Unlocked)
    }
}

/// Decide what the viewer may see of `note` at `now`.
///
/// Privileged viewers are never locked out.
pub fn evaluate(note: &Note, privileged: bool, now: OffsetDateTime) -> RevealState {
    if privileged {
        return RevealState::Unlocked;
    }
    match note {
        Note::PasswordRequired { id } => RevealState::PasswordLocked { id: id.clone() },
        Note::Resolved(document) => match document.secret_until {
            Some(until) if until > now => RevealState::TimeLocked { until },
            _ => RevealState::Unlocked,
        },
    }
}

struct GateState {
    current: RevealState,
    id: Option<DocumentId>,
    secret_until: Option<OffsetDateTime>,
    privileged: bool,
    generation: u64,
}

/// Reveal state of the displayed note, with the unlock timer it owns.
///
/// The timer is cancelled whenever the gate is re-armed and when the gate is dropped.
pub struct RevealGate {
    state: Arc<Mutex<GateState>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    notices: Arc<dyn Notices>,
}

impl RevealGate {
    pub fn new(notices: Arc<dyn Notices>) -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState {
                current: RevealState::Unlocked,
                id: None,
                secret_until: None,
                privileged: false,
                generation: 0,
            })),
            timer: Mutex::new(None),
            notices,
        }
    }

    pub fn state(&self) -> RevealState {
        lock::lock(&self.state, "reveal.state").current.clone()
    }

    /// Evaluate `note` and, for a time lock, schedule the automatic unlock.
    pub fn arm(&self, note: &Note, privileged: bool) -> RevealState {
        self.cancel();
        let now = OffsetDateTime::now_utc();
        let next = evaluate(note, privileged, now);
        let (id, secret_until) = armed_with(note);

        let generation = {
            let mut state = lock::lock(&self.state, "reveal.arm");
            if state.id.as_ref() != Some(&id) {
                debug!(%id, "reveal gate now tracks a different note");
            }
            state.generation += 1;
            state.current = next.clone();
            state.id = Some(id.clone());
            state.secret_until = secret_until;
            state.privileged = privileged;
            state.generation
        };

        if let RevealState::TimeLocked { until } = next {
            self.schedule_unlock(id, generation, until - now);
        }
        next
    }

    /// Re-arm when `note` differs from what the gate was last armed with.
    ///
    /// A refreshed copy of the same note with the same lock keeps the running timer.
    pub fn follow(&self, note: &Note, privileged: bool) -> RevealState {
        let (id, secret_until) = armed_with(note);
        {
            let state = lock::lock(&self.state, "reveal.follow");
            if state.id.as_ref() == Some(&id)
                && state.secret_until == secret_until
                && state.privileged == privileged
            {
                return state.current.clone();
            }
        }
        debug!(%id, "reveal inputs changed; re-arming");
        self.arm(note, privileged)
    }

    /// Try a password against the locked note; stays locked on any failure.
    pub async fn submit_password(
        &self,
        store: &NoteStore,
        password: &str,
    ) -> Result<RevealState, FetchError> {
        let (id, privileged) = {
            let state = lock::lock(&self.state, "reveal.submit_password");
            match &state.current {
                RevealState::PasswordLocked { id } => (id.clone(), state.privileged),
                _ => return Err(FetchError::local("note is not password locked")),
            }
        };

        match store
            .fetch_by_id(&id, Some(password), FetchOptions::forced())
            .await
        {
            Ok(note @ Note::Resolved(_)) => {
                info!(%id, "password accepted");
                Ok(self.arm(&note, privileged))
            }
            Ok(Note::PasswordRequired { .. }) => Ok(self.state()),
            Err(FetchError::InvalidPassword) => {
                info!(%id, "password rejected");
                self.notices.notify(Notice::InvalidPassword);
                Err(FetchError::InvalidPassword)
            }
            Err(error) => {
                warn!(%id, error = %error, "password check failed");
                self.notices
                    .notify(Notice::PasswordCheckFailed(error.to_string()));
                Err(error)
            }
        }
    }

    /// Stop any pending unlock timer.
    pub fn cancel(&self) {
        if let Some(handle) = lock::lock(&self.timer, "reveal.cancel").take() {
            handle.abort();
            debug!("unlock timer cancelled");
        }
    }

    fn schedule_unlock(&self, id: DocumentId, generation: u64, remaining: time::Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(%id, "no async runtime available; time lock will not expire on its own");
            return;
        };
        let delay = std::time::Duration::try_from(remaining).unwrap_or_default();
        let state = Arc::clone(&self.state);
        let notices = Arc::clone(&self.notices);
        debug!(%id, delay_ms = delay.as_millis() as u64, "unlock timer armed");

        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut state = lock::lock(&state, "reveal.timer");
                if state.generation != generation {
                    return;
                }
                state.current = RevealState::Unlocked;
            }
            info!(%id, "time lock expired");
            notices.notify(Notice::RefreshToUnlock);
        });
        *lock::lock(&self.timer, "reveal.schedule") = Some(handle);
    }
}

fn armed_with(note: &Note) -> (DocumentId, Option<OffsetDateTime>) {
    match note {
        Note::Resolved(document) => (DocumentId::Seq(document.nid), document.secret_until),
        Note::PasswordRequired { id } => (id.clone(), None),
    }
}

impl Drop for RevealGate {
    fn drop(&mut self) {
        self.cancel();
    }
}
