use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use prism_core::keys;
use prism_core::models::session::{Session, SessionSummary, TITLE_MAX_CHARS};
use prism_storage::KeyValueStore;
use prism_storage::json::{load_json, save_json};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::store::ConversationStore;

/// Quiet period after the last mutation before a session is written.
pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(1000);

/// The one outstanding delayed write.
///
/// The task sleeps until the latest deadline published on `deadline`. It
/// drops its receiver once the timer fires, so a failed send means the
/// snapshot has already been taken.
struct PendingSave {
    session_id: Uuid,
    source: ConversationStore,
    deadline: watch::Sender<Instant>,
    handle: JoinHandle<()>,
}

/// Durable, best-effort storage of conversation sessions.
///
/// Saves are trailing-edge debounced: each [`save_debounced`](Self::save_debounced)
/// call pushes back the single outstanding delayed write, so a burst of
/// mutations produces one write shortly after the burst settles. The session
/// is copied out of the store only when that write happens.
pub struct SessionPersistence {
    store: Arc<dyn KeyValueStore>,
    delay: Duration,
    title_max_chars: usize,
    pending: Mutex<Option<PendingSave>>,
}

impl SessionPersistence {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            delay: DEFAULT_SAVE_DELAY,
            title_max_chars: TITLE_MAX_CHARS,
            pending: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_title_max_chars(mut self, max_chars: usize) -> Self {
        self.title_max_chars = max_chars;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule a write of the session held by `source` once no newer call
    /// arrives for the configured delay. Must be called from within a Tokio
    /// runtime.
    ///
    /// While a write is pending this only moves its deadline. Sessions
    /// without messages at write time are never written.
    pub fn save_debounced(&self, source: &ConversationStore) {
        let deadline = Instant::now() + self.delay;
        let session_id = source.session_id();

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = pending.as_mut() {
            if current.source.shares_state(source) && current.deadline.send(deadline).is_ok() {
                current.session_id = session_id;
                return;
            }
        }
        if let Some(previous) = pending.take() {
            previous.handle.abort();
        }

        let (tx, rx) = watch::channel(deadline);
        let handle = tokio::spawn(write_when_quiet(
            Arc::clone(&self.store),
            source.clone(),
            rx,
            self.title_max_chars,
        ));

        *pending = Some(PendingSave {
            session_id,
            source: source.clone(),
            deadline: tx,
            handle,
        });
    }

    /// Abort the outstanding delayed write, if any. Returns the id of the
    /// session whose save was dropped.
    pub fn cancel_pending(&self) -> Option<Uuid> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = pending.take()?;
        previous.handle.abort();
        debug!(session_id = %previous.session_id, "pending session save cancelled");
        Some(previous.session_id)
    }

    /// Write `session` immediately, superseding any pending delayed write.
    pub async fn save_now(&self, mut session: Session) -> Result<(), PersistenceError> {
        self.cancel_pending();
        if session.messages.is_empty() {
            return Ok(());
        }
        session.ensure_title(self.title_max_chars);
        write_session(self.store.as_ref(), &session).await
    }

    /// The most recently modified session of `user_key`, if any can be read.
    ///
    /// Best-effort: storage failures and unreadable snapshots are logged and
    /// treated as absence.
    pub async fn load_latest(&self, user_key: &str) -> Option<Session> {
        let prefix = keys::sessions_prefix(user_key);
        let mut objects = match self.store.list(&prefix).await {
            Ok(objects) => objects,
            Err(e) => {
                warn!(user_key, error = %e, "could not list stored sessions");
                return None;
            }
        };

        objects.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| b.key.cmp(&a.key))
        });

        for object in objects {
            if keys::session_id_from_key(&object.key).is_none() {
                continue;
            }
            match load_json::<Session>(self.store.as_ref(), &object.key).await {
                Ok(Some(session)) => {
                    info!(
                        session_id = %session.id,
                        messages = session.messages.len(),
                        "restored latest session"
                    );
                    return Some(session);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(key = %object.key, error = %e, "skipping unreadable session snapshot");
                }
            }
        }

        debug!(user_key, "no stored session found");
        None
    }

    /// Load one session by id.
    pub async fn load(&self, user_key: &str, id: Uuid) -> Result<Option<Session>, PersistenceError> {
        let key = keys::session(user_key, id);
        Ok(load_json::<Session>(self.store.as_ref(), &key).await?)
    }

    /// Summaries of every readable session of `user_key`, newest first.
    pub async fn list_sessions(&self, user_key: &str) -> Result<Vec<SessionSummary>, PersistenceError> {
        let prefix = keys::sessions_prefix(user_key);
        let objects = self.store.list(&prefix).await?;

        let mut summaries = Vec::with_capacity(objects.len());
        for object in objects {
            if keys::session_id_from_key(&object.key).is_none() {
                continue;
            }
            match load_json::<Session>(self.store.as_ref(), &object.key).await {
                Ok(Some(session)) => summaries.push(session.summary()),
                Ok(None) => {}
                Err(e) => {
                    warn!(key = %object.key, error = %e, "skipping unreadable session snapshot");
                }
            }
        }

        summaries.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(summaries)
    }

}

impl Drop for SessionPersistence {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

/// Body of the delayed write: sleep until the deadline stops moving, then
/// copy the session out of `source` and store it.
async fn write_when_quiet(
    store: Arc<dyn KeyValueStore>,
    source: ConversationStore,
    mut deadline: watch::Receiver<Instant>,
    title_max_chars: usize,
) {
    let sleep = tokio::time::sleep_until(*deadline.borrow_and_update());
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            () = &mut sleep => break,
            changed = deadline.changed() => {
                if changed.is_err() {
                    return;
                }
                sleep.as_mut().reset(*deadline.borrow_and_update());
            }
        }
    }
    drop(deadline);

    let mut session = source.session();
    if session.messages.is_empty() {
        return;
    }
    session.ensure_title(title_max_chars);
    if let Err(e) = write_session(store.as_ref(), &session).await {
        warn!(session_id = %session.id, error = %e, "debounced session save failed");
    }
}

async fn write_session(store: &dyn KeyValueStore, session: &Session) -> Result<(), PersistenceError> {
    let key = keys::session(&session.user_key, session.id);
    save_json(store, &key, session).await?;
    debug!(session_id = %session.id, messages = session.messages.len(), "session saved");
    Ok(())
}
