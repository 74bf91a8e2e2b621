use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use prism_core::models::artifact::Artifact;
use prism_core::models::message::{Message, MessageStatus};
use prism_core::models::session::Session;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::consumer::StreamUpdate;
use crate::error::{INTERRUPTED_NOTICE, append_notice};

/// Field-level changes applied to one message by [`ConversationStore::update_by_id`].
///
/// `None` leaves a field alone. `artifact: Some(None)` clears the artifact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub artifact: Option<Option<Artifact>>,
    pub metadata: Option<Option<serde_json::Value>>,
    pub status: Option<MessageStatus>,
}

impl MessagePatch {
    pub fn status(status: MessageStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn artifact(artifact: Artifact) -> Self {
        Self {
            artifact: Some(Some(artifact)),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = Some(status);
        self
    }

    fn apply(self, message: &mut Message) {
        if let Some(content) = self.content {
            message.content = content;
        }
        if let Some(artifact) = self.artifact {
            message.artifact = artifact;
        }
        if let Some(metadata) = self.metadata {
            message.metadata = metadata;
        }
        if let Some(status) = self.status {
            message.status = status;
        }
    }
}

/// A stream update replaces content, artifact and metadata wholesale: each
/// update is derived from the full buffer, so the latest one wins.
impl From<StreamUpdate> for MessagePatch {
    fn from(update: StreamUpdate) -> Self {
        Self {
            content: Some(update.content),
            artifact: Some(update.artifact),
            metadata: Some(update.metadata),
            status: None,
        }
    }
}

struct StoreInner {
    session_id: Uuid,
    user_key: String,
    title: Option<String>,
    created_at: jiff::Timestamp,
    last_modified: jiff::Timestamp,
    messages: IndexMap<Uuid, Message>,
}

impl StoreInner {
    fn fresh(user_key: String) -> Self {
        let session = Session::new(user_key);
        Self::from_session(session)
    }

    fn from_session(session: Session) -> Self {
        Self {
            session_id: session.id,
            user_key: session.user_key,
            title: session.title,
            created_at: session.created_at,
            last_modified: session.last_modified,
            messages: session.messages.into_iter().map(|m| (m.id, m)).collect(),
        }
    }

    fn touch(&mut self) {
        self.last_modified = jiff::Timestamp::now();
    }
}

/// The in-memory conversation: messages in turn order, addressable by id.
///
/// Cloning yields another handle to the same conversation. Every mutation
/// bumps a revision counter observable through [`subscribe`](Self::subscribe).
/// Locks are held only for the duration of one in-place edit.
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<Mutex<StoreInner>>,
    revision: Arc<watch::Sender<u64>>,
}

impl ConversationStore {
    /// A new, empty session for `user_key`.
    pub fn new(user_key: impl Into<String>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Mutex::new(StoreInner::fresh(user_key.into()))),
            revision: Arc::new(revision),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    /// Receiver that changes whenever the conversation does.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn session_id(&self) -> Uuid {
        self.lock().session_id
    }

    pub fn user_key(&self) -> String {
        self.lock().user_key.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().messages.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<Message> {
        self.lock().messages.get(&id).cloned()
    }

    /// Add a message at the end. A message whose id is already present is
    /// rejected and `false` is returned.
    pub fn append(&self, message: Message) -> bool {
        {
            let mut inner = self.lock();
            if inner.messages.contains_key(&message.id) {
                warn!(message_id = %message.id, "ignoring append of duplicate message id");
                return false;
            }
            inner.messages.insert(message.id, message);
            inner.touch();
        }
        self.bump();
        true
    }

    /// Apply `patch` to the message with `id`, in place.
    ///
    /// Every other message keeps its position and value. An id that is not in
    /// the current session (for example one from before a reset) is a silent
    /// no-op and returns `false`.
    pub fn update_by_id(&self, id: Uuid, patch: MessagePatch) -> bool {
        {
            let mut inner = self.lock();
            let Some(message) = inner.messages.get_mut(&id) else {
                debug!(message_id = %id, "dropping update for unknown message");
                return false;
            };
            patch.apply(message);
            inner.touch();
        }
        self.bump();
        true
    }

    /// Drop all messages and start a new session id. Persisted snapshots are
    /// not touched.
    pub fn reset(&self) -> Uuid {
        let (old, new) = {
            let mut inner = self.lock();
            let old = inner.session_id;
            let user_key = std::mem::take(&mut inner.user_key);
            *inner = StoreInner::fresh(user_key);
            (old, inner.session_id)
        };
        info!(old_session = %old, new_session = %new, "conversation reset");
        self.bump();
        new
    }

    /// Adopt a previously persisted session in place of the current one.
    ///
    /// A snapshot written mid-reply can hold messages no process will ever
    /// finish: `Streaming` replies become `Failed` with the interrupted
    /// notice appended, `Resolving` ones become `Stalled`. Returns how many
    /// messages were settled this way.
    pub fn restore(&self, mut session: Session) -> usize {
        let mut settled = 0;
        for message in &mut session.messages {
            if settle_interrupted(message) {
                settled += 1;
            }
        }
        if settled > 0 {
            info!(session_id = %session.id, settled, "settled replies interrupted by a previous run");
        }
        {
            let mut inner = self.lock();
            *inner = StoreInner::from_session(session);
        }
        self.bump();
        settled
    }

    /// The most recent message.
    pub fn last(&self) -> Option<Message> {
        self.lock().messages.last().map(|(_, m)| m.clone())
    }

    /// Messages in turn order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.lock().messages.values().cloned().collect()
    }

    /// Whether `other` is a handle to this same conversation.
    pub(crate) fn shares_state(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// An owned copy of the whole session.
    pub fn session(&self) -> Session {
        let inner = self.lock();
        Session {
            id: inner.session_id,
            user_key: inner.user_key.clone(),
            title: inner.title.clone(),
            messages: inner.messages.values().cloned().collect(),
            created_at: inner.created_at,
            last_modified: inner.last_modified,
        }
    }
}

fn settle_interrupted(message: &mut Message) -> bool {
    match message.status {
        status if status.is_terminal() => false,
        MessageStatus::Resolving => {
            message.status = MessageStatus::Stalled;
            true
        }
        _ => {
            append_notice(&mut message.content, INTERRUPTED_NOTICE);
            message.status = MessageStatus::Failed;
            true
        }
    }
}
