use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use prism_core::models::attachment::Attachment;
use prism_core::models::message::{Message, MessageStatus, new_message_id};
use prism_core::models::request::{ChatRequest, ChatTurn};
use prism_core::models::session::{Session, SessionSummary};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::consumer::StreamConsumer;
use crate::follow_up::FollowUpOrchestrator;
use crate::persistence::SessionPersistence;
use crate::source::{FragmentStream, ImageSource, ModelClient};
use crate::store::{ConversationStore, MessagePatch};

/// Result of one [`Conversation::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOutcome {
    pub assistant_id: Uuid,
    pub status: MessageStatus,
}

/// The controller a front-end talks to.
///
/// Owns the store and wires the model stream, widget extraction, follow-up
/// resolution and debounced persistence together. None of its operations
/// return errors: failures end up as message status and visible text.
#[derive(Clone)]
pub struct Conversation {
    store: ConversationStore,
    persistence: Arc<SessionPersistence>,
    model: Arc<dyn ModelClient>,
    follow_up: Arc<FollowUpOrchestrator>,
}

impl Conversation {
    pub fn new(
        user_key: impl Into<String>,
        model: Arc<dyn ModelClient>,
        images: Arc<dyn ImageSource>,
        persistence: SessionPersistence,
    ) -> Self {
        Self {
            store: ConversationStore::new(user_key),
            persistence: Arc::new(persistence),
            model,
            follow_up: Arc::new(FollowUpOrchestrator::new(images)),
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Adopt the user's most recent stored session, if there is one.
    ///
    /// Replies the previous run left in flight are settled and the repaired
    /// session is saved again.
    pub async fn resume(&self) -> bool {
        let user_key = self.store.user_key();
        match self.persistence.load_latest(&user_key).await {
            Some(session) => {
                self.adopt(session);
                true
            }
            None => false,
        }
    }

    /// Send a user message and stream the assistant reply into the store.
    ///
    /// The attachment is consumed whether or not the request succeeds.
    pub async fn send(&self, text: impl Into<String>, attachment: Option<Attachment>) -> SendOutcome {
        let text = text.into();
        let history: Vec<ChatTurn> = self
            .store
            .snapshot()
            .iter()
            .filter_map(ChatTurn::from_message)
            .collect();

        let mut user = Message::user(text.clone());
        if let Some(attachment) = &attachment {
            user.metadata = Some(serde_json::json!({
                "attachment": {
                    "filename": attachment.filename,
                    "mime_type": attachment.mime_type,
                    "size": attachment.bytes.len(),
                }
            }));
        }
        self.store.append(user);

        let assistant_id = new_message_id();
        self.store.append(Message::assistant_placeholder(assistant_id));
        self.autosave();

        let request = ChatRequest {
            history,
            prompt: text,
            attachment: attachment.map(Attachment::into_inline),
        };

        let fragments: FragmentStream = match self.model.open_stream(request).await {
            Ok(fragments) => fragments,
            Err(e) => stream::iter([Err(e)]).boxed(),
        };

        let result = StreamConsumer::new(assistant_id)
            .consume(fragments, |update| {
                self.store.update_by_id(update.message_id, update.into());
                self.autosave();
            })
            .await;

        let status = match result {
            Ok(outcome) => match outcome.follow_up().cloned() {
                Some(placeholder) => {
                    self.store
                        .update_by_id(assistant_id, MessagePatch::status(MessageStatus::Resolving));
                    self.autosave();
                    self.follow_up
                        .splice(&self.store, assistant_id, &placeholder)
                        .await
                        .unwrap_or(MessageStatus::Stalled)
                }
                None => {
                    self.store
                        .update_by_id(assistant_id, MessagePatch::status(MessageStatus::Complete));
                    MessageStatus::Complete
                }
            },
            Err(e) => {
                debug!(message_id = %assistant_id, error = %e, "reply failed");
                self.store
                    .update_by_id(assistant_id, MessagePatch::status(MessageStatus::Failed));
                MessageStatus::Failed
            }
        };

        self.autosave();
        SendOutcome {
            assistant_id,
            status,
        }
    }

    /// Start a fresh session. The previous snapshot stays in storage; a save
    /// still waiting out its delay is dropped.
    pub fn new_session(&self) -> Uuid {
        self.persistence.cancel_pending();
        self.store.reset()
    }

    /// Replace the current conversation with stored session `id`.
    pub async fn open_session(&self, id: Uuid) -> bool {
        let user_key = self.store.user_key();
        match self.persistence.load(&user_key, id).await {
            Ok(Some(session)) => {
                self.persistence.cancel_pending();
                self.adopt(session);
                info!(session_id = %id, "opened stored session");
                true
            }
            Ok(None) => {
                warn!(session_id = %id, "no stored session with this id");
                false
            }
            Err(e) => {
                warn!(session_id = %id, error = %e, "failed to open stored session");
                false
            }
        }
    }

    /// Stored sessions of the current user, newest first.
    pub async fn sessions(&self) -> Vec<SessionSummary> {
        let user_key = self.store.user_key();
        match self.persistence.list_sessions(&user_key).await {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(error = %e, "failed to list stored sessions");
                Vec::new()
            }
        }
    }

    /// Write the current session now instead of waiting for the debounce.
    pub async fn flush(&self) {
        if let Err(e) = self.persistence.save_now(self.store.session()).await {
            warn!(session_id = %self.store.session_id(), error = %e, "session flush failed");
        }
    }

    fn adopt(&self, session: Session) {
        if self.store.restore(session) > 0 {
            self.autosave();
        }
    }

    fn autosave(&self) {
        self.persistence.save_debounced(&self.store);
    }
}
