use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::artifact::Artifact;

/// A single message in a conversation.
///
/// `content` is always the clean text: a completed widget fence never
/// appears here, it lives in `artifact` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: jiff::Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
    /// Grounding, citation or usage data reported alongside the text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub status: MessageStatus,
}

/// Role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    User,
    Assistant,
}

/// Lifecycle of a message as seen by the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MessageStatus {
    /// Fragments are still arriving.
    Streaming,
    /// The stream finished and a follow-up fetch is running.
    Resolving,
    #[default]
    Complete,
    /// The stream failed; `content` carries a visible notice.
    Failed,
    /// The follow-up fetch failed; the placeholder artifact is kept.
    Stalled,
}

impl MessageStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Stalled)
    }
}

/// Generate a message id. UUID v7 so ids sort by creation time.
pub fn new_message_id() -> Uuid {
    Uuid::now_v7()
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            role: Role::User,
            content: content.into(),
            timestamp: jiff::Timestamp::now(),
            artifact: None,
            metadata: None,
            status: MessageStatus::Complete,
        }
    }

    /// An empty assistant message that a stream will fill in.
    pub fn assistant_placeholder(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: String::new(),
            timestamp: jiff::Timestamp::now(),
            artifact: None,
            metadata: None,
            status: MessageStatus::Streaming,
        }
    }
}
