use serde::{Deserialize, Serialize};

use super::artifact::Artifact;
use super::attachment::InlineData;
use super::message::{Message, MessageStatus, Role};

/// Text sent by a source whose credentials are missing, in place of a reply.
pub const CONFIG_ERROR_SENTINEL: &str = "MISSING_API_KEY";

/// One incremental piece of a streamed model reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn is_config_error(&self) -> bool {
        self.text == CONFIG_ERROR_SENTINEL
    }
}

/// A prior turn replayed to the model as context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

/// Everything a model client needs to open one streamed reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub history: Vec<ChatTurn>,
    pub prompt: String,
    pub attachment: Option<InlineData>,
}

impl ChatTurn {
    /// Build the replayed turn for a stored message.
    ///
    /// Failed replies, replies still in flight and empty messages are
    /// skipped. An artifact is summarised in one line so the model knows it
    /// already produced it.
    pub fn from_message(message: &Message) -> Option<Self> {
        if message.status == MessageStatus::Failed || !message.status.is_terminal() {
            return None;
        }

        let mut text = message.content.clone();
        if let Some(artifact) = &message.artifact {
            if !text.is_empty() {
                text.push_str("\n\n");
            }
            text.push_str(&artifact_summary(artifact));
        }

        if text.trim().is_empty() {
            return None;
        }

        Some(Self {
            role: message.role,
            text,
        })
    }
}

fn artifact_summary(artifact: &Artifact) -> String {
    format!("[{} widget: {}]", artifact.kind, artifact.title)
}
