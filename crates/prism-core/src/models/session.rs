use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::message::{Message, Role};

/// Character budget for derived session titles.
pub const TITLE_MAX_CHARS: usize = 30;

const TITLE_ELLIPSIS: &str = "...";
const UNTITLED: &str = "New conversation";

/// A persisted conversation between a user and the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Session {
    pub id: Uuid,
    pub user_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub messages: Vec<Message>,
    pub created_at: jiff::Timestamp,
    pub last_modified: jiff::Timestamp,
}

/// Lightweight listing entry for a stored session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionSummary {
    pub id: Uuid,
    pub title: String,
    pub last_modified: jiff::Timestamp,
    pub message_count: usize,
}

impl Session {
    pub fn new(user_key: impl Into<String>) -> Self {
        let now = jiff::Timestamp::now();
        Self {
            id: Uuid::now_v7(),
            user_key: user_key.into(),
            title: None,
            messages: Vec::new(),
            created_at: now,
            last_modified: now,
        }
    }

    pub fn first_user_message(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.role == Role::User)
    }

    /// Fill in `title` from the first user message if it is not set yet.
    /// An existing title is never recomputed.
    pub fn ensure_title(&mut self, max_chars: usize) {
        if self.title.is_some() {
            return;
        }
        if let Some(first) = self.first_user_message() {
            self.title = Some(derive_title(&first.content, max_chars));
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            title: self.title.clone().unwrap_or_else(|| UNTITLED.to_string()),
            last_modified: self.last_modified,
            message_count: self.messages.len(),
        }
    }
}

/// Derive a short session title from the first user message.
///
/// Whitespace runs (including newlines) collapse to single spaces. If the
/// result exceeds `max_chars` characters it is cut to `max_chars` and `...`
/// is appended.
pub fn derive_title(first_message: &str, max_chars: usize) -> String {
    let collapsed = first_message.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return UNTITLED.to_string();
    }

    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }

    let truncated: String = collapsed.chars().take(max_chars).collect();
    format!("{}{TITLE_ELLIPSIS}", truncated.trim_end())
}
