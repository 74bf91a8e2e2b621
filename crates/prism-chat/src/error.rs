use prism_core::models::artifact::ArtifactKind;
use thiserror::Error;

/// Appended to a reply whose stream ended before it finished.
pub const INTERRUPTED_NOTICE: &str =
    "Sorry, the response was interrupted before it finished. Please try again.";

/// The reply stream could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("stream transport failed: {0}")]
    Transport(String),

    #[error("model client is not configured: {0}")]
    Configuration(String),
}

impl StreamError {
    /// The text written into the assistant message so the failure is visible.
    pub fn user_notice(&self) -> &'static str {
        match self {
            Self::Transport(_) => INTERRUPTED_NOTICE,
            Self::Configuration(_) => {
                "The AI service is not configured: model credentials are missing. \
                 Add them in settings and try again."
            }
        }
    }
}

/// Append `notice` to `content`, separated by a blank line when there is
/// already text to keep.
pub(crate) fn append_notice(content: &mut String, notice: &str) {
    if !content.is_empty() {
        content.push_str("\n\n");
    }
    content.push_str(notice);
}

/// A complete widget fence whose body is not a valid artifact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactParseError {
    #[error("widget body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("widget body has the wrong shape: {0}")]
    InvalidShape(String),
}

/// The follow-up fetch for a placeholder artifact failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FollowUpError {
    #[error("artifact kind {0} has no follow-up")]
    NotEligible(ArtifactKind),

    #[error("image request has no prompt")]
    MissingPrompt,

    #[error("image source failed: {0}")]
    Transport(String),

    #[error("image source returned no image")]
    EmptyResult,
}

/// Saving or loading a session snapshot failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage error: {0}")]
    Storage(prism_storage::StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<prism_storage::StorageError> for PersistenceError {
    fn from(err: prism_storage::StorageError) -> Self {
        match err {
            prism_storage::StorageError::Serialization(e) => Self::Serialization(e),
            other => Self::Storage(other),
        }
    }
}
