use prism_chat::{FollowUpError, StreamError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BedrockError {
    #[error("model invocation failed: {0}")]
    Invocation(String),

    #[error("model client is not configured: {0}")]
    Configuration(String),

    #[error("response stream failed: {0}")]
    Stream(String),

    #[error("response parsing failed: {0}")]
    ResponseParse(String),

    #[error("attachment cannot be sent: {0}")]
    InvalidAttachment(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<BedrockError> for StreamError {
    fn from(err: BedrockError) -> Self {
        match err {
            BedrockError::Configuration(msg) => StreamError::Configuration(msg),
            other => StreamError::Transport(other.to_string()),
        }
    }
}

impl From<BedrockError> for FollowUpError {
    fn from(err: BedrockError) -> Self {
        FollowUpError::Transport(err.to_string())
    }
}

/// Walk the full error chain and join all causes into one string.
///
/// AWS SDK errors often have terse `Display` impls (e.g. "dispatch failure")
/// with the useful detail further down the source chain.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}

/// Classify a failed request. Requests that could not be built and failures
/// to resolve credentials or a region are configuration problems; anything
/// else is an invocation failure.
pub fn classify_failure(construction_failure: bool, detail: String) -> BedrockError {
    let lower = detail.to_lowercase();
    let credentials = lower.contains("credential")
        || lower.contains("no providers in chain")
        || lower.contains("security token")
        || lower.contains("signature")
        || lower.contains("region");

    if construction_failure || credentials {
        BedrockError::Configuration(detail)
    } else {
        BedrockError::Invocation(detail)
    }
}
