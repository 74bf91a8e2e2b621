//! prism-chat
//!
//! The streaming conversation pipeline: widget extraction from a growing
//! reply buffer, stream consumption, the in-memory conversation store,
//! debounced session persistence and follow-up image resolution.
//!
//! Public API:
//! - `extract()` / `FenceScanner`: split clean text from the widget artifact
//! - `StreamConsumer`: drive one reply stream into store updates
//! - `ConversationStore`: ordered, id-keyed message list
//! - `SessionPersistence`: debounced save, load-latest on startup
//! - `FollowUpOrchestrator`: resolve `image_request` artifacts
//! - `Conversation`: the controller the UI talks to

pub mod consumer;
pub mod conversation;
pub mod error;
pub mod extract;
pub mod follow_up;
pub mod persistence;
pub mod source;
pub mod store;

pub use crate::consumer::{StreamConsumer, StreamOutcome, StreamUpdate};
pub use crate::conversation::{Conversation, SendOutcome};
pub use crate::error::{ArtifactParseError, FollowUpError, PersistenceError, StreamError};
pub use crate::extract::{Extraction, FenceScanner, extract};
pub use crate::follow_up::FollowUpOrchestrator;
pub use crate::persistence::SessionPersistence;
pub use crate::source::{FragmentStream, GeneratedImage, ImageSource, ModelClient};
pub use crate::store::{ConversationStore, MessagePatch};
