use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use prism_core::models::artifact::{Artifact, ArtifactKind};
use prism_core::models::message::MessageStatus;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::FollowUpError;
use crate::source::ImageSource;
use crate::store::{ConversationStore, MessagePatch};

/// Resolves placeholder artifacts that need a second request once the reply
/// stream has finished.
///
/// Only `image_request` has a follow-up today: its prompt goes to the image
/// source and the placeholder is replaced by an `image` artifact whose
/// `data.src` is an inline data URL.
pub struct FollowUpOrchestrator {
    images: Arc<dyn ImageSource>,
}

impl FollowUpOrchestrator {
    pub fn new(images: Arc<dyn ImageSource>) -> Self {
        Self { images }
    }

    /// Fetch the resource behind `placeholder` and build the resolved artifact.
    pub async fn resolve_follow_up(&self, placeholder: &Artifact) -> Result<Artifact, FollowUpError> {
        if !placeholder.kind.needs_follow_up() {
            return Err(FollowUpError::NotEligible(placeholder.kind));
        }

        let prompt = placeholder
            .image_prompt()
            .map_err(|_| FollowUpError::MissingPrompt)?;

        let image = self.images.generate(prompt).await?;
        if image.bytes.is_empty() {
            return Err(FollowUpError::EmptyResult);
        }

        let src = format!(
            "data:{};base64,{}",
            image.mime_type,
            STANDARD.encode(&image.bytes)
        );

        let mut data = match &placeholder.data {
            serde_json::Value::Object(fields) => fields.clone(),
            _ => serde_json::Map::new(),
        };
        data.insert("mime_type".into(), image.mime_type.into());
        data.insert("src".into(), src.into());

        Ok(Artifact::new(
            ArtifactKind::Image,
            placeholder.title.clone(),
            serde_json::Value::Object(data),
        ))
    }

    /// Resolve `placeholder` and write the outcome into message `message_id`.
    ///
    /// On success the artifact is replaced and the message completes. On
    /// failure the placeholder stays and the message is marked stalled.
    /// Returns the final status, or `None` if the message no longer exists.
    pub async fn splice(
        &self,
        store: &ConversationStore,
        message_id: Uuid,
        placeholder: &Artifact,
    ) -> Option<MessageStatus> {
        let patch = match self.resolve_follow_up(placeholder).await {
            Ok(resolved) => {
                info!(message_id = %message_id, title = %resolved.title, "follow-up resolved");
                MessagePatch::artifact(resolved).with_status(MessageStatus::Complete)
            }
            Err(e) => {
                warn!(message_id = %message_id, error = %e, "follow-up failed, keeping placeholder");
                MessagePatch::status(MessageStatus::Stalled)
            }
        };

        let status = patch.status;
        if store.update_by_id(message_id, patch) {
            status
        } else {
            None
        }
    }
}
