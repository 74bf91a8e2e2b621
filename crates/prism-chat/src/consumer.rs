use futures::{Stream, StreamExt};
use prism_core::models::artifact::Artifact;
use prism_core::models::request::Fragment;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{StreamError, append_notice};
use crate::extract::FenceScanner;

/// The latest derived state of one in-flight reply.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamUpdate {
    pub message_id: Uuid,
    pub content: String,
    pub artifact: Option<Artifact>,
    pub metadata: Option<serde_json::Value>,
}

/// How a stream ended normally.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOutcome {
    /// The last update emitted.
    pub update: StreamUpdate,
    pub fragments: usize,
}

impl StreamOutcome {
    /// The terminal artifact, if it is a placeholder awaiting a follow-up
    /// fetch.
    pub fn follow_up(&self) -> Option<&Artifact> {
        self.update
            .artifact
            .as_ref()
            .filter(|a| a.kind.needs_follow_up())
    }
}

/// Consumes the fragment stream of one assistant message.
///
/// Each consumer owns its buffer, so several can run at once for different
/// message ids without sharing state.
pub struct StreamConsumer {
    message_id: Uuid,
    scanner: FenceScanner,
    metadata: Option<serde_json::Value>,
    fragments: usize,
}

impl StreamConsumer {
    pub fn new(message_id: Uuid) -> Self {
        Self {
            message_id,
            scanner: FenceScanner::new(),
            metadata: None,
            fragments: 0,
        }
    }

    /// Drive `fragments` to completion, calling `on_update` after every
    /// fragment with the state derived from the whole buffer.
    ///
    /// `on_update` runs synchronously between fragments and must not block.
    /// On a transport error or the configuration sentinel, one last update
    /// carrying a visible notice is emitted and the error is returned. The
    /// stream is never retried.
    pub async fn consume<S, F>(
        mut self,
        mut fragments: S,
        mut on_update: F,
    ) -> Result<StreamOutcome, StreamError>
    where
        S: Stream<Item = Result<Fragment, StreamError>> + Unpin,
        F: FnMut(StreamUpdate),
    {
        while let Some(next) = fragments.next().await {
            let fragment = match next {
                Ok(fragment) => fragment,
                Err(e) => return Err(self.fail(e, &mut on_update)),
            };

            if fragment.is_config_error() {
                let err = StreamError::Configuration(
                    "model source reported missing credentials".to_string(),
                );
                return Err(self.fail(err, &mut on_update));
            }

            self.fragments += 1;
            self.scanner.push(&fragment.text);
            if fragment.metadata.is_some() {
                self.metadata = fragment.metadata;
            }

            on_update(self.current());
        }

        debug!(
            message_id = %self.message_id,
            fragments = self.fragments,
            bytes = self.scanner.buffer().len(),
            "stream complete"
        );

        Ok(StreamOutcome {
            update: self.current(),
            fragments: self.fragments,
        })
    }

    fn current(&self) -> StreamUpdate {
        let extraction = self.scanner.extraction();
        StreamUpdate {
            message_id: self.message_id,
            content: extraction.clean_text,
            artifact: extraction.artifact,
            metadata: self.metadata.clone(),
        }
    }

    fn fail<F>(&self, err: StreamError, on_update: &mut F) -> StreamError
    where
        F: FnMut(StreamUpdate),
    {
        warn!(message_id = %self.message_id, error = %err, "stream failed");

        let mut update = self.current();
        append_notice(&mut update.content, err.user_notice());
        on_update(update);

        err
    }
}
