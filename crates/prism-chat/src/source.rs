//! Collaborator seams: the model that streams replies and the service that
//! renders requested images. Implementations live outside this crate.

use async_trait::async_trait;
use futures::stream::BoxStream;
use prism_core::models::request::{ChatRequest, Fragment};

use crate::error::{FollowUpError, StreamError};

/// Fragments of one reply, in arrival order.
pub type FragmentStream = BoxStream<'static, Result<Fragment, StreamError>>;

/// A generative model that answers a chat request as a fragment stream.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn open_stream(&self, request: ChatRequest) -> Result<FragmentStream, StreamError>;
}

/// A rendered image and its mime type.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Renders an image from a text prompt.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, FollowUpError>;
}
