use async_trait::async_trait;
use aws_sdk_bedrockruntime::Client;
use aws_sdk_bedrockruntime::error::SdkError;
use aws_smithy_types::Blob;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use prism_chat::{FollowUpError, GeneratedImage, ImageSource};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{BedrockError, classify_failure, format_err_chain};

/// Longest prompt the text-to-image task accepts, in characters.
pub const MAX_PROMPT_CHARS: usize = 1024;

const IMAGE_SIZE: u32 = 1024;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextToImageRequest {
    pub task_type: &'static str,
    pub text_to_image_params: TextToImageParams,
    pub image_generation_config: ImageGenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct TextToImageParams {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGenerationConfig {
    pub number_of_images: u32,
    pub height: u32,
    pub width: u32,
    pub cfg_scale: f32,
}

#[derive(Debug, Deserialize)]
pub struct TextToImageResponse {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TextToImageRequest {
    pub fn new(prompt: &str) -> Self {
        Self {
            task_type: "TEXT_IMAGE",
            text_to_image_params: TextToImageParams {
                text: prompt.chars().take(MAX_PROMPT_CHARS).collect(),
            },
            image_generation_config: ImageGenerationConfig {
                number_of_images: 1,
                height: IMAGE_SIZE,
                width: IMAGE_SIZE,
                cfg_scale: 8.0,
            },
        }
    }
}

/// Decode the first image of a text-to-image response body.
pub fn decode_response(body: &[u8]) -> Result<Vec<u8>, BedrockError> {
    let response: TextToImageResponse = serde_json::from_slice(body)?;

    if let Some(error) = response.error.filter(|e| !e.is_empty()) {
        return Err(BedrockError::ResponseParse(format!("image model refused: {error}")));
    }

    let first = response
        .images
        .first()
        .ok_or_else(|| BedrockError::ResponseParse("no image in response".to_string()))?;

    STANDARD
        .decode(first)
        .map_err(|e| BedrockError::ResponseParse(format!("image is not valid base64: {e}")))
}

/// An [`ImageSource`] backed by a Bedrock text-to-image model (`InvokeModel`).
#[derive(Clone)]
pub struct BedrockImageClient {
    client: Client,
    model_id: String,
}

impl BedrockImageClient {
    pub fn new(config: &aws_config::SdkConfig, model_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(config),
            model_id: model_id.into(),
        }
    }

    pub async fn generate_png(&self, prompt: &str) -> Result<Vec<u8>, BedrockError> {
        let body = serde_json::to_vec(&TextToImageRequest::new(prompt))?;

        info!(model = %self.model_id, prompt_chars = prompt.chars().count(), "generating image");

        let response = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| {
                let construction = matches!(e, SdkError::ConstructionFailure(_));
                classify_failure(construction, format_err_chain(&e))
            })?;

        let bytes = decode_response(response.body().as_ref())?;
        info!(model = %self.model_id, bytes = bytes.len(), "image generated");
        Ok(bytes)
    }
}

#[async_trait]
impl ImageSource for BedrockImageClient {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, FollowUpError> {
        let bytes = self.generate_png(prompt).await?;
        Ok(GeneratedImage {
            bytes,
            mime_type: "image/png".to_string(),
        })
    }
}
