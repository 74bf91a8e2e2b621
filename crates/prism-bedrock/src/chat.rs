//! Streaming chat on the Bedrock Converse API.
//!
//! `ConverseStream` yields typed events. Text deltas become fragments as they
//! arrive; the trailing metadata event becomes one empty fragment carrying
//! token usage and estimated cost. Everything else (block start/stop,
//! message start/stop, reasoning deltas) is skipped.
//!
//! Converse requires the conversation to start with a user turn and to
//! alternate roles, so replayed history is normalised first: leading
//! assistant turns are dropped and consecutive turns with the same role are
//! merged.

use async_trait::async_trait;
use aws_sdk_bedrockruntime::Client;
use aws_sdk_bedrockruntime::error::SdkError;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ContentBlockDelta, ConversationRole, ConverseStreamOutput as StreamEvent,
    DocumentBlock, DocumentFormat, DocumentSource, ImageBlock, ImageFormat, ImageSource, Message,
    SystemContentBlock,
};
use aws_smithy_types::Blob;
use futures::StreamExt;
use futures::stream;
use prism_chat::{FragmentStream, ModelClient, StreamError};
use prism_core::models::attachment::InlineData;
use prism_core::models::message::Role;
use prism_core::models::request::{ChatRequest, ChatTurn, Fragment};
use prism_core::models::usage::ReplyUsage;
use tracing::{debug, info, warn};

use crate::error::{BedrockError, classify_failure, format_err_chain};
use crate::tokens;

/// A [`ModelClient`] backed by Bedrock `ConverseStream`.
#[derive(Clone)]
pub struct BedrockChatClient {
    client: Client,
    model_id: String,
    system_prompt: String,
}

impl BedrockChatClient {
    pub fn new(
        config: &aws_config::SdkConfig,
        model_id: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(config),
            model_id: model_id.into(),
            system_prompt: system_prompt.into(),
        }
    }

    async fn converse_stream(&self, request: ChatRequest) -> Result<FragmentStream, BedrockError> {
        let turns = normalize_turns(&request.history, &request.prompt);
        let messages = build_messages(&turns, request.attachment.as_ref())?;

        info!(
            model = %self.model_id,
            turns = messages.len(),
            attachment = request.attachment.is_some(),
            "opening converse stream"
        );

        let output = self
            .client
            .converse_stream()
            .model_id(&self.model_id)
            .system(SystemContentBlock::Text(self.system_prompt.clone()))
            .set_messages(Some(messages))
            .send()
            .await
            .map_err(|e| {
                let construction = matches!(e, SdkError::ConstructionFailure(_));
                classify_failure(construction, format_err_chain(&e))
            })?;

        let model_id = self.model_id.clone();
        let pricing = tokens::get_pricing(&self.model_id);

        // The receiver is dropped after the first error so the stream ends.
        let fragments = stream::unfold(Some(output.stream), move |events| {
            let model_id = model_id.clone();
            async move {
                let mut events = events?;
                loop {
                    match events.recv().await {
                        Ok(Some(StreamEvent::ContentBlockDelta(event))) => {
                            if let Some(ContentBlockDelta::Text(text)) = event.delta() {
                                return Some((Ok(Fragment::text(text.clone())), Some(events)));
                            }
                        }
                        Ok(Some(StreamEvent::Metadata(event))) => {
                            let Some(usage) = event.usage() else {
                                continue;
                            };
                            let usage = ReplyUsage::new(
                                model_id.as_str(),
                                tokens::token_counts(usage),
                                pricing.as_ref(),
                            );
                            debug!(
                                model = %model_id,
                                input_tokens = usage.usage.input_tokens,
                                output_tokens = usage.usage.output_tokens,
                                cost_usd = usage.cost_usd,
                                "converse stream usage"
                            );
                            let metadata = usage.to_metadata();
                            let fragment = Fragment::text("").with_metadata(metadata);
                            return Some((Ok(fragment), Some(events)));
                        }
                        Ok(Some(StreamEvent::MessageStop(event))) => {
                            debug!(stop_reason = event.stop_reason().as_str(), "converse message stopped");
                        }
                        Ok(Some(_)) => {}
                        Ok(None) => return None,
                        Err(e) => {
                            let err = BedrockError::Stream(format_err_chain(&e));
                            warn!(model = %model_id, error = %err, "converse stream failed");
                            return Some((Err(StreamError::from(err)), None));
                        }
                    }
                }
            }
        });

        Ok(fragments.boxed())
    }
}

#[async_trait]
impl ModelClient for BedrockChatClient {
    async fn open_stream(&self, request: ChatRequest) -> Result<FragmentStream, StreamError> {
        Ok(self.converse_stream(request).await?)
    }
}

/// Sent in place of an empty prompt; Converse rejects empty text blocks.
const ATTACHMENT_ONLY_PROMPT: &str = "Please take a look at the attached file.";

/// Turn replayed history plus the new prompt into a sequence Converse
/// accepts: starts with a user turn, alternates roles, ends with the prompt.
pub fn normalize_turns(history: &[ChatTurn], prompt: &str) -> Vec<ChatTurn> {
    let mut turns: Vec<ChatTurn> = Vec::with_capacity(history.len() + 1);

    let text = if prompt.trim().is_empty() {
        ATTACHMENT_ONLY_PROMPT
    } else {
        prompt
    };
    let current = ChatTurn {
        role: Role::User,
        text: text.to_string(),
    };

    for turn in history.iter().chain(std::iter::once(&current)) {
        if turn.text.trim().is_empty() {
            continue;
        }
        if turns.is_empty() && turn.role != Role::User {
            continue;
        }
        match turns.last_mut() {
            Some(last) if last.role == turn.role => {
                last.text.push_str("\n\n");
                last.text.push_str(&turn.text);
            }
            _ => turns.push(turn.clone()),
        }
    }

    turns
}

fn build_messages(
    turns: &[ChatTurn],
    attachment: Option<&InlineData>,
) -> Result<Vec<Message>, BedrockError> {
    let last = turns.len().saturating_sub(1);
    turns
        .iter()
        .enumerate()
        .map(|(i, turn)| {
            let role = match turn.role {
                Role::User => ConversationRole::User,
                Role::Assistant => ConversationRole::Assistant,
            };
            let mut builder = Message::builder().role(role);
            if i == last {
                if let Some(data) = attachment {
                    builder = builder.content(attachment_block(data)?);
                }
            }
            builder
                .content(ContentBlock::Text(turn.text.clone()))
                .build()
                .map_err(|e| BedrockError::Invocation(e.to_string()))
        })
        .collect()
}

/// The content block for an inline attachment, chosen by mime type.
pub fn attachment_block(data: &InlineData) -> Result<ContentBlock, BedrockError> {
    let blob = Blob::new(data.data.clone());

    if let Some(format) = image_format(&data.mime_type) {
        let image = ImageBlock::builder()
            .format(format)
            .source(ImageSource::Bytes(blob))
            .build()
            .map_err(|e| BedrockError::InvalidAttachment(e.to_string()))?;
        return Ok(ContentBlock::Image(image));
    }

    if let Some(format) = document_format(&data.mime_type) {
        let document = DocumentBlock::builder()
            .format(format)
            .name(document_name(&data.filename))
            .source(DocumentSource::Bytes(blob))
            .build()
            .map_err(|e| BedrockError::InvalidAttachment(e.to_string()))?;
        return Ok(ContentBlock::Document(document));
    }

    Err(BedrockError::InvalidAttachment(format!(
        "unsupported mime type {} for {}",
        data.mime_type, data.filename
    )))
}

pub fn image_format(mime_type: &str) -> Option<ImageFormat> {
    match mime_type {
        "image/png" => Some(ImageFormat::Png),
        "image/jpeg" => Some(ImageFormat::Jpeg),
        "image/gif" => Some(ImageFormat::Gif),
        "image/webp" => Some(ImageFormat::Webp),
        _ => None,
    }
}

pub fn document_format(mime_type: &str) -> Option<DocumentFormat> {
    match mime_type {
        "application/pdf" => Some(DocumentFormat::Pdf),
        "text/csv" => Some(DocumentFormat::Csv),
        "text/plain" => Some(DocumentFormat::Txt),
        "text/markdown" => Some(DocumentFormat::Md),
        "text/html" => Some(DocumentFormat::Html),
        "application/msword" => Some(DocumentFormat::Doc),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            Some(DocumentFormat::Docx)
        }
        "application/vnd.ms-excel" => Some(DocumentFormat::Xls),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
            Some(DocumentFormat::Xlsx)
        }
        _ => None,
    }
}

/// Converse document names allow only alphanumerics, single spaces, hyphens,
/// parentheses and square brackets. The extension is dropped.
pub fn document_name(filename: &str) -> String {
    let stem = match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    };

    let mapped: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '(' | ')' | '[' | ']') {
                c
            } else {
                '-'
            }
        })
        .collect();

    let name = mapped.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        "document".to_string()
    } else {
        name
    }
}
