//! prism-bedrock
//!
//! AWS Bedrock implementations of the conversation collaborators: a
//! `ConverseStream` chat client and a text-to-image client.

pub mod chat;
pub mod error;
pub mod image;
pub mod prompt;
pub mod tokens;

pub use crate::chat::BedrockChatClient;
pub use crate::error::BedrockError;
pub use crate::image::BedrockImageClient;
