#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use prism_chat::{FollowUpError, FragmentStream, GeneratedImage, ImageSource, ModelClient, StreamError};
use prism_core::models::request::{ChatRequest, Fragment};

pub type Reply = Result<Vec<Result<Fragment, StreamError>>, StreamError>;

/// Model client that plays back one scripted reply per request.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(parts: &[&str]) -> Reply {
        Ok(parts.iter().map(|p| Ok(Fragment::text(*p))).collect())
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn open_stream(&self, request: ChatRequest) -> Result<FragmentStream, StreamError> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()));
        Ok(stream::iter(reply?).boxed())
    }
}

/// Model client that sends some fragments and then never finishes.
pub struct StalledModel {
    parts: Vec<String>,
}

impl StalledModel {
    pub fn after(parts: &[&str]) -> Self {
        Self {
            parts: parts.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[async_trait]
impl ModelClient for StalledModel {
    async fn open_stream(&self, _request: ChatRequest) -> Result<FragmentStream, StreamError> {
        let sent: Vec<Result<Fragment, StreamError>> =
            self.parts.iter().map(|p| Ok(Fragment::text(p.as_str()))).collect();
        Ok(stream::iter(sent).chain(stream::pending()).boxed())
    }
}

/// Image source returning a fixed result and recording prompts.
pub struct RecordingImages {
    result: Result<GeneratedImage, FollowUpError>,
    prompts: Mutex<Vec<String>>,
}

impl RecordingImages {
    pub fn returning(bytes: &[u8], mime_type: &str) -> Self {
        Self {
            result: Ok(GeneratedImage {
                bytes: bytes.to_vec(),
                mime_type: mime_type.to_string(),
            }),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: FollowUpError) -> Self {
        Self {
            result: Err(err),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageSource for RecordingImages {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, FollowUpError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.result.clone()
    }
}

pub const IMAGE_REQUEST_REPLY: &str = "Here is a sketch.\n```json-widget\n{\"type\":\"image_request\",\"title\":\"Skyline\",\"data\":{\"prompt\":\"a city skyline at dusk\",\"style\":\"watercolor\"}}\n```";
