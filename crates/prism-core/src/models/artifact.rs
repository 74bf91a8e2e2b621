use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;

/// A structured, typed payload lifted out of assistant text and rendered as a
/// widget instead of prose.
///
/// Wire shape inside a fenced block: `{"type": ..., "title": ..., "data": {...}}`.
/// `data` is opaque to the pipeline; only `image_request` is inspected (for
/// its `prompt`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    pub title: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ArtifactKind {
    Chart,
    Framework,
    Kpi,
    ImageRequest,
    Image,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chart => "chart",
            Self::Framework => "framework",
            Self::Kpi => "kpi",
            Self::ImageRequest => "image_request",
            Self::Image => "image",
        }
    }

    /// Kinds that are placeholders for a resource fetched after the stream
    /// completes.
    pub fn needs_follow_up(&self) -> bool {
        matches!(self, Self::ImageRequest)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chart" => Ok(Self::Chart),
            "framework" => Ok(Self::Framework),
            "kpi" => Ok(Self::Kpi),
            "image_request" => Ok(Self::ImageRequest),
            "image" => Ok(Self::Image),
            other => Err(CoreError::UnknownArtifactKind(other.to_string())),
        }
    }
}

impl Artifact {
    pub fn new(kind: ArtifactKind, title: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind,
            title: title.into(),
            data,
        }
    }

    /// The prompt of an `image_request` artifact.
    pub fn image_prompt(&self) -> Result<&str, CoreError> {
        self.data
            .get("prompt")
            .and_then(|p| p.as_str())
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| CoreError::MissingField("data.prompt".to_string()))
    }
}
