//! Incremental terminal rendering of the message being streamed.
//!
//! A terminal cannot take text back, but the clean text of a reply is not
//! append-only: an open widget fence is visible until it closes and is then
//! removed, and the text is trimmed once a fence is gone. The renderer
//! therefore never prints from an open fence onwards (or a trailing partial
//! opening marker), and only prints the suffix by which the visible text
//! grew since the last render.

use std::io::{self, Write};

use prism_chat::extract::FENCE_OPEN;
use prism_core::models::artifact::{Artifact, ArtifactKind};
use prism_core::models::message::{Message, MessageStatus, Role};
use uuid::Uuid;

/// What to print for the latest state of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk<'a> {
    /// Print this text after what is already on screen.
    Append(&'a str),
    /// Nothing new to show.
    Unchanged,
    /// The text no longer extends what was printed; reprint it whole.
    Diverged(&'a str),
}

/// The part of `content` that is safe to print while streaming.
pub fn printable(content: &str) -> &str {
    if let Some(open) = content.find(FENCE_OPEN) {
        return &content[..open];
    }
    for len in (1..FENCE_OPEN.len()).rev() {
        if content.ends_with(&FENCE_OPEN[..len]) {
            return &content[..content.len() - len];
        }
    }
    content
}

/// Compare what was printed with the printable part of `current`.
pub fn next_chunk<'a>(printed: &str, current: &'a str) -> Chunk<'a> {
    let visible = printable(current);
    if let Some(rest) = visible.strip_prefix(printed) {
        if rest.is_empty() {
            Chunk::Unchanged
        } else {
            Chunk::Append(rest)
        }
    } else if printed.starts_with(visible) {
        Chunk::Unchanged
    } else {
        Chunk::Diverged(visible)
    }
}

/// One-line description of an artifact.
pub fn artifact_summary(artifact: &Artifact) -> String {
    match artifact.kind {
        ArtifactKind::Image => {
            let mime = artifact.data["mime_type"].as_str().unwrap_or("image");
            let size = artifact.data["src"]
                .as_str()
                .and_then(|src| src.split_once(','))
                .map(|(_, b64)| b64.len() * 3 / 4)
                .unwrap_or(0);
            format!("[image] {} ({mime}, {} KB)", artifact.title, size.div_ceil(1024))
        }
        ArtifactKind::ImageRequest => {
            let prompt = artifact.data["prompt"].as_str().unwrap_or("");
            format!("[image pending] {}: {prompt}", artifact.title)
        }
        kind => {
            let fields = match &artifact.data {
                serde_json::Value::Object(map) => {
                    map.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
                }
                _ => String::new(),
            };
            if fields.is_empty() {
                format!("[{kind} widget] {}", artifact.title)
            } else {
                format!("[{kind} widget] {} ({fields})", artifact.title)
            }
        }
    }
}

/// Streams the latest assistant message to a writer.
#[derive(Debug, Default)]
pub struct Renderer {
    message_id: Option<Uuid>,
    printed: String,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print whatever `message` gained since the last call.
    pub fn render(&mut self, message: &Message, out: &mut impl Write) -> io::Result<()> {
        if message.role != Role::Assistant {
            return Ok(());
        }
        if self.message_id != Some(message.id) {
            self.message_id = Some(message.id);
            self.printed.clear();
        }

        match next_chunk(&self.printed, &message.content) {
            Chunk::Append(text) => {
                out.write_all(text.as_bytes())?;
                self.printed.push_str(text);
            }
            Chunk::Unchanged => return Ok(()),
            Chunk::Diverged(text) => {
                out.write_all(b"\n")?;
                out.write_all(text.as_bytes())?;
                self.printed = text.to_string();
            }
        }
        out.flush()
    }

    /// Print the rest of a finished message and its artifact.
    pub fn finish(&mut self, message: &Message, out: &mut impl Write) -> io::Result<()> {
        self.render(message, out)?;

        // Anything held back behind an unterminated fence is shown as is.
        if let Some(rest) = message.content.strip_prefix(self.printed.as_str()) {
            out.write_all(rest.as_bytes())?;
        }
        writeln!(out)?;

        if let Some(artifact) = &message.artifact {
            writeln!(out, "{}", artifact_summary(artifact))?;
        }
        match message.status {
            MessageStatus::Stalled => writeln!(out, "(the image could not be generated)")?,
            MessageStatus::Failed => writeln!(out, "(reply failed)")?,
            _ => {}
        }

        self.message_id = None;
        self.printed.clear();
        out.flush()
    }
}

/// Print a whole stored message, for `/history` and restored sessions.
pub fn print_message(message: &Message, out: &mut impl Write) -> io::Result<()> {
    let who = match message.role {
        Role::User => "you",
        Role::Assistant => "prism",
    };
    writeln!(out, "{who}> {}", message.content)?;
    if let Some(artifact) = &message.artifact {
        writeln!(out, "      {}", artifact_summary(artifact))?;
    }
    Ok(())
}
