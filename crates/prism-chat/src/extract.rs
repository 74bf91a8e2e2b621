//! Widget extraction from assistant text.
//!
//! The model embeds at most one structured artifact per reply as a fenced
//! block:
//!
//! ````text
//! Here is the data:
//! ```json-widget
//! {"type": "kpi", "title": "Growth", "data": {"metrics": [...]}}
//! ```
//! ````
//!
//! The fence arrives split across arbitrarily many fragments, so extraction
//! is defined over the whole accumulated buffer: [`extract`] takes a buffer
//! and returns the clean text plus the artifact of the last complete fence.
//!
//! [`FenceScanner`] computes the same result incrementally. It is a two-state
//! scanner (outside / inside a fence) that remembers where the next marker
//! search starts, keeps the clean text of everything before the last closed
//! fence, and parses each fence body exactly once. `extract` is a fresh
//! scanner fed the whole buffer, so the two paths cannot disagree.
//!
//! A fence closes only on a line of its own: the closing marker must start a
//! line (or the body) and be followed by nothing but blanks up to the next
//! newline. Backticks inside the JSON body therefore never end the fence.
//! A closing line that ends the buffer counts as closed, but stays
//! provisional until the rest of the line arrives.

use std::str::FromStr;

use prism_core::models::artifact::{Artifact, ArtifactKind};
use tracing::warn;

use crate::error::ArtifactParseError;

/// Opening marker of a widget fence.
pub const FENCE_OPEN: &str = "```json-widget";
/// Closing marker of a widget fence, alone on its line.
pub const FENCE_CLOSE: &str = "```";

/// Result of extracting the widget from a buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// The buffer with every complete fence removed. Trimmed once anything
    /// was removed; an unterminated fence is still present verbatim.
    pub clean_text: String,
    /// Artifact of the last complete fence, if it parsed.
    pub artifact: Option<Artifact>,
    /// Why the last complete fence did not yield an artifact.
    pub parse_error: Option<ArtifactParseError>,
}

/// Split `buffer` into clean text and artifact. Pure and idempotent.
pub fn extract(buffer: &str) -> Extraction {
    let mut scanner = FenceScanner::new();
    scanner.push(buffer);
    scanner.extraction()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    Inside { open_at: usize, body_at: usize },
}

/// Outcome of looking for the closing line of the open fence.
enum CloseSearch {
    /// A complete closing line starts at this offset.
    Found(usize),
    /// A closing marker ends the buffer; its line is not finished yet.
    Provisional(usize),
    /// No closing line yet; search again from this offset.
    Missing(usize),
}

/// Incremental equivalent of [`extract`] over a buffer that only grows.
#[derive(Debug, Clone)]
pub struct FenceScanner {
    buffer: String,
    state: ScanState,
    /// Byte offset where the next marker search starts.
    cursor: usize,
    /// Clean text of `buffer[..settled]`.
    clean_prefix: String,
    /// End of the last complete fence.
    settled: usize,
    /// Closing marker at the very end of the buffer, not yet committed.
    provisional_close: Option<usize>,
    fences_closed: usize,
    artifact: Option<Artifact>,
    parse_error: Option<ArtifactParseError>,
}

impl Default for FenceScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl FenceScanner {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            state: ScanState::Outside,
            cursor: 0,
            clean_prefix: String::new(),
            settled: 0,
            provisional_close: None,
            fences_closed: 0,
            artifact: None,
            parse_error: None,
        }
    }

    /// The raw accumulated text.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Whether an opening marker has been seen without its closing marker.
    pub fn in_fence(&self) -> bool {
        matches!(self.state, ScanState::Inside { .. }) && self.provisional_close.is_none()
    }

    /// Append a fragment and advance the scan as far as the text allows.
    pub fn push(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        self.buffer.push_str(fragment);
        self.provisional_close = None;

        loop {
            match self.state {
                ScanState::Outside => match self.buffer[self.cursor..].find(FENCE_OPEN) {
                    Some(rel) => {
                        let open_at = self.cursor + rel;
                        let body_at = open_at + FENCE_OPEN.len();
                        self.state = ScanState::Inside { open_at, body_at };
                        self.cursor = body_at;
                    }
                    None => {
                        self.hold_back(FENCE_OPEN.len());
                        break;
                    }
                },
                ScanState::Inside { open_at, body_at } => match self.find_close(body_at) {
                    CloseSearch::Found(close_at) => {
                        self.close_fence(open_at, body_at, close_at);
                        if let Some(e) = &self.parse_error {
                            warn!(error = %e, "discarding malformed widget block");
                        }
                    }
                    CloseSearch::Provisional(close_at) => {
                        self.provisional_close = Some(close_at);
                        self.cursor = close_at;
                        break;
                    }
                    CloseSearch::Missing(resume_at) => {
                        self.cursor = resume_at;
                        self.hold_back(FENCE_CLOSE.len());
                        break;
                    }
                },
            }
        }
    }

    /// The current clean text and artifact.
    pub fn extraction(&self) -> Extraction {
        if let (ScanState::Inside { open_at, body_at }, Some(close_at)) =
            (self.state, self.provisional_close)
        {
            let mut closed = self.clone();
            closed.close_fence(open_at, body_at, close_at);
            return closed.extraction();
        }

        let mut text = String::with_capacity(
            self.clean_prefix.len() + self.buffer.len() - self.settled,
        );
        text.push_str(&self.clean_prefix);
        text.push_str(&self.buffer[self.settled..]);

        let clean_text = if self.fences_closed > 0 {
            text.trim().to_string()
        } else {
            text
        };

        Extraction {
            clean_text,
            artifact: self.artifact.clone(),
            parse_error: self.parse_error.clone(),
        }
    }

    fn close_fence(&mut self, open_at: usize, body_at: usize, close_at: usize) {
        let end = close_at + FENCE_CLOSE.len();

        self.clean_prefix
            .push_str(&self.buffer[self.settled..open_at]);
        self.settled = end;
        self.cursor = end;
        self.state = ScanState::Outside;
        self.provisional_close = None;
        self.fences_closed += 1;

        match parse_artifact(&self.buffer[body_at..close_at]) {
            Ok(artifact) => {
                self.artifact = Some(artifact);
                self.parse_error = None;
            }
            Err(e) => {
                self.artifact = None;
                self.parse_error = Some(e);
            }
        }
    }

    fn find_close(&self, body_at: usize) -> CloseSearch {
        let mut from = self.cursor;
        while let Some(rel) = self.buffer[from..].find(FENCE_CLOSE) {
            let close_at = from + rel;
            let starts_line = close_at == body_at || self.buffer[..close_at].ends_with('\n');
            if starts_line {
                let rest = &self.buffer[close_at + FENCE_CLOSE.len()..];
                match rest.find('\n') {
                    Some(nl) if is_blank(&rest[..nl]) => return CloseSearch::Found(close_at),
                    None if is_blank(rest) => return CloseSearch::Provisional(close_at),
                    _ => {}
                }
            }
            from = close_at + 1;
        }
        CloseSearch::Missing(from)
    }

    /// A marker may straddle the end of the buffer; restart the next search
    /// early enough to catch it.
    fn hold_back(&mut self, marker_len: usize) {
        let candidate = self.buffer.len().saturating_sub(marker_len - 1);
        let mut next = candidate.max(self.cursor);
        while !self.buffer.is_char_boundary(next) {
            next -= 1;
        }
        self.cursor = next;
    }
}

fn is_blank(s: &str) -> bool {
    s.chars().all(|c| matches!(c, ' ' | '\t' | '\r'))
}

/// Parse the body of a complete fence into an artifact.
///
/// The body must be a JSON object with a known `type`, a string `title` and
/// an object `data`.
pub fn parse_artifact(body: &str) -> Result<Artifact, ArtifactParseError> {
    let value: serde_json::Value = serde_json::from_str(body.trim())
        .map_err(|e| ArtifactParseError::InvalidJson(e.to_string()))?;

    let serde_json::Value::Object(mut fields) = value else {
        return Err(ArtifactParseError::InvalidShape(
            "expected a JSON object".to_string(),
        ));
    };

    let kind = match fields.get("type") {
        Some(serde_json::Value::String(s)) => ArtifactKind::from_str(s)
            .map_err(|e| ArtifactParseError::InvalidShape(e.to_string()))?,
        _ => {
            return Err(ArtifactParseError::InvalidShape(
                "missing string field `type`".to_string(),
            ));
        }
    };

    let title = match fields.remove("title") {
        Some(serde_json::Value::String(s)) => s,
        _ => {
            return Err(ArtifactParseError::InvalidShape(
                "missing string field `title`".to_string(),
            ));
        }
    };

    let data = match fields.remove("data") {
        Some(data @ serde_json::Value::Object(_)) => data,
        _ => {
            return Err(ArtifactParseError::InvalidShape(
                "missing object field `data`".to_string(),
            ));
        }
    };

    Ok(Artifact { kind, title, data })
}
