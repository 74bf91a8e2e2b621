use serde::{Deserialize, Serialize};

/// A file the user staged for the next outgoing message.
///
/// Never persisted. It is consumed by value when the message is sent, so it
/// is gone from the input whether or not the send succeeds.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Inline binary payload handed to the model with its mime type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineData {
    pub mime_type: String,
    pub filename: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn into_inline(self) -> InlineData {
        InlineData {
            mime_type: self.mime_type,
            filename: self.filename,
            data: self.bytes,
        }
    }
}

/// Map a file extension to the mime type sent with an attachment.
///
/// Returns `None` for extensions the model cannot take inline.
pub fn mime_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "pdf" => Some("application/pdf"),
        "csv" => Some("text/csv"),
        "txt" => Some("text/plain"),
        "md" => Some("text/markdown"),
        "html" => Some("text/html"),
        "doc" => Some("application/msword"),
        "docx" => Some(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ),
        "xls" => Some("application/vnd.ms-excel"),
        "xlsx" => Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        _ => None,
    }
}
