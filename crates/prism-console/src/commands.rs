use std::path::{Path, PathBuf};

use prism_core::models::attachment::{Attachment, mime_type_for_extension};
use thiserror::Error;
use uuid::Uuid;

/// Largest file accepted as an attachment.
pub const MAX_ATTACHMENT_BYTES: u64 = 4_500_000;

pub const HELP: &str = "\
Type a message and press enter to send it.

  /attach <path>   attach a file to the next message
  /detach          drop the pending attachment
  /new             start a new conversation
  /history         reprint the current conversation
  /sessions        list stored conversations
  /open <id>       switch to a stored conversation
  /config          show the active configuration
  /help            show this help
  /quit            save and exit";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Attach(PathBuf),
    Detach,
    New,
    History,
    Sessions,
    Open(Uuid),
    Config,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command /{0}, try /help")]
    Unknown(String),

    #[error("/{0} needs an argument")]
    MissingArgument(&'static str),

    #[error("/{0} takes no argument")]
    UnexpectedArgument(&'static str),

    #[error("not a session id: {0}")]
    InvalidSessionId(String),
}

#[derive(Debug, Error)]
pub enum AttachError {
    #[error("cannot attach {0}: unsupported file type")]
    UnsupportedType(String),

    #[error("cannot attach {path}: {size} bytes exceeds the {MAX_ATTACHMENT_BYTES} byte limit")]
    TooLarge { path: String, size: u64 },

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Self::Send(line.to_string())));
        };

        // "//text" sends a message that starts with a slash.
        if rest.starts_with('/') {
            return Ok(Some(Self::Send(rest.to_string())));
        }

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match name.to_lowercase().as_str() {
            "attach" => {
                if arg.is_empty() {
                    return Err(CommandError::MissingArgument("attach"));
                }
                Self::Attach(PathBuf::from(unquote(arg)))
            }
            "open" => {
                if arg.is_empty() {
                    return Err(CommandError::MissingArgument("open"));
                }
                let id = Uuid::parse_str(arg)
                    .map_err(|_| CommandError::InvalidSessionId(arg.to_string()))?;
                Self::Open(id)
            }
            "detach" => no_arg(arg, "detach", Self::Detach)?,
            "new" => no_arg(arg, "new", Self::New)?,
            "history" => no_arg(arg, "history", Self::History)?,
            "sessions" => no_arg(arg, "sessions", Self::Sessions)?,
            "config" => no_arg(arg, "config", Self::Config)?,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(Some(command))
    }
}

fn no_arg(arg: &str, name: &'static str, command: Command) -> Result<Command, CommandError> {
    if arg.is_empty() {
        Ok(command)
    } else {
        Err(CommandError::UnexpectedArgument(name))
    }
}

fn unquote(arg: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = arg
            .strip_prefix(quote)
            .and_then(|a| a.strip_suffix(quote))
        {
            return inner;
        }
    }
    arg
}

/// The mime type an attachment at `path` would be sent with.
pub fn attachment_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    mime_type_for_extension(ext)
}

/// Read a file from disk as the pending attachment.
pub async fn load_attachment(path: &Path) -> Result<Attachment, AttachError> {
    let display = path.display().to_string();
    let mime_type =
        attachment_mime_type(path).ok_or_else(|| AttachError::UnsupportedType(display.clone()))?;

    let io_err = |source| AttachError::Io {
        path: display.clone(),
        source,
    };

    let size = tokio::fs::metadata(path).await.map_err(io_err)?.len();
    if size > MAX_ATTACHMENT_BYTES {
        return Err(AttachError::TooLarge {
            path: display,
            size,
        });
    }

    let bytes = tokio::fs::read(path).await.map_err(io_err)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or(display);

    Ok(Attachment::new(filename, mime_type, bytes))
}
