use std::io::{self, Write};

use prism_chat::Conversation;
use prism_core::models::attachment::Attachment;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::commands::{Command, HELP, load_attachment};
use crate::config::ConfigInfo;
use crate::render::{Renderer, print_message};

/// Read commands from stdin until `/quit` or end of input, then flush the
/// pending session save.
pub async fn run(conversation: &Conversation, info: &ConfigInfo) -> eyre::Result<()> {
    let mut out = io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending: Option<Attachment> = None;

    writeln!(out, "Prism. Type /help for commands.")?;
    if !conversation.store().is_empty() {
        writeln!(out, "Resumed your last conversation:")?;
        print_history(conversation, &mut out)?;
    }

    loop {
        write_prompt(&mut out, pending.as_ref())?;
        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                writeln!(out, "{e}")?;
                continue;
            }
        };
        debug!(?command, "console command");

        match command {
            Command::Send(text) => send(conversation, text, pending.take(), &mut out).await?,
            Command::Attach(path) => match load_attachment(&path).await {
                Ok(attachment) => {
                    writeln!(
                        out,
                        "attached {} ({}, {} bytes)",
                        attachment.filename,
                        attachment.mime_type,
                        attachment.bytes.len()
                    )?;
                    pending = Some(attachment);
                }
                Err(e) => writeln!(out, "{e}")?,
            },
            Command::Detach => match pending.take() {
                Some(attachment) => writeln!(out, "dropped {}", attachment.filename)?,
                None => writeln!(out, "nothing is attached")?,
            },
            Command::New => {
                let id = conversation.new_session();
                writeln!(out, "started conversation {id}")?;
            }
            Command::History => print_history(conversation, &mut out)?,
            Command::Sessions => {
                let current = conversation.store().session_id();
                let sessions = conversation.sessions().await;
                if sessions.is_empty() {
                    writeln!(out, "no stored conversations")?;
                }
                for session in sessions {
                    let marker = if session.id == current { '*' } else { ' ' };
                    writeln!(
                        out,
                        "{marker} {}  {}  {:>3} msgs  {}",
                        session.id,
                        session.last_modified.strftime("%Y-%m-%d %H:%M"),
                        session.message_count,
                        session.title
                    )?;
                }
            }
            Command::Open(id) => {
                if conversation.open_session(id).await {
                    print_history(conversation, &mut out)?;
                } else {
                    writeln!(out, "no stored conversation {id}")?;
                }
            }
            Command::Config => writeln!(out, "{info}")?,
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => break,
        }
    }

    conversation.flush().await;
    Ok(())
}

fn write_prompt(out: &mut impl Write, pending: Option<&Attachment>) -> io::Result<()> {
    match pending {
        Some(attachment) => write!(out, "[{}] you> ", attachment.filename)?,
        None => write!(out, "you> ")?,
    }
    out.flush()
}

fn print_history(conversation: &Conversation, out: &mut impl Write) -> io::Result<()> {
    for message in conversation.store().snapshot() {
        print_message(&message, out)?;
    }
    Ok(())
}

/// Send one message, printing the reply as it streams in.
async fn send(
    conversation: &Conversation,
    text: String,
    attachment: Option<Attachment>,
    out: &mut impl Write,
) -> io::Result<()> {
    let store = conversation.store().clone();
    let mut revisions = store.subscribe();
    let mut renderer = Renderer::new();

    write!(out, "prism> ")?;
    out.flush()?;

    let reply = conversation.send(text, attachment);
    tokio::pin!(reply);

    let outcome = loop {
        tokio::select! {
            outcome = &mut reply => break outcome,
            changed = revisions.changed() => {
                if changed.is_err() {
                    break (&mut reply).await;
                }
                if let Some(message) = store.last() {
                    renderer.render(&message, out)?;
                }
            }
        }
    };

    if let Some(message) = store.get(outcome.assistant_id) {
        renderer.finish(&message, out)?;
    }
    Ok(())
}
