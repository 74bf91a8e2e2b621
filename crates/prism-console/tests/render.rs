use prism_console::render::{Chunk, Renderer, artifact_summary, next_chunk, print_message, printable};
use prism_core::models::artifact::{Artifact, ArtifactKind};
use prism_core::models::message::{Message, MessageStatus, new_message_id};
use serde_json::json;

fn assistant(content: &str) -> Message {
    let mut message = Message::assistant_placeholder(new_message_id());
    message.content = content.into();
    message
}

fn output(buf: Vec<u8>) -> String {
    String::from_utf8(buf).unwrap()
}

#[test]
fn printable_stops_at_open_fence() {
    assert_eq!(printable("Revenue grew.\n```json-widget\n{\"type\""), "Revenue grew.\n");
    assert_eq!(printable("Revenue grew.\n``"), "Revenue grew.\n");
    assert_eq!(printable("Revenue grew.\n```json-wid"), "Revenue grew.\n");
    assert_eq!(printable("Revenue grew."), "Revenue grew.");
}

#[test]
fn next_chunk_reports_growth_only() {
    assert_eq!(next_chunk("", "Hello"), Chunk::Append("Hello"));
    assert_eq!(next_chunk("Hel", "Hello"), Chunk::Append("lo"));
    assert_eq!(next_chunk("Hello", "Hello"), Chunk::Unchanged);
    // Trimming after a fence closes shortens the text without diverging.
    assert_eq!(next_chunk("Hello\n", "Hello"), Chunk::Unchanged);
    assert_eq!(next_chunk("Hi", "Hello"), Chunk::Diverged("Hello"));
}

#[test]
fn renderer_streams_text_and_summarises_artifact() {
    let mut buf = Vec::new();
    let mut renderer = Renderer::new();
    let mut message = assistant("Revenue grew");

    renderer.render(&message, &mut buf).unwrap();
    message.content = "Revenue grew 12%.\n```json-widget\n{\"type\": \"kpi\"".into();
    renderer.render(&message, &mut buf).unwrap();

    message.content = "Revenue grew 12%.".into();
    message.artifact = Some(Artifact::new(ArtifactKind::Kpi, "Q3", json!({"value": 12})));
    message.status = MessageStatus::Complete;
    renderer.finish(&message, &mut buf).unwrap();

    assert_eq!(output(buf), "Revenue grew 12%.\n\n[kpi widget] Q3 (value)\n");
}

#[test]
fn renderer_ignores_user_messages() {
    let mut buf = Vec::new();
    Renderer::new().render(&Message::user("hello"), &mut buf).unwrap();
    assert!(buf.is_empty());
}

#[test]
fn unterminated_fence_is_shown_when_finished() {
    let mut buf = Vec::new();
    let mut renderer = Renderer::new();
    let message = assistant("See ```json-widget {\"type\"");

    renderer.render(&message, &mut buf).unwrap();
    renderer.finish(&message, &mut buf).unwrap();

    assert_eq!(output(buf), "See ```json-widget {\"type\"\n");
}

#[test]
fn failed_and_stalled_replies_are_flagged() {
    let mut buf = Vec::new();
    let mut failed = assistant("The model could not be reached.");
    failed.status = MessageStatus::Failed;
    Renderer::new().finish(&failed, &mut buf).unwrap();
    assert_eq!(output(buf), "The model could not be reached.\n(reply failed)\n");

    let mut buf = Vec::new();
    let mut stalled = assistant("Here is a sketch.");
    stalled.status = MessageStatus::Stalled;
    stalled.artifact = Some(Artifact::new(
        ArtifactKind::ImageRequest,
        "Skyline",
        json!({"prompt": "a city skyline at dusk"}),
    ));
    Renderer::new().finish(&stalled, &mut buf).unwrap();
    assert_eq!(
        output(buf),
        "Here is a sketch.\n[image pending] Skyline: a city skyline at dusk\n(the image could not be generated)\n"
    );
}

#[test]
fn image_summary_reports_size() {
    let src = format!("data:image/png;base64,{}", "A".repeat(4096));
    let artifact = Artifact::new(
        ArtifactKind::Image,
        "Skyline",
        json!({"prompt": "a city skyline", "mime_type": "image/png", "src": src}),
    );
    assert_eq!(artifact_summary(&artifact), "[image] Skyline (image/png, 3 KB)");
}

#[test]
fn widget_without_fields_shows_title_only() {
    let artifact = Artifact::new(ArtifactKind::Chart, "Sales", json!({}));
    assert_eq!(artifact_summary(&artifact), "[chart widget] Sales");
}

#[test]
fn stored_messages_print_with_role() {
    let mut buf = Vec::new();
    print_message(&Message::user("hi"), &mut buf).unwrap();

    let mut reply = assistant("Done.");
    reply.artifact = Some(Artifact::new(ArtifactKind::Chart, "Sales", json!({})));
    print_message(&reply, &mut buf).unwrap();

    assert_eq!(output(buf), "you> hi\nprism> Done.\n      [chart widget] Sales\n");
}
