use prism_chat::{ConversationStore, MessagePatch};
use prism_core::models::artifact::{Artifact, ArtifactKind};
use prism_core::models::message::{Message, MessageStatus, Role, new_message_id};
use prism_core::models::session::Session;
use serde_json::json;

#[test]
fn append_keeps_turn_order() {
    let store = ConversationStore::new("alice");
    let first = Message::user("one");
    let second = Message::assistant_placeholder(new_message_id());
    let third = Message::user("two");
    let ids = [first.id, second.id, third.id];

    assert!(store.append(first));
    assert!(store.append(second));
    assert!(store.append(third));

    let order: Vec<_> = store.snapshot().iter().map(|m| m.id).collect();
    assert_eq!(order, ids);
    assert_eq!(store.len(), 3);
    assert_eq!(store.last().map(|m| m.id), Some(ids[2]));
}

#[test]
fn duplicate_ids_are_rejected() {
    let store = ConversationStore::new("alice");
    let message = Message::user("hello");

    assert!(store.append(message.clone()));
    assert!(!store.append(message));
    assert_eq!(store.len(), 1);
}

#[test]
fn update_touches_only_the_target() {
    let store = ConversationStore::new("alice");
    let user = Message::user("question");
    let assistant_id = new_message_id();
    store.append(user.clone());
    store.append(Message::assistant_placeholder(assistant_id));

    let artifact = Artifact::new(ArtifactKind::Chart, "Sales", json!({"series": []}));
    let patch = MessagePatch {
        content: Some("answer".into()),
        artifact: Some(Some(artifact.clone())),
        metadata: None,
        status: Some(MessageStatus::Complete),
    };
    assert!(store.update_by_id(assistant_id, patch));

    let updated = store.get(assistant_id).unwrap();
    assert_eq!(updated.content, "answer");
    assert_eq!(updated.artifact, Some(artifact));
    assert_eq!(updated.status, MessageStatus::Complete);
    assert_eq!(updated.role, Role::Assistant);
    assert_eq!(store.get(user.id), Some(user));
}

#[test]
fn patch_can_clear_artifact() {
    let store = ConversationStore::new("alice");
    let id = new_message_id();
    store.append(Message::assistant_placeholder(id));
    store.update_by_id(
        id,
        MessagePatch::artifact(Artifact::new(ArtifactKind::Kpi, "K", json!({}))),
    );

    store.update_by_id(
        id,
        MessagePatch {
            artifact: Some(None),
            ..MessagePatch::default()
        },
    );
    assert!(store.get(id).unwrap().artifact.is_none());
}

#[test]
fn updates_after_reset_are_dropped() {
    let store = ConversationStore::new("alice");
    let stale = new_message_id();
    store.append(Message::assistant_placeholder(stale));
    let before = store.session_id();

    let after = store.reset();
    assert_ne!(before, after);
    assert_eq!(store.session_id(), after);
    assert!(store.is_empty());
    assert_eq!(store.user_key(), "alice");

    assert!(!store.update_by_id(stale, MessagePatch::status(MessageStatus::Complete)));
    assert!(store.is_empty());
}

#[test]
fn every_mutation_bumps_revision() {
    let store = ConversationStore::new("alice");
    let rx = store.subscribe();
    assert_eq!(*rx.borrow(), 0);

    let id = new_message_id();
    store.append(Message::assistant_placeholder(id));
    store.update_by_id(id, MessagePatch::status(MessageStatus::Complete));
    store.update_by_id(new_message_id(), MessagePatch::default());
    store.reset();

    assert_eq!(*rx.borrow(), 3);
}

#[test]
fn restore_adopts_session() {
    let mut session = Session::new("alice");
    session.title = Some("Earlier chat".into());
    session.messages.push(Message::user("first"));
    session.messages.push(Message::user("second"));

    let store = ConversationStore::new("alice");
    assert_eq!(store.restore(session.clone()), 0);

    assert_eq!(store.session_id(), session.id);
    assert_eq!(store.session(), session);
}

#[test]
fn restore_settles_replies_left_in_flight() {
    let mut session = Session::new("alice");
    session.messages.push(Message::user("question"));
    let mut streaming = Message::assistant_placeholder(new_message_id());
    streaming.content = "Half an ans".into();
    let mut resolving = Message::assistant_placeholder(new_message_id());
    resolving.content = "Here is a sketch.".into();
    resolving.status = MessageStatus::Resolving;
    let silent = Message::assistant_placeholder(new_message_id());
    session.messages.extend([streaming, resolving, silent]);

    let store = ConversationStore::new("alice");
    assert_eq!(store.restore(session), 3);

    let messages = store.snapshot();
    let statuses: Vec<_> = messages.iter().map(|m| m.status).collect();
    assert_eq!(
        statuses,
        [
            MessageStatus::Complete,
            MessageStatus::Failed,
            MessageStatus::Stalled,
            MessageStatus::Failed,
        ]
    );
    assert!(messages[1].content.starts_with("Half an ans\n\nSorry, the response was interrupted"));
    assert_eq!(messages[2].content, "Here is a sketch.");
    assert!(messages[3].content.starts_with("Sorry, the response was interrupted"));
}

#[test]
fn clones_share_state() {
    let store = ConversationStore::new("alice");
    let other = store.clone();
    other.append(Message::user("shared"));
    assert_eq!(store.len(), 1);
}
