//! End-to-end chat flow against the in-memory backend: inbox loading,
//! unread accounting, realtime delivery, teardown, and send delivery
//! states.

use std::sync::Arc;

use refuge_backend::{
    Backend, BackendConfig, ChatStore, MemoryBackend, Message, Profile, ProfileStore,
};
use refuge_chat::{ChatThread, DeliveryState, Inbox};
use refuge_shared::{ChannelState, Role, UserId};

struct Fixture {
    backend: Arc<MemoryBackend>,
    alice: UserId,
    bob: UserId,
}

async fn fixture() -> Fixture {
    refuge_shared::telemetry::init();

    let backend = Arc::new(MemoryBackend::new());
    let alice = UserId::new();
    let bob = UserId::new();

    for (user, name) in [(alice, "Alice"), (bob, "Bob")] {
        backend
            .upsert_profile(&Profile {
                user,
                display_name: name.to_string(),
                avatar_url: None,
                role: Role::Adopter,
            })
            .await
            .unwrap();
    }

    Fixture {
        backend,
        alice,
        bob,
    }
}

fn as_backend(backend: &Arc<MemoryBackend>) -> Arc<dyn Backend> {
    backend.clone()
}

#[tokio::test]
async fn first_message_creates_conversation_and_unread() {
    let f = fixture().await;

    let mut thread = ChatThread::new(as_backend(&f.backend), Some(f.alice));
    thread.open_with(f.bob).await.unwrap();
    assert!(thread.conversation_id().is_none());

    thread.send("Hi").await.unwrap().expect("message id");
    let conversation = thread.conversation_id().expect("conversation bound");

    // Bob's inbox sees one conversation, one unread, "Hi" as the preview.
    let mut inbox = Inbox::new(as_backend(&f.backend), Some(f.bob));
    inbox.load().await.unwrap();

    assert_eq!(inbox.rows().len(), 1);
    let row = &inbox.rows()[0];
    assert_eq!(row.conversation_id, conversation);
    assert_eq!(row.display_name, "Alice");
    assert_eq!(row.last_message, "Hi");
    assert_eq!(row.unread, 1);
}

#[tokio::test]
async fn unread_counts_match_persisted_rows() {
    let f = fixture().await;

    let mut alice = ChatThread::new(as_backend(&f.backend), Some(f.alice));
    alice.open_with(f.bob).await.unwrap();
    for body in ["one", "two", "three"] {
        alice.send(body).await.unwrap();
    }

    let mut inbox = Inbox::new(as_backend(&f.backend), Some(f.bob));
    inbox.load().await.unwrap();

    let conversation = inbox.rows()[0].conversation_id;
    let persisted = f
        .backend
        .count_unread(conversation, f.bob)
        .await
        .unwrap();
    assert_eq!(inbox.unread_for(conversation), persisted);
    assert_eq!(persisted, 3);
}

#[tokio::test]
async fn opening_thread_zeroes_recipient_not_sender() {
    let f = fixture().await;

    let mut alice = ChatThread::new(as_backend(&f.backend), Some(f.alice));
    alice.open_with(f.bob).await.unwrap();
    alice.send("Hi").await.unwrap();
    let conversation = alice.conversation_id().unwrap();

    let mut alice_inbox = Inbox::new(as_backend(&f.backend), Some(f.alice));
    alice_inbox.load().await.unwrap();
    let alice_before = alice_inbox.unread_for(conversation);

    // Bob views the thread: batch mark-read.
    let mut bob = ChatThread::new(as_backend(&f.backend), Some(f.bob));
    bob.open(conversation).await.unwrap();

    assert_eq!(
        f.backend.count_unread(conversation, f.bob).await.unwrap(),
        0
    );

    // Opening again is idempotent.
    bob.open(conversation).await.unwrap();
    assert_eq!(
        f.backend.count_unread(conversation, f.bob).await.unwrap(),
        0
    );

    // Alice's side of the ledger is untouched.
    alice_inbox.load().await.unwrap();
    assert_eq!(alice_inbox.unread_for(conversation), alice_before);
}

#[tokio::test]
async fn thread_appends_inserts_in_arrival_order() {
    let f = fixture().await;

    let mut alice = ChatThread::new(as_backend(&f.backend), Some(f.alice));
    alice.open_with(f.bob).await.unwrap();
    alice.send("start").await.unwrap();
    let conversation = alice.conversation_id().unwrap();

    let initial: Vec<_> = alice.messages().iter().map(|m| m.message.id).collect();

    let mut inserted = Vec::new();
    for body in ["a", "b", "c"] {
        let message = Message::new(conversation, f.bob, body);
        inserted.push(message.id);
        f.backend.insert_message(&message).await.unwrap();
    }
    alice.pump();

    let visible: Vec<_> = alice.messages().iter().map(|m| m.message.id).collect();
    let expected: Vec<_> = initial.iter().chain(inserted.iter()).copied().collect();
    assert_eq!(visible, expected);

    // Pumping again must not duplicate anything.
    alice.pump();
    assert_eq!(alice.messages().len(), expected.len());
}

#[tokio::test]
async fn thread_history_honors_configured_page_size() {
    let f = fixture().await;

    let mut alice = ChatThread::new(as_backend(&f.backend), Some(f.alice));
    alice.open_with(f.bob).await.unwrap();
    for body in ["one", "two", "three"] {
        alice.send(body).await.unwrap();
    }
    let conversation = alice.conversation_id().unwrap();

    let config = BackendConfig {
        thread_page_size: 2,
        ..BackendConfig::default()
    };
    let mut bob = ChatThread::new(as_backend(&f.backend), Some(f.bob))
        .with_page_size(config.thread_page_size);
    bob.open(conversation).await.unwrap();

    // Only the most recent page is loaded, oldest first within it.
    let bodies: Vec<_> = bob
        .messages()
        .iter()
        .map(|m| m.message.body.as_str())
        .collect();
    assert_eq!(bodies, vec!["two", "three"]);
}

#[tokio::test]
async fn remount_never_duplicates_events() {
    let f = fixture().await;

    let mut alice = ChatThread::new(as_backend(&f.backend), Some(f.alice));
    alice.open_with(f.bob).await.unwrap();
    alice.send("Hi").await.unwrap();
    let conversation = alice.conversation_id().unwrap();

    let mut inbox = Inbox::new(as_backend(&f.backend), Some(f.bob));
    inbox.load().await.unwrap();
    inbox.mount().unwrap();
    inbox.unmount();
    inbox.mount().unwrap();
    assert_eq!(inbox.channel_state(), ChannelState::Subscribed);

    let before = inbox.unread_for(conversation);
    f.backend
        .insert_message(&Message::new(conversation, f.alice, "ping"))
        .await
        .unwrap();
    inbox.pump().await.unwrap();

    // Exactly one increment across the mount/unmount/mount cycle.
    assert_eq!(inbox.unread_for(conversation), before + 1);
    assert_eq!(inbox.rows()[0].last_message, "ping");

    inbox.unmount();
    assert_eq!(f.backend.subscriber_count(), 1); // only Alice's thread channel
}

#[tokio::test]
async fn inbox_update_event_triggers_full_reload() {
    let f = fixture().await;

    let mut alice = ChatThread::new(as_backend(&f.backend), Some(f.alice));
    alice.open_with(f.bob).await.unwrap();
    alice.send("Hi").await.unwrap();
    let conversation = alice.conversation_id().unwrap();

    let mut alice_inbox = Inbox::new(as_backend(&f.backend), Some(f.alice));
    alice_inbox.load().await.unwrap();
    alice_inbox.mount().unwrap();

    // Bob reads the thread; the resulting update events reload Alice's
    // inbox, which stays consistent with the server.
    let mut bob = ChatThread::new(as_backend(&f.backend), Some(f.bob));
    bob.open(conversation).await.unwrap();
    alice_inbox.pump().await.unwrap();

    assert_eq!(alice_inbox.rows().len(), 1);
    assert_eq!(alice_inbox.unread_for(conversation), 0);
}

#[tokio::test]
async fn failed_load_clears_rows_and_reports() {
    let f = fixture().await;

    let mut alice = ChatThread::new(as_backend(&f.backend), Some(f.alice));
    alice.open_with(f.bob).await.unwrap();
    alice.send("Hi").await.unwrap();

    let mut inbox = Inbox::new(as_backend(&f.backend), Some(f.bob));
    inbox.load().await.unwrap();
    assert_eq!(inbox.rows().len(), 1);

    f.backend.set_offline(true);
    let result = inbox.load().await;

    assert!(result.is_err());
    assert!(inbox.rows().is_empty());
    assert_eq!(inbox.total_unread(), 0);
}

#[tokio::test]
async fn missing_identity_is_a_noop() {
    let f = fixture().await;

    let mut inbox = Inbox::new(as_backend(&f.backend), None);
    inbox.load().await.unwrap();
    inbox.mount().unwrap();
    assert!(inbox.rows().is_empty());
    assert_eq!(inbox.channel_state(), ChannelState::Disconnected);

    let mut thread = ChatThread::new(as_backend(&f.backend), None);
    thread.open_with(f.bob).await.unwrap();
    assert_eq!(thread.send("dropped").await.unwrap(), None);
    assert!(thread.messages().is_empty());
}

#[tokio::test]
async fn failed_send_is_visible_and_retryable() {
    let f = fixture().await;

    let mut alice = ChatThread::new(as_backend(&f.backend), Some(f.alice));
    alice.open_with(f.bob).await.unwrap();
    alice.send("warm up").await.unwrap();

    f.backend.set_offline(true);
    let err = alice.send("flaky").await;
    assert!(err.is_err());

    let failed = alice
        .messages()
        .iter()
        .find(|m| m.delivery == DeliveryState::Failed)
        .expect("failed send stays visible");
    let failed_id = failed.message.id;
    assert_eq!(failed.message.body, "flaky");

    f.backend.set_offline(false);
    alice.retry(failed_id).await.unwrap();

    let entry = alice
        .messages()
        .iter()
        .find(|m| m.message.id == failed_id)
        .unwrap();
    assert_eq!(entry.delivery, DeliveryState::Confirmed);

    // And the row really is on the server now.
    let conversation = alice.conversation_id().unwrap();
    let persisted = f.backend.messages_for(conversation, 50).await.unwrap();
    assert!(persisted.iter().any(|m| m.id == failed_id));
}

#[tokio::test]
async fn deleting_conversation_cascades_and_forgets() {
    let f = fixture().await;

    let mut alice = ChatThread::new(as_backend(&f.backend), Some(f.alice));
    alice.open_with(f.bob).await.unwrap();
    alice.send("Hi").await.unwrap();
    let conversation = alice.conversation_id().unwrap();
    alice.close();

    let mut inbox = Inbox::new(as_backend(&f.backend), Some(f.bob));
    inbox.load().await.unwrap();
    assert!(inbox.delete_conversation(conversation).await.unwrap());

    assert!(inbox.rows().is_empty());
    assert_eq!(inbox.unread_for(conversation), 0);
    assert!(f
        .backend
        .messages_for(conversation, 50)
        .await
        .unwrap()
        .is_empty());
}
