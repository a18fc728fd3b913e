//! End-to-end chat flows: messages, read receipts, typing, presence.

mod common;

use common::TestApp;
use fanout_pipeline::domain::entities::MessageType;
use fanout_pipeline::domain::events::{ChatEventKind, ChatPayload};

#[tokio::test]
async fn message_reaches_connected_receiver() {
    let app = TestApp::start();
    let mut bob_rx = app.pipeline.gateway.connect("bob");

    let saved = app
        .pipeline
        .chat_service
        .send_message("alice", "bob", "hello", MessageType::Text)
        .await
        .unwrap();

    let pushed = bob_rx.recv().await.unwrap();
    assert_eq!(pushed.kind(), ChatEventKind::Message);
    match pushed.payload {
        ChatPayload::Message(message) => {
            assert_eq!(message.id, saved.id);
            assert_eq!(message.content, "hello");
            assert_eq!(message.room_id, "alice_bob");
        }
        other => panic!("expected message payload, got {:?}", other),
    }

    app.stop().await;
}

#[tokio::test]
async fn offline_receiver_still_accumulates_unread() {
    let app = TestApp::start();
    let service = app.pipeline.chat_service.clone();

    service
        .send_message("alice", "bob", "are you there?", MessageType::Text)
        .await
        .unwrap();

    assert_eq!(service.unread_total("bob").await.unwrap(), 1);
    assert_eq!(service.unread_in_room("alice_bob", "bob").await.unwrap(), 1);

    // The event was consumed and dropped without error
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(service.unread_total("bob").await.unwrap(), 1);

    app.stop().await;
}

#[tokio::test]
async fn read_receipt_reaches_the_sender() {
    let app = TestApp::start();
    let service = app.pipeline.chat_service.clone();
    let mut alice_rx = app.pipeline.gateway.connect("alice");

    let saved = service
        .send_message("alice", "bob", "ping", MessageType::Text)
        .await
        .unwrap();

    let (flipped, cursor) = service.mark_read("alice_bob", "bob").await.unwrap();
    assert_eq!(flipped, 1);
    assert_eq!(cursor, Some(saved.id));
    assert_eq!(service.unread_in_room("alice_bob", "bob").await.unwrap(), 0);

    let receipt = alice_rx.recv().await.unwrap();
    assert_eq!(receipt.kind(), ChatEventKind::Read);
    assert_eq!(
        receipt.payload,
        ChatPayload::Read {
            last_read_message_id: saved.id
        }
    );

    // The reader's cursor advanced and stays monotonic
    let room = service.resolve_room("alice", "bob").await.unwrap();
    assert_eq!(room.cursor_for("bob"), Some(saved.id));

    app.stop().await;
}

#[tokio::test]
async fn typing_indicator_reaches_the_peer() {
    let app = TestApp::start();
    let service = app.pipeline.chat_service.clone();
    service.resolve_room("alice", "bob").await.unwrap();
    let mut bob_rx = app.pipeline.gateway.connect("bob");

    service.send_typing("alice_bob", "alice", true).await.unwrap();

    let event = bob_rx.recv().await.unwrap();
    assert_eq!(event.kind(), ChatEventKind::Typing);
    assert_eq!(event.payload, ChatPayload::Typing { typing: true });
    assert_eq!(event.sender_id, "alice");

    app.stop().await;
}

#[tokio::test]
async fn presence_transition_fans_out_to_each_room_peer() {
    let app = TestApp::start();
    let service = app.pipeline.chat_service.clone();
    service.resolve_room("alice", "bob").await.unwrap();
    service.resolve_room("alice", "carol").await.unwrap();

    let mut bob_rx = app.pipeline.gateway.connect("bob");
    let mut carol_rx = app.pipeline.gateway.connect("carol");

    let notified = app
        .pipeline
        .presence_service
        .set_online("alice", true)
        .await
        .unwrap();
    assert_eq!(notified, 2);
    assert!(app.pipeline.presence_service.is_online("alice"));

    for rx in [&mut bob_rx, &mut carol_rx] {
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind(), ChatEventKind::Online);
        assert_eq!(event.sender_id, "alice");
    }

    app.pipeline
        .presence_service
        .set_online("alice", false)
        .await
        .unwrap();
    let event = bob_rx.recv().await.unwrap();
    assert_eq!(event.kind(), ChatEventKind::Offline);
    assert!(!app.pipeline.presence_service.is_online("alice"));

    app.stop().await;
}

#[tokio::test]
async fn room_history_and_summaries() {
    let app = TestApp::start();
    let service = app.pipeline.chat_service.clone();

    for text in ["one", "two", "three"] {
        service
            .send_message("alice", "bob", text, MessageType::Text)
            .await
            .unwrap();
    }
    service
        .send_message("bob", "alice", "four", MessageType::Text)
        .await
        .unwrap();

    // Newest first, keyset pagination
    let page = service.messages("alice_bob", "alice", None, 2).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].content, "four");
    assert_eq!(page[1].content, "three");

    let older = service
        .messages("alice_bob", "alice", Some(page[1].id), 10)
        .await
        .unwrap();
    assert_eq!(older.len(), 2);
    assert_eq!(older[0].content, "two");

    let summaries = service.rooms("bob").await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].unread_count, 3);
    assert_eq!(
        summaries[0].latest_message.as_ref().unwrap().content,
        "four"
    );

    assert_eq!(service.unread_total("alice").await.unwrap(), 1);

    app.stop().await;
}
