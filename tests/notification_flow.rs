//! End-to-end notification flows over the full wired pipeline.

mod common;

use common::{wait_until, TestApp};
use fanout_pipeline::domain::events::{NotificationEvent, NotificationKind, RetryJob};
use fanout_pipeline::domain::routing::topics;
use fanout_pipeline::infrastructure::broker::EventBroker;

#[tokio::test]
async fn comment_event_is_routed_persisted_and_counted() {
    let app = TestApp::start();
    app.pipeline.users.register("bob");
    let service = app.pipeline.notification_service.clone();

    let event = NotificationEvent::new(
        "bob",
        NotificationKind::Comment,
        "alice commented on your post",
        Some(42),
    );
    let route = app.pipeline.notification_producer.route(&event);
    assert_eq!(route.topic, topics::NOTIFICATION_COMMENT);
    assert_eq!(route.partition_key, "bob");

    let metadata = app
        .pipeline
        .notification_producer
        .send(&event)
        .unwrap()
        .resolve()
        .await
        .unwrap();
    assert_eq!(metadata.topic, topics::NOTIFICATION_COMMENT);

    wait_until!(service.count_unread("bob").await.unwrap() == 1);

    let stored = service.notifications_for("bob", 10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].kind, NotificationKind::Comment);
    assert_eq!(stored[0].related_post_id, Some(42));
    assert!(!stored[0].read);

    app.stop().await;
}

#[tokio::test]
async fn duplicate_sends_persist_a_single_record() {
    let app = TestApp::start();
    app.pipeline.users.register("bob");
    let service = app.pipeline.notification_service.clone();

    let event = NotificationEvent::new("bob", NotificationKind::Like, "liked", Some(7));
    for _ in 0..3 {
        app.pipeline
            .notification_producer
            .send(&event)
            .unwrap()
            .resolve()
            .await
            .unwrap();
    }

    wait_until!(service.count_unread("bob").await.unwrap() == 1);
    // Nothing further arrives
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(service.count_unread("bob").await.unwrap(), 1);

    app.stop().await;
}

#[tokio::test]
async fn batch_record_fans_out_to_every_recipient() {
    let app = TestApp::start();
    let service = app.pipeline.notification_service.clone();

    let events: Vec<_> = (0..5)
        .map(|i| {
            let user = format!("commenter{}", i);
            app.pipeline.users.register(user.clone());
            NotificationEvent::new(user, NotificationKind::Comment, "new reply", Some(42))
        })
        .collect();

    app.pipeline
        .notification_producer
        .send_batch("post-42", &events)
        .unwrap()
        .resolve()
        .await
        .unwrap();

    // One broker record carried the whole list
    assert_eq!(app.pipeline.broker.depth(topics::NOTIFICATION_BATCH), 1);

    for i in 0..5 {
        let user = format!("commenter{}", i);
        wait_until!(service.count_unread(&user).await.unwrap() == 1);
    }

    app.stop().await;
}

#[tokio::test]
async fn unknown_recipient_dead_letters_without_retries() {
    let app = TestApp::start();

    let event = NotificationEvent::new("ghost", NotificationKind::Follow, "followed you", None);
    app.pipeline
        .notification_producer
        .send(&event)
        .unwrap()
        .resolve()
        .await
        .unwrap();

    let broker = app.pipeline.broker.clone();
    wait_until!(broker.depth(topics::NOTIFICATION_DLQ) == 1);
    assert_eq!(broker.depth(topics::NOTIFICATION_RETRY), 0);
    assert_eq!(
        app.pipeline
            .notification_service
            .count_unread("ghost")
            .await
            .unwrap(),
        0
    );

    // The dead letter is a replayable tagged job wrapping the event
    let partition = broker.partition_for_key("ghost");
    let dead = broker
        .poll("inspector", topics::NOTIFICATION_DLQ, &[partition], 10)
        .await
        .unwrap();
    let job: RetryJob = dead[0].decode().unwrap();
    assert_eq!(job, RetryJob::Event { event });

    app.stop().await;
}

#[tokio::test]
async fn events_for_one_recipient_persist_in_send_order() {
    let app = TestApp::start();
    app.pipeline.users.register("bob");
    let service = app.pipeline.notification_service.clone();

    // Fire-and-forget: per-key order must hold without awaiting handles
    for post in 1..=4 {
        drop(
            app.pipeline
                .notification_producer
                .send(&NotificationEvent::new(
                    "bob",
                    NotificationKind::Like,
                    "liked",
                    Some(post),
                ))
                .unwrap(),
        );
    }

    wait_until!(service.count_unread("bob").await.unwrap() == 4);

    // Newest first: IDs assigned in consumption order
    let stored = service.notifications_for("bob", 10).await.unwrap();
    let posts: Vec<_> = stored.iter().map(|n| n.related_post_id.unwrap()).collect();
    assert_eq!(posts, vec![4, 3, 2, 1]);

    app.stop().await;
}
