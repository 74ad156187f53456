//! End-to-end WebSocket tests against a running gateway.

use coursehub_core::{CourseRef, DomainEvent, NotificationKind, RoomName, UserRef};
use coursehub_gateway::ServerEvent;
use coursehub_integration_tests::{
    assert_silent, next_event, ping, send_json, Client, TestGateway,
};
use coursehub_store::Store;
use futures::SinkExt;
use serde_json::json;
use std::time::Duration;
use tokio_tungstenite::tungstenite::{self, Message};

const QUIET: Duration = Duration::from_millis(200);

fn course() -> CourseRef {
    CourseRef {
        id: "1".to_string(),
        title: "Data Science Fundamentals".to_string(),
    }
}

async fn rejection_status(url: String) -> u16 {
    match tokio_tungstenite::connect_async(url).await {
        Err(tungstenite::Error::Http(response)) => response.status().as_u16(),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("upgrade should have been rejected"),
    }
}

async fn wait_for_connections(server: &TestGateway, expected: usize) {
    for _ in 0..50 {
        if server.gateway.registry().connection_count().await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("registry never reached {} connection(s)", expected);
}

#[tokio::test]
async fn test_chat_message_reaches_everyone_in_room() {
    let server = TestGateway::start().await;
    let mut emma = server.join_room("1", &server.student).await;
    let mut liam = server.join_room("1", &server.other).await;
    ping(&mut emma).await;
    ping(&mut liam).await;

    send_json(&mut emma, json!({"type": "chat_message", "body": "Excited for this course!"})).await;

    for client in [&mut emma, &mut liam] {
        match next_event(client).await {
            ServerEvent::ChatMessage {
                room, sender, body, ..
            } => {
                assert_eq!(room.as_str(), "1");
                assert_eq!(sender.username.as_str(), "emma1");
                assert_eq!(sender.display_name, "Emma Brown");
                assert_eq!(body, "Excited for this course!");
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    let room = RoomName::new("1").unwrap();
    assert_eq!(server.store.count_chat_messages(&room).unwrap(), 1);
}

#[tokio::test]
async fn test_rooms_are_isolated() {
    let server = TestGateway::start().await;
    let mut emma = server.join_room("1", &server.student).await;
    let mut liam = server.join_room("2", &server.other).await;
    ping(&mut emma).await;
    ping(&mut liam).await;

    send_json(&mut emma, json!({"message": "room one only"})).await;

    assert!(matches!(next_event(&mut emma).await, ServerEvent::ChatMessage { .. }));
    assert_silent(&mut liam, QUIET).await;
}

#[tokio::test]
async fn test_display_name_falls_back_to_username() {
    let server = TestGateway::start().await;
    let mut liam = server.join_room("1", &server.other).await;

    send_json(&mut liam, json!({"body": "hi", "sender": "prof_davis"})).await;

    match next_event(&mut liam).await {
        ServerEvent::ChatMessage { sender, .. } => {
            assert_eq!(sender.username.as_str(), "liam");
            assert_eq!(sender.display_name, "liam");
        }
        other => panic!("unexpected frame: {:?}", other),
    }
}

#[tokio::test]
async fn test_upgrade_rejections() {
    let server = TestGateway::start().await;

    assert_eq!(rejection_status(server.ws_url("/ws/chat/1", None)).await, 401);
    assert_eq!(
        rejection_status(server.ws_url("/ws/chat/1", Some("not-a-session"))).await,
        401
    );
    assert_eq!(rejection_status(server.ws_url("/ws/notifications", None)).await, 401);
    assert_eq!(
        rejection_status(server.ws_url("/ws/chat/bad.room", Some(&server.student.token))).await,
        400
    );
}

#[tokio::test]
async fn test_revoked_session_is_rejected() {
    let server = TestGateway::start().await;
    server.store.revoke_session(&server.student.token).unwrap();

    let url = server.ws_url("/ws/chat/1", Some(&server.student.token));
    assert_eq!(rejection_status(url).await, 401);
}

#[tokio::test]
async fn test_bad_frames_get_errors_and_connection_survives() {
    let server = TestGateway::start().await;
    let mut emma = server.join_room("1", &server.student).await;

    emma.send(Message::Text("{not json".to_string())).await.unwrap();
    match next_event(&mut emma).await {
        ServerEvent::Error { code, .. } => assert_eq!(code, "malformed_message"),
        other => panic!("unexpected frame: {:?}", other),
    }

    send_json(&mut emma, json!({"type": "chat_message", "body": "   "})).await;
    assert!(matches!(next_event(&mut emma).await, ServerEvent::Error { .. }));

    // Unknown tags are dropped without a reply
    send_json(&mut emma, json!({"type": "typing"})).await;
    ping(&mut emma).await;

    let room = RoomName::new("1").unwrap();
    assert_eq!(server.store.count_chat_messages(&room).unwrap(), 0);
}

#[tokio::test]
async fn test_enrollment_notifies_instructor() {
    let server = TestGateway::start().await;
    let mut davis = server.open_notifications(&server.instructor).await;
    ping(&mut davis).await;

    let queued = server.gateway.emitter().emit(
        DomainEvent::EnrollmentCreated {
            course: course(),
            student: UserRef {
                username: server.student.username().clone(),
                full_name: server.student.user.full_name.clone(),
            },
            instructor: server.instructor.username().clone(),
        },
        false,
    );
    assert!(queued);

    match next_event(&mut davis).await {
        ServerEvent::Notification {
            id,
            kind,
            message,
            course_id,
            ..
        } => {
            assert!(id.is_some());
            assert_eq!(kind, NotificationKind::Enrollment);
            assert_eq!(message, "Emma Brown has enrolled in Data Science Fundamentals");
            assert_eq!(course_id.as_deref(), Some("1"));
        }
        other => panic!("unexpected frame: {:?}", other),
    }

    let stored = server
        .store
        .list_notifications(server.instructor.username(), true, 10)
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_suppressed_event_has_no_effect() {
    let server = TestGateway::start().await;
    let mut davis = server.open_notifications(&server.instructor).await;
    let mut room = server.join_room("1", &server.student).await;
    ping(&mut davis).await;
    ping(&mut room).await;

    let queued = server.gateway.emitter().emit(
        DomainEvent::StatusPosted {
            course: course(),
            author: UserRef {
                username: server.instructor.username().clone(),
                full_name: server.instructor.user.full_name.clone(),
            },
            title: Some("Week 2".to_string()),
            content: "Slides are up".to_string(),
            recipients: vec![server.student.username().clone()],
        },
        true,
    );
    assert!(!queued);

    assert_silent(&mut davis, QUIET).await;
    assert_silent(&mut room, QUIET).await;
    assert_eq!(
        server
            .store
            .count_notifications(server.student.username())
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_status_post_announces_and_notifies() {
    let server = TestGateway::start().await;
    let mut notifications = server.open_notifications(&server.student).await;
    let mut room = server.join_room("1", &server.student).await;
    ping(&mut notifications).await;
    ping(&mut room).await;

    server.gateway.emitter().emit(
        DomainEvent::StatusPosted {
            course: course(),
            author: UserRef {
                username: server.instructor.username().clone(),
                full_name: server.instructor.user.full_name.clone(),
            },
            title: Some("Week 2".to_string()),
            content: "Slides are up".to_string(),
            recipients: vec![server.student.username().clone()],
        },
        false,
    );

    assert!(matches!(
        next_event(&mut notifications).await,
        ServerEvent::Notification {
            kind: NotificationKind::General,
            ..
        }
    ));
    match next_event(&mut room).await {
        ServerEvent::ChatMessage { sender, .. } => {
            assert_eq!(sender.username.as_str(), "prof_davis");
        }
        other => panic!("unexpected frame: {:?}", other),
    }
}

#[tokio::test]
async fn test_mark_read_over_websocket() {
    let server = TestGateway::start().await;
    let mut emma: Client = server.open_notifications(&server.student).await;
    ping(&mut emma).await;

    for title in ["Lecture Slides - Week 1", "Practical Dataset"] {
        server.gateway.emitter().emit(
            DomainEvent::MaterialUploaded {
                course: course(),
                title: title.to_string(),
                recipients: vec![server.student.username().clone()],
            },
            false,
        );
    }
    let first = match next_event(&mut emma).await {
        ServerEvent::Notification { id: Some(id), .. } => id,
        other => panic!("unexpected frame: {:?}", other),
    };
    assert!(matches!(next_event(&mut emma).await, ServerEvent::Notification { .. }));

    send_json(&mut emma, json!({"type": "mark_read", "id": first})).await;
    assert_eq!(
        next_event(&mut emma).await,
        ServerEvent::Ack {
            action: "mark_read".to_string(),
            updated: 1
        }
    );

    send_json(&mut emma, json!({"type": "mark_read"})).await;
    assert_eq!(
        next_event(&mut emma).await,
        ServerEvent::Ack {
            action: "mark_read".to_string(),
            updated: 1
        }
    );

    let unread = server
        .store
        .list_notifications(server.student.username(), true, 10)
        .unwrap();
    assert!(unread.is_empty());
}

#[tokio::test]
async fn test_disconnect_leaves_groups() {
    let server = TestGateway::start().await;
    let mut emma = server.join_room("1", &server.student).await;
    let mut davis = server.open_notifications(&server.instructor).await;
    ping(&mut emma).await;
    ping(&mut davis).await;
    assert_eq!(server.gateway.registry().group_count().await, 2);

    emma.close(None).await.unwrap();
    wait_for_connections(&server, 1).await;

    davis.close(None).await.unwrap();
    wait_for_connections(&server, 0).await;
    assert_eq!(server.gateway.registry().group_count().await, 0);
}
