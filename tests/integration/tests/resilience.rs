//! Storage outages, rate limiting and connection limits over real sockets.

use coursehub_core::{Config, RoomName};
use coursehub_gateway::ServerEvent;
use coursehub_integration_tests::{
    assert_silent, expect_close, next_event, ping, send_json, TestGateway,
};
use coursehub_store::Store;
use futures::future::join_all;
use futures::SinkExt;
use serde_json::json;
use std::time::Duration;
use tokio_tungstenite::tungstenite;

const QUIET: Duration = Duration::from_millis(200);

fn error_code(event: &ServerEvent) -> &str {
    match event {
        ServerEvent::Error { code, .. } => code,
        other => panic!("expected an error frame, got {:?}", other),
    }
}

fn with_storage_threshold(failures: u32) -> Config {
    let mut config = Config::default();
    config.gateway.max_storage_failures = failures;
    config
}

#[tokio::test]
async fn test_storage_failure_is_reported_and_connection_survives() {
    let server = TestGateway::start().await;
    let mut emma = server.join_room("1", &server.student).await;
    let mut liam = server.join_room("1", &server.other).await;
    ping(&mut emma).await;
    ping(&mut liam).await;

    server.fail_writes(true);
    send_json(&mut emma, json!({"body": "lost to the outage"})).await;
    assert_eq!(error_code(&next_event(&mut emma).await), "storage_failure");

    // Nothing was stored, so nothing was broadcast
    assert_silent(&mut liam, QUIET).await;
    ping(&mut emma).await;

    server.fail_writes(false);
    send_json(&mut emma, json!({"body": "back again"})).await;
    match next_event(&mut liam).await {
        ServerEvent::ChatMessage { body, .. } => assert_eq!(body, "back again"),
        other => panic!("unexpected frame: {:?}", other),
    }

    let room = RoomName::new("1").unwrap();
    assert_eq!(server.store.count_chat_messages(&room).unwrap(), 1);
}

#[tokio::test]
async fn test_connection_closes_after_repeated_storage_failures() {
    let server = TestGateway::start_with(with_storage_threshold(2)).await;
    let mut emma = server.join_room("1", &server.student).await;
    ping(&mut emma).await;

    server.fail_writes(true);
    send_json(&mut emma, json!({"body": "first"})).await;
    send_json(&mut emma, json!({"body": "second"})).await;

    let events = expect_close(&mut emma).await;
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| error_code(e) == "storage_failure"));
}

#[tokio::test]
async fn test_ping_does_not_reset_storage_failures() {
    let server = TestGateway::start_with(with_storage_threshold(2)).await;
    let mut emma = server.join_room("1", &server.student).await;
    ping(&mut emma).await;

    server.fail_writes(true);
    send_json(&mut emma, json!({"body": "first"})).await;
    assert_eq!(error_code(&next_event(&mut emma).await), "storage_failure");

    ping(&mut emma).await;
    send_json(&mut emma, json!({"type": "typing"})).await;

    send_json(&mut emma, json!({"body": "second"})).await;
    let events = expect_close(&mut emma).await;
    assert_eq!(events.len(), 1);
    assert_eq!(error_code(&events[0]), "storage_failure");
}

#[tokio::test]
async fn test_successful_write_resets_storage_failures() {
    let server = TestGateway::start_with(with_storage_threshold(2)).await;
    let mut emma = server.join_room("1", &server.student).await;
    ping(&mut emma).await;

    server.fail_writes(true);
    send_json(&mut emma, json!({"body": "first"})).await;
    assert_eq!(error_code(&next_event(&mut emma).await), "storage_failure");

    server.fail_writes(false);
    send_json(&mut emma, json!({"body": "stored"})).await;
    assert!(matches!(next_event(&mut emma).await, ServerEvent::ChatMessage { .. }));

    server.fail_writes(true);
    send_json(&mut emma, json!({"body": "second"})).await;
    assert_eq!(error_code(&next_event(&mut emma).await), "storage_failure");

    // Still one short of the threshold
    ping(&mut emma).await;
}

#[tokio::test]
async fn test_burst_above_rate_limit_is_refused() {
    let mut config = Config::default();
    config.gateway.max_messages_per_second = 3;
    let server = TestGateway::start_with(config).await;
    let mut emma = server.join_room("1", &server.student).await;

    for i in 0..5 {
        send_json(&mut emma, json!({"body": format!("message {}", i)})).await;
    }

    for i in 0..3 {
        match next_event(&mut emma).await {
            ServerEvent::ChatMessage { body, .. } => assert_eq!(body, format!("message {}", i)),
            other => panic!("unexpected frame: {:?}", other),
        }
    }
    for _ in 0..2 {
        assert_eq!(error_code(&next_event(&mut emma).await), "rate_limited");
    }

    // Limited frames were dropped, not stored
    let room = RoomName::new("1").unwrap();
    assert_eq!(server.store.count_chat_messages(&room).unwrap(), 3);
}

#[tokio::test]
async fn test_connection_limit_holds_under_concurrent_upgrades() {
    let mut config = Config::default();
    config.gateway.max_connections = 1;
    let server = TestGateway::start_with(config).await;
    let url = server.ws_url("/ws/chat/1", Some(&server.student.token));

    let attempts = join_all((0..5).map(|_| tokio_tungstenite::connect_async(url.clone()))).await;

    let mut admitted = Vec::new();
    for attempt in attempts {
        match attempt {
            Ok((client, _)) => admitted.push(client),
            Err(tungstenite::Error::Http(response)) => {
                assert_eq!(response.status().as_u16(), 503)
            }
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(admitted.len(), 1);
    assert_eq!(server.gateway.state().connection_count(), 1);

    // Closing the admitted connection frees its slot
    let mut first = admitted.pop().unwrap();
    first.close(None).await.unwrap();

    for _ in 0..50 {
        if let Ok((mut client, _)) = tokio_tungstenite::connect_async(url.clone()).await {
            ping(&mut client).await;
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("slot was never released");
}
