//! Integration tests for the activity chat channel: connect, fan-out,
//! disconnect, re-register and rejected submissions.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::time::Duration;

use activity_chat::db::models::{ActivityId, NewActivity, NewUser, UserId};
use activity_chat::state::AppState;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Helper: start the server on a random port and return (base_url, addr, state).
/// The returned state shares the server's store so tests can seed it directly.
async fn start_test_server() -> (String, SocketAddr, AppState) {
    let db = activity_chat::db::init_db(false).expect("Failed to init store");
    let state = AppState::new(db, 200);

    let app = activity_chat::routes::build_router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), addr, state)
}

fn create_user(state: &AppState, username: &str) -> UserId {
    state
        .db
        .create_user(NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            display_name: username.to_string(),
            bio: None,
            location: None,
            profile_image: None,
            interests: BTreeSet::new(),
            wishlist: BTreeSet::new(),
        })
        .expect("Failed to create user")
        .id
}

fn create_activity(state: &AppState, creator: UserId) -> ActivityId {
    state
        .db
        .create_activity(NewActivity {
            title: "Evening run".to_string(),
            description: "5k around the park, all paces welcome".to_string(),
            creator_id: creator,
            location: "Riverside Park".to_string(),
            date_time: Utc::now() + chrono::Duration::days(1),
            max_participants: None,
            categories: BTreeSet::new(),
            image: None,
        })
        .expect("Failed to create activity")
        .id
}

fn join(state: &AppState, activity: ActivityId, user: UserId) {
    state
        .db
        .add_activity_participant(activity, user)
        .expect("Failed to join activity");
}

/// Connect as `user_id` and wait until the server-side actor is running.
/// A ping round-trip guarantees the connection has been registered.
async fn connect(addr: SocketAddr, user_id: UserId) -> WsClient {
    let url = format!("ws://{}/ws?userId={}", addr, user_id);
    let (mut ws, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("Failed to connect");

    ws.send(Message::Ping(vec![1].into()))
        .await
        .expect("Failed to send ping");
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("Expected pong within timeout");
        if let Some(Ok(Message::Pong(_))) = msg {
            break;
        }
    }
    ws
}

async fn send_chat(ws: &mut WsClient, activity_id: ActivityId, sender_id: UserId, content: &str) {
    let frame = json!({
        "type": "activity-chat",
        "activityId": activity_id,
        "senderId": sender_id,
        "content": content,
    });
    ws.send(Message::Text(frame.to_string().into()))
        .await
        .expect("Failed to send chat frame");
}

/// Next JSON text frame, skipping control frames.
async fn next_json(ws: &mut WsClient) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("Expected a frame within timeout");
        match msg {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(text.as_str()).expect("Frame should be JSON")
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            other => panic!("Expected text frame, got: {:?}", other),
        }
    }
}

/// Assert no text frame arrives within a short window.
async fn assert_silent(ws: &mut WsClient) {
    match tokio::time::timeout(Duration::from_millis(300), ws.next()).await {
        Err(_) => {}
        Ok(Some(Ok(Message::Text(text)))) => panic!("Unexpected frame: {}", text.as_str()),
        Ok(_) => {}
    }
}

async fn history(base_url: &str, activity_id: ActivityId, as_user: UserId) -> Vec<Value> {
    reqwest::Client::new()
        .get(format!("{}/api/activities/{}/messages", base_url, activity_id))
        .header("x-user-id", as_user.to_string())
        .send()
        .await
        .expect("History request failed")
        .json()
        .await
        .expect("History should be JSON")
}

async fn expect_close_4002(url: String) {
    let (mut ws, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("WebSocket should upgrade even with an unusable user id");

    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("Expected close message within timeout");

    match msg {
        Some(Ok(Message::Close(Some(frame)))) => {
            assert_eq!(frame.code, CloseCode::from(4002), "Expected close code 4002");
        }
        other => panic!("Expected close frame, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_ws_rejects_missing_invalid_and_unknown_user() {
    let (_base_url, addr, _state) = start_test_server().await;

    expect_close_4002(format!("ws://{}/ws", addr)).await;
    expect_close_4002(format!("ws://{}/ws?userId=abc", addr)).await;
    expect_close_4002(format!("ws://{}/ws?userId=999", addr)).await;
}

#[tokio::test]
async fn test_ws_ping_pong() {
    let (_base_url, addr, state) = start_test_server().await;
    let alice = create_user(&state, "alice");

    let mut ws = connect(addr, alice).await;
    assert!(state.connections.is_connected(alice));

    ws.send(Message::Ping(vec![42, 43, 44].into()))
        .await
        .expect("Failed to send ping");
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("Expected pong within timeout");
    match msg {
        Some(Ok(Message::Pong(data))) => {
            assert_eq!(data.as_ref(), &[42, 43, 44], "Pong data should match ping");
        }
        other => panic!("Expected Pong message, got: {:?}", other),
    }

    // One ping, one pong
    match tokio::time::timeout(Duration::from_millis(300), ws.next()).await {
        Err(_) => {}
        Ok(other) => panic!("Expected no further frame, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_chat_reaches_every_connected_participant() {
    let (base_url, addr, state) = start_test_server().await;
    let a = create_user(&state, "alice");
    let b = create_user(&state, "bobby");

    let mut activity = 0;
    for _ in 0..7 {
        activity = create_activity(&state, a);
    }
    assert_eq!(activity, 7);
    join(&state, activity, a);
    join(&state, activity, b);

    let mut ws_a = connect(addr, a).await;
    let mut ws_b = connect(addr, b).await;

    send_chat(&mut ws_a, activity, a, "hi").await;

    for ws in [&mut ws_a, &mut ws_b] {
        let frame = next_json(ws).await;
        assert_eq!(frame["type"], "activity-message");
        assert_eq!(frame["message"]["activityId"], 7);
        assert_eq!(frame["message"]["senderId"], a);
        assert_eq!(frame["message"]["content"], "hi");
        assert!(frame["message"]["id"].is_i64());
        assert!(frame["message"]["sentAt"].is_string());
    }
    assert_silent(&mut ws_a).await;
    assert_silent(&mut ws_b).await;

    let messages = history(&base_url, activity, b).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "hi");
    assert_eq!(messages[0]["senderId"], a);
}

#[tokio::test]
async fn test_disconnected_participant_only_sees_history() {
    let (base_url, addr, state) = start_test_server().await;
    let a = create_user(&state, "alice");
    let b = create_user(&state, "bobby");
    let c = create_user(&state, "carol");
    let activity = create_activity(&state, a);
    for user in [a, b, c] {
        join(&state, activity, user);
    }

    let mut ws_a = connect(addr, a).await;
    let mut ws_b = connect(addr, b).await;
    assert!(!state.connections.is_connected(c));

    send_chat(&mut ws_b, activity, b, "see you there").await;

    assert_eq!(next_json(&mut ws_a).await["message"]["content"], "see you there");
    assert_eq!(next_json(&mut ws_b).await["message"]["content"], "see you there");

    let messages = history(&base_url, activity, c).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "see you there");
}

#[tokio::test]
async fn test_no_delivery_after_disconnect_even_after_reconnect() {
    let (base_url, addr, state) = start_test_server().await;
    let a = create_user(&state, "alice");
    let c = create_user(&state, "carol");
    let activity = create_activity(&state, a);
    join(&state, activity, a);
    join(&state, activity, c);

    let mut ws_a = connect(addr, a).await;
    let mut ws_c = connect(addr, c).await;
    ws_c.close(None).await.expect("Failed to close");
    drop(ws_c);

    // Wait for the server to drop carol's entry
    for _ in 0..20 {
        if !state.connections.is_connected(c) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(!state.connections.is_connected(c));

    send_chat(&mut ws_a, activity, a, "while you were away").await;
    assert_eq!(next_json(&mut ws_a).await["message"]["content"], "while you were away");

    let mut ws_c = connect(addr, c).await;
    assert_silent(&mut ws_c).await;

    let messages = history(&base_url, activity, c).await;
    assert_eq!(messages.len(), 1);

    send_chat(&mut ws_a, activity, a, "welcome back").await;
    assert_eq!(next_json(&mut ws_c).await["message"]["content"], "welcome back");
}

#[tokio::test]
async fn test_second_connection_replaces_first() {
    let (_base_url, addr, state) = start_test_server().await;
    let a = create_user(&state, "alice");
    let b = create_user(&state, "bobby");
    let activity = create_activity(&state, a);
    join(&state, activity, a);
    join(&state, activity, b);

    let mut first_tab = connect(addr, a).await;
    let mut second_tab = connect(addr, a).await;
    let mut ws_b = connect(addr, b).await;

    send_chat(&mut ws_b, activity, b, "which tab?").await;

    assert_eq!(next_json(&mut second_tab).await["message"]["content"], "which tab?");
    assert_silent(&mut first_tab).await;

    // Closing the displaced tab must not unregister the live one
    first_tab.close(None).await.expect("Failed to close");
    drop(first_tab);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(state.connections.is_connected(a));

    send_chat(&mut ws_b, activity, b, "still here").await;
    assert_eq!(next_json(&mut second_tab).await["message"]["content"], "still here");
}

#[tokio::test]
async fn test_whitespace_only_content_is_rejected() {
    let (base_url, addr, state) = start_test_server().await;
    let a = create_user(&state, "alice");
    let b = create_user(&state, "bobby");
    let activity = create_activity(&state, a);
    join(&state, activity, a);
    join(&state, activity, b);

    let mut ws_a = connect(addr, a).await;
    let mut ws_b = connect(addr, b).await;

    send_chat(&mut ws_a, activity, a, "   \n ").await;

    let frame = next_json(&mut ws_a).await;
    assert_eq!(frame["type"], "error");
    assert_eq!(frame["message"], "Message content cannot be empty");
    assert_silent(&mut ws_b).await;
    assert!(history(&base_url, activity, a).await.is_empty());
}

#[tokio::test]
async fn test_non_participant_and_unknown_activity_are_rejected() {
    let (base_url, addr, state) = start_test_server().await;
    let a = create_user(&state, "alice");
    let c = create_user(&state, "carol");
    let activity = create_activity(&state, a);
    join(&state, activity, a);

    let mut ws_a = connect(addr, a).await;
    let mut ws_c = connect(addr, c).await;

    send_chat(&mut ws_c, activity, c, "can I come?").await;
    let frame = next_json(&mut ws_c).await;
    assert_eq!(frame["type"], "error");
    assert_eq!(frame["message"], "You are not a participant in this activity");
    assert_silent(&mut ws_a).await;

    send_chat(&mut ws_a, 404, a, "anyone?").await;
    let frame = next_json(&mut ws_a).await;
    assert_eq!(frame["type"], "error");
    assert_eq!(frame["message"], "Activity not found");

    // Claiming to be someone else
    send_chat(&mut ws_c, activity, a, "I am alice").await;
    assert_eq!(next_json(&mut ws_c).await["type"], "error");

    assert!(history(&base_url, activity, a).await.is_empty());
}

#[tokio::test]
async fn test_malformed_frames_keep_channel_open() {
    let (base_url, addr, state) = start_test_server().await;
    let a = create_user(&state, "alice");
    let activity = create_activity(&state, a);
    join(&state, activity, a);

    let mut ws = connect(addr, a).await;

    ws.send(Message::Text("{not json".into())).await.unwrap();
    let frame = next_json(&mut ws).await;
    assert_eq!(frame["type"], "error");
    assert_eq!(frame["message"], "Failed to process message");

    ws.send(Message::Text(r#"{"type":"typing","activityId":1}"#.into()))
        .await
        .unwrap();
    let frame = next_json(&mut ws).await;
    assert_eq!(frame["type"], "error");
    assert!(frame["message"].as_str().unwrap().starts_with("Invalid message"));

    ws.send(Message::Binary(vec![1, 2, 3].into())).await.unwrap();
    let frame = next_json(&mut ws).await;
    assert_eq!(frame["message"], "Expected a JSON text frame");

    send_chat(&mut ws, activity, a, "still works").await;
    let frame = next_json(&mut ws).await;
    assert_eq!(frame["type"], "activity-message");
    assert_eq!(frame["message"]["content"], "still works");
    assert_eq!(history(&base_url, activity, a).await.len(), 1);
}

#[tokio::test]
async fn test_messages_arrive_in_send_order() {
    let (base_url, addr, state) = start_test_server().await;
    let a = create_user(&state, "alice");
    let b = create_user(&state, "bobby");
    let activity = create_activity(&state, a);
    join(&state, activity, a);
    join(&state, activity, b);

    let mut ws_a = connect(addr, a).await;
    let mut ws_b = connect(addr, b).await;

    for i in 0..5 {
        send_chat(&mut ws_a, activity, a, &format!("msg {}", i)).await;
    }

    let mut last_id = 0;
    for i in 0..5 {
        let frame = next_json(&mut ws_b).await;
        assert_eq!(frame["message"]["content"], format!("msg {}", i));
        let id = frame["message"]["id"].as_i64().unwrap();
        assert!(id > last_id, "Message ids must increase");
        last_id = id;
    }

    let messages = history(&base_url, activity, b).await;
    let contents: Vec<&str> = messages
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["msg 0", "msg 1", "msg 2", "msg 3", "msg 4"]);

    // Reading history does not change it
    assert_eq!(history(&base_url, activity, b).await, messages);
}
