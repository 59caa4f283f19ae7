//! End-to-end tests against a real listener on an ephemeral port.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use chat_hub::{serve, Config};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

async fn start_server(history_capacity: usize) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = Config {
        history_capacity,
        ..Config::default()
    };
    tokio::spawn(serve(listener, config));
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    ws
}

async fn send_json(ws: &mut Client, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

async fn recv_json(ws: &mut Client) -> Value {
    loop {
        let msg = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Join and consume the four frames every joiner gets; returns the history frame
async fn join(ws: &mut Client, nickname: &str) -> Value {
    send_json(ws, json!({"type": "join", "nickname": nickname})).await;

    let welcome = recv_json(ws).await;
    assert_eq!(welcome["type"], "welcome");
    let history = recv_json(ws).await;
    assert_eq!(history["type"], "history");
    let system = recv_json(ws).await;
    assert_eq!(system["message"], format!("{} joined the chat", nickname));
    let users = recv_json(ws).await;
    assert_eq!(users["type"], "users");

    history
}

fn nicknames(users: &Value) -> Vec<String> {
    users["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["nickname"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_two_participant_chat() {
    let addr = start_server(50).await;

    let mut alice = connect(addr).await;
    let history = join(&mut alice, "Alice").await;
    assert_eq!(history["messages"], json!([]));

    let mut bob = connect(addr).await;
    send_json(&mut bob, json!({"type": "join", "nickname": "Bob"})).await;

    let welcome = recv_json(&mut bob).await;
    assert_eq!(welcome["message"], "Welcome Bob! There are 2 people in the chat.");
    assert_eq!(welcome["timestamp"].as_str().unwrap().len(), 8);
    assert_eq!(recv_json(&mut bob).await, json!({"type": "history", "messages": []}));

    for ws in [&mut alice, &mut bob] {
        let system = recv_json(ws).await;
        assert_eq!(system["type"], "system");
        assert_eq!(system["message"], "Bob joined the chat");
        let users = recv_json(ws).await;
        assert_eq!(users["count"], 2);
        assert_eq!(nicknames(&users), vec!["Alice", "Bob"]);
    }

    send_json(&mut alice, json!({"type": "message", "message": "hi"})).await;
    for ws in [&mut alice, &mut bob] {
        let msg = recv_json(ws).await;
        assert_eq!(msg["type"], "message");
        assert_eq!(msg["nickname"], "Alice");
        assert_eq!(msg["message"], "hi");
    }

    bob.close(None).await.unwrap();

    let system = recv_json(&mut alice).await;
    assert_eq!(system["message"], "Bob left the chat");
    let users = recv_json(&mut alice).await;
    assert_eq!(users["count"], 1);
    assert_eq!(nicknames(&users), vec!["Alice"]);
}

#[tokio::test]
async fn test_history_replay_is_bounded() {
    let addr = start_server(2).await;

    let mut alice = connect(addr).await;
    join(&mut alice, "Alice").await;
    for body in ["one", "two", "three"] {
        send_json(&mut alice, json!({"type": "message", "message": body})).await;
        assert_eq!(recv_json(&mut alice).await["message"], body);
    }

    let mut bob = connect(addr).await;
    let history = join(&mut bob, "Bob").await;
    let bodies: Vec<&str> = history["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["message"].as_str().unwrap())
        .collect();
    assert_eq!(bodies, vec!["two", "three"]);
    assert_eq!(history["messages"][0]["nickname"], "Alice");
}

#[tokio::test]
async fn test_typing_relayed_to_others_only() {
    let addr = start_server(50).await;

    let mut alice = connect(addr).await;
    join(&mut alice, "Alice").await;
    let mut bob = connect(addr).await;
    join(&mut bob, "Bob").await;
    // Alice's copy of Bob's join
    recv_json(&mut alice).await;
    recv_json(&mut alice).await;

    send_json(&mut alice, json!({"type": "typing", "isTyping": true})).await;
    assert_eq!(
        recv_json(&mut bob).await,
        json!({"type": "typing", "nickname": "Alice", "isTyping": true})
    );

    send_json(&mut alice, json!({"type": "message", "message": "done"})).await;
    assert_eq!(
        recv_json(&mut bob).await,
        json!({"type": "typing", "nickname": "Alice", "isTyping": false})
    );
    assert_eq!(recv_json(&mut bob).await["message"], "done");
    // No typing echo, straight to the message
    assert_eq!(recv_json(&mut alice).await["type"], "message");
}

#[tokio::test]
async fn test_message_burst_reaches_idle_reader() {
    const BURST: usize = 300;
    let addr = start_server(50).await;

    let mut alice = connect(addr).await;
    join(&mut alice, "Alice").await;
    let mut bob = connect(addr).await;
    join(&mut bob, "Bob").await;
    recv_json(&mut alice).await;
    recv_json(&mut alice).await;

    // Bob does not read while Alice sends the whole burst
    for n in 0..BURST {
        send_json(&mut alice, json!({"type": "message", "message": format!("burst {}", n)})).await;
    }
    for n in 0..BURST {
        assert_eq!(recv_json(&mut alice).await["message"], format!("burst {}", n));
    }

    for n in 0..BURST {
        let msg = recv_json(&mut bob).await;
        assert_eq!(msg["type"], "message");
        assert_eq!(msg["message"], format!("burst {}", n));
    }

    // Bob is still joined: no leave notice, and later messages still arrive
    send_json(&mut alice, json!({"type": "message", "message": "after"})).await;
    assert_eq!(recv_json(&mut alice).await["message"], "after");
    assert_eq!(recv_json(&mut bob).await["message"], "after");
}

#[tokio::test]
async fn test_unknown_event_type_is_ignored() {
    let addr = start_server(50).await;

    let mut alice = connect(addr).await;
    join(&mut alice, "Alice").await;

    send_json(&mut alice, json!({"type": "reaction", "emoji": "+1"})).await;
    send_json(&mut alice, json!({"type": "message", "message": "still here"})).await;

    assert_eq!(recv_json(&mut alice).await["message"], "still here");
}

#[tokio::test]
async fn test_malformed_frame_closes_with_protocol_error() {
    let addr = start_server(50).await;

    let mut alice = connect(addr).await;
    alice
        .send(Message::Text("not json".to_string().into()))
        .await
        .unwrap();

    loop {
        let msg = timeout(RECV_TIMEOUT, alice.next())
            .await
            .expect("timed out waiting for close")
            .expect("stream ended without close frame")
            .expect("websocket error");
        if let Message::Close(frame) = msg {
            let frame = frame.expect("close frame without code");
            assert_eq!(frame.code, CloseCode::Protocol);
            break;
        }
    }
}

#[tokio::test]
async fn test_disconnect_before_join_is_silent() {
    let addr = start_server(50).await;

    let mut alice = connect(addr).await;
    join(&mut alice, "Alice").await;

    let mut lurker = connect(addr).await;
    lurker.close(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    send_json(&mut alice, json!({"type": "message", "message": "anyone?"})).await;
    let next = recv_json(&mut alice).await;
    assert_eq!(next["type"], "message");
    assert_eq!(next["message"], "anyone?");
}

#[tokio::test]
async fn test_message_before_join_is_dropped() {
    let addr = start_server(50).await;

    let mut alice = connect(addr).await;
    join(&mut alice, "Alice").await;

    let mut early = connect(addr).await;
    send_json(&mut early, json!({"type": "message", "message": "too soon"})).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    send_json(&mut alice, json!({"type": "message", "message": "first"})).await;
    assert_eq!(recv_json(&mut alice).await["message"], "first");
}

#[tokio::test]
async fn test_other_paths_are_rejected() {
    let addr = start_server(50).await;

    match connect_async(format!("ws://{}/chat", addr)).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), StatusCode::NOT_FOUND),
        Err(other) => panic!("Unexpected error: {:?}", other),
        Ok(_) => panic!("Handshake on the wrong path should fail"),
    }
}
