/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! End-to-end tests for the admin and visitor WebSocket gateways against a
//! server bound to a local port.


use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use lobby_api::lobby::{CreateOutcome, VisitorInfo};
use lobby_api::state::AppState;
use lobby_types::{LobbyAction, RequestState};
use serde_json::{json, Value};
use test_helpers::*;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{http::StatusCode, Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const TIMEOUT: Duration = Duration::from_secs(5);

fn admin_url(addr: SocketAddr, meeting: &str, token: &str) -> String {
    format!("ws://{addr}/ws/lobby/admin?meeting_code={meeting}&token={token}")
}

fn visitor_url(addr: SocketAddr, request_id: &str) -> String {
    format!("ws://{addr}/ws/lobby/visitor?request_id={request_id}&meeting_code={MEETING}")
}

fn guest_request(state: &AppState, name: &str) -> String {
    let visitor = VisitorInfo {
        user_name: Some(name.to_string()),
        ..Default::default()
    };
    match state.engine.create_request(MEETING, visitor).unwrap() {
        CreateOutcome::Pending(r) => r.id,
        other => panic!("expected pending, got {other:?}"),
    }
}

async fn connect(url: &str) -> Ws {
    let (ws, _) = connect_async(url).await.expect("websocket upgrade");
    ws
}

async fn upgrade_status(url: &str) -> StatusCode {
    match connect_async(url).await {
        Ok(_) => panic!("upgrade to {url} should have been refused"),
        Err(WsError::Http(resp)) => resp.status(),
        Err(e) => panic!("unexpected websocket error: {e}"),
    }
}

/// Next text frame as JSON.
async fn next_json(ws: &mut Ws) -> Value {
    loop {
        let msg = tokio::time::timeout(TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("frame is JSON");
        }
    }
}

async fn assert_closed(ws: &mut Ws) {
    let next = tokio::time::timeout(TIMEOUT, ws.next())
        .await
        .expect("timed out waiting for close");
    assert!(
        matches!(next, None | Some(Ok(Message::Close(_))) | Some(Err(_))),
        "expected close, got {next:?}"
    );
}

async fn send_json(ws: &mut Ws, value: Value) {
    ws.send(Message::Text(value.to_string()))
        .await
        .expect("send frame");
}

// ── Admin gateway ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_admin_gets_snapshot_then_live_events() {
    let state = build_state();
    let addr = spawn_server(&state).await;
    let first = guest_request(&state, "Alice");

    let mut admin = connect(&admin_url(addr, MEETING, &session_token(OWNER))).await;
    let snapshot = next_json(&mut admin).await;
    assert_eq!(snapshot["type"], "pending_requests");
    assert_eq!(snapshot["requests"][0]["request_id"], first.as_str());

    let second = guest_request(&state, "Bob");
    let event = next_json(&mut admin).await;
    assert_eq!(event["type"], "new_request");
    assert_eq!(event["request"]["request_id"], second.as_str());
    assert_eq!(event["request"]["name"], "Bob");

    send_json(
        &mut admin,
        json!({ "type": "respond", "request_id": first, "action": "approve" }),
    )
    .await;
    let event = next_json(&mut admin).await;
    assert_eq!(event, json!({ "type": "request_resolved", "request_id": first }));
    assert_eq!(state.engine.status(&first).unwrap().state, RequestState::Approved);
}

#[tokio::test]
async fn test_admin_command_errors_go_to_sender_only() {
    let state = build_state();
    let addr = spawn_server(&state).await;

    let mut admin = connect(&admin_url(addr, MEETING, &session_token(OWNER))).await;
    next_json(&mut admin).await;

    send_json(
        &mut admin,
        json!({ "type": "respond", "request_id": "ghost", "action": "reject" }),
    )
    .await;
    let reply = next_json(&mut admin).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["code"], "REQUEST_NOT_FOUND");
    assert_eq!(reply["request_id"], "ghost");

    send_json(&mut admin, json!({ "type": "shout" })).await;
    let reply = next_json(&mut admin).await;
    assert_eq!(reply["code"], "INVALID_MESSAGE");
}

#[tokio::test]
async fn test_admin_upgrade_is_authenticated() {
    let state = build_state();
    let addr = spawn_server(&state).await;

    assert_eq!(
        upgrade_status(&admin_url(addr, MEETING, "not-a-token")).await,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        upgrade_status(&admin_url(addr, MEETING, &session_token("intruder"))).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        upgrade_status(&admin_url(addr, "zzz-zzzz-zzz", &session_token(OWNER))).await,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_admin_reconnect_sees_current_pending_set() {
    let state = build_state();
    let addr = spawn_server(&state).await;
    let a = guest_request(&state, "A");
    let b = guest_request(&state, "B");

    let mut admin = connect(&admin_url(addr, MEETING, &session_token(OWNER))).await;
    next_json(&mut admin).await;
    drop(admin);

    state
        .engine
        .respond(MEETING, &a, LobbyAction::Reject, OWNER)
        .unwrap();

    let mut admin = connect(&admin_url(addr, MEETING, &session_token(OWNER))).await;
    let snapshot = next_json(&mut admin).await;
    let ids: Vec<&str> = snapshot["requests"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["request_id"].as_str())
        .collect();
    assert_eq!(ids, vec![b.as_str()]);
}

// ── Visitor gateway ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_visitor_receives_approval_and_is_closed() {
    let state = build_state();
    let addr = spawn_server(&state).await;
    let id = guest_request(&state, "Cleo");

    let mut visitor = connect(&visitor_url(addr, &id)).await;
    state
        .engine
        .respond(MEETING, &id, LobbyAction::Approve, OWNER)
        .unwrap();

    let frame = next_json(&mut visitor).await;
    assert_eq!(frame["type"], "approved");
    assert_eq!(frame["room_code"], MEETING);
    assert_eq!(frame["user_name"], "Cleo");
    assert_eq!(frame["url"], "ws://media.test:7880");
    assert!(frame["token"].is_string());
    assert_closed(&mut visitor).await;
}

#[tokio::test]
async fn test_visitor_reconnect_replays_resolution() {
    let state = build_state();
    let addr = spawn_server(&state).await;
    let id = guest_request(&state, "Dina");
    state
        .engine
        .respond(MEETING, &id, LobbyAction::Reject, OWNER)
        .unwrap();

    for _ in 0..2 {
        let mut visitor = connect(&visitor_url(addr, &id)).await;
        assert_eq!(next_json(&mut visitor).await, json!({ "type": "rejected" }));
        assert_closed(&mut visitor).await;
    }
}

#[tokio::test]
async fn test_visitor_cancel_notifies_admins() {
    let state = build_state();
    let addr = spawn_server(&state).await;
    let id = guest_request(&state, "Ezra");

    let mut admin = connect(&admin_url(addr, MEETING, &session_token(OWNER))).await;
    next_json(&mut admin).await;

    let mut visitor = connect(&visitor_url(addr, &id)).await;
    send_json(&mut visitor, json!({ "type": "cancel" })).await;

    assert_eq!(next_json(&mut visitor).await, json!({ "type": "cancelled" }));
    assert_closed(&mut visitor).await;
    assert_eq!(
        next_json(&mut admin).await,
        json!({ "type": "visitor_cancelled", "request_id": id })
    );
    assert_eq!(state.engine.status(&id).unwrap().state, RequestState::Cancelled);
}

#[tokio::test]
async fn test_visitor_disconnect_leaves_request_pending() {
    let state = build_state();
    let addr = spawn_server(&state).await;
    let id = guest_request(&state, "Finn");

    let mut visitor = connect(&visitor_url(addr, &id)).await;
    visitor.close(None).await.expect("close");
    drop(visitor);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(state.engine.status(&id).unwrap().state, RequestState::Pending);

    // A fresh connection still receives the decision.
    let mut visitor = connect(&visitor_url(addr, &id)).await;
    state
        .engine
        .respond(MEETING, &id, LobbyAction::Approve, OWNER)
        .unwrap();
    assert_eq!(next_json(&mut visitor).await["type"], "approved");
}

#[tokio::test]
async fn test_newer_visitor_connection_supersedes_older() {
    let state = build_state();
    let addr = spawn_server(&state).await;
    let id = guest_request(&state, "Gwen");

    let mut old = connect(&visitor_url(addr, &id)).await;
    let mut new = connect(&visitor_url(addr, &id)).await;
    assert_closed(&mut old).await;

    state
        .engine
        .respond(MEETING, &id, LobbyAction::Approve, OWNER)
        .unwrap();
    assert_eq!(next_json(&mut new).await["type"], "approved");
}

#[tokio::test]
async fn test_visitor_upgrade_for_unknown_request_is_404() {
    let state = build_state();
    let addr = spawn_server(&state).await;

    assert_eq!(
        upgrade_status(&visitor_url(addr, "no-such-request")).await,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_teardown_closes_waiting_visitor_and_admin() {
    let state = build_state();
    let addr = spawn_server(&state).await;
    let id = guest_request(&state, "Hugo");

    let mut admin = connect(&admin_url(addr, MEETING, &session_token(OWNER))).await;
    next_json(&mut admin).await;
    let mut visitor = connect(&visitor_url(addr, &id)).await;

    state.engine.teardown(MEETING);

    let frame = next_json(&mut visitor).await;
    assert_eq!(frame["type"], "error");
    assert_eq!(frame["code"], "MEETING_NOT_FOUND");
    assert_closed(&mut visitor).await;
    assert_closed(&mut admin).await;
}
