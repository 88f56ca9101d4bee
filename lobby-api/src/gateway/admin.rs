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

//! Admin session gateway: `GET /ws/lobby/admin?meeting_code=..&token=..`.
//!
//! The session is checked once, before the upgrade. After that the
//! connection receives the pending snapshot followed by live lobby events,
//! and may send `respond` / `admit_all` commands. Disconnecting only drops
//! the subscription.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use lobby_types::messages::{AdminCommand, AdminServerMessage};
use lobby_types::requests::AdminConnectQuery;
use lobby_types::APIError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{api_error, text_frame};
use crate::auth::{authenticate, AuthUser};
use crate::error::AppError;
use crate::lobby::AdmissionEngine;
use crate::state::AppState;

/// GET /ws/lobby/admin
pub async fn admin_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<AdminConnectQuery>,
) -> Result<Response, AppError> {
    let user = authenticate(&state.jwt_secret, &query.token)?;
    state.engine.authorize(&query.meeting_code, &user.user_id)?;

    let meeting_code = query.meeting_code;
    Ok(ws.on_upgrade(move |socket| run_admin(socket, state, meeting_code, user)))
}

/// Apply one admin command. Returns the frames meant for the sender only.
pub fn handle_admin_command(
    engine: &AdmissionEngine,
    meeting_code: &str,
    actor: &str,
    command: AdminCommand,
) -> Vec<AdminServerMessage> {
    match command {
        AdminCommand::Respond { request_id, action } => {
            match engine.respond(meeting_code, &request_id, action, actor) {
                Ok(_) => Vec::new(),
                Err(e) => vec![AdminServerMessage::error(&api_error(e), Some(&request_id))],
            }
        }
        AdminCommand::AdmitAll => match engine.admit_all(meeting_code, actor) {
            Ok(results) => results
                .into_iter()
                .filter_map(|(request_id, outcome)| {
                    outcome
                        .err()
                        .map(|e| AdminServerMessage::error(&api_error(e), Some(&request_id)))
                })
                .collect(),
            Err(e) => vec![AdminServerMessage::error(&api_error(e), None)],
        },
    }
}

async fn run_admin(socket: WebSocket, state: AppState, meeting_code: String, user: AuthUser) {
    let subscription = state.engine.subscribe_admin(&meeting_code);
    let subscriber = subscription.id;
    let mut events = subscription.events;
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Replies to this admin's own commands.
    let (reply_tx, mut reply_rx) = mpsc::channel::<AdminServerMessage>(16);

    info!(meeting = %meeting_code, subscriber, user = %user.user_id, "Admin connected");

    let engine = state.engine.clone();
    let read_meeting = meeting_code.clone();
    let actor = user.user_id.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            let replies = match serde_json::from_str::<AdminCommand>(text.as_str()) {
                Ok(command) => {
                    debug!(meeting = %read_meeting, ?command, "Admin command");
                    handle_admin_command(&engine, &read_meeting, &actor, command)
                }
                Err(e) => {
                    warn!(meeting = %read_meeting, "Invalid admin message: {e}");
                    vec![AdminServerMessage::error(
                        &APIError::invalid_message(&e.to_string()),
                        None,
                    )]
                }
            };
            for reply in replies {
                if reply_tx.send(reply).await.is_err() {
                    return;
                }
            }
        }
    });

    let mut write_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                event = events.recv() => match event {
                    Some(event) => event,
                    // Evicted for falling behind, or the meeting is gone.
                    None => break,
                },
                Some(reply) = reply_rx.recv() => reply,
            };
            let Some(msg) = text_frame(&frame) else {
                continue;
            };
            if ws_tx.send(msg).await.is_err() {
                return;
            }
        }
        let _ = ws_tx.send(Message::Close(None)).await;
    });

    tokio::select! {
        _ = &mut read_task => write_task.abort(),
        _ = &mut write_task => read_task.abort(),
    }

    state.engine.unsubscribe_admin(&meeting_code, subscriber);
    info!(meeting = %meeting_code, subscriber, "Admin disconnected");
}
