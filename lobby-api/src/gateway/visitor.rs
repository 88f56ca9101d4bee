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

//! Visitor session gateway: `GET /ws/lobby/visitor?request_id=..&meeting_code=..`.
//!
//! One connection waits on one request. A resolved request is replayed
//! immediately; otherwise the connection parks on the request's mailbox until
//! a resolution arrives, the visitor sends `cancel`, or a newer connection
//! for the same request takes over. Dropping the socket leaves the request
//! pending.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use lobby_types::messages::{VisitorCommand, VisitorServerMessage};
use lobby_types::requests::VisitorConnectQuery;
use lobby_types::APIError;
use tracing::{debug, info, warn};

use super::{api_error, text_frame};
use crate::error::AppError;
use crate::lobby::VisitorBinding;
use crate::state::AppState;

/// GET /ws/lobby/visitor
pub async fn visitor_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<VisitorConnectQuery>,
) -> Result<Response, AppError> {
    let binding = state
        .engine
        .bind_visitor(&query.request_id, &query.meeting_code)?;
    let request_id = query.request_id;
    Ok(ws.on_upgrade(move |socket| run_visitor(socket, state, request_id, binding)))
}

async fn send_frame(socket: &mut WebSocket, frame: &VisitorServerMessage) -> bool {
    match text_frame(frame) {
        Some(msg) => socket.send(msg).await.is_ok(),
        None => false,
    }
}

async fn run_visitor(
    mut socket: WebSocket,
    state: AppState,
    request_id: String,
    binding: VisitorBinding,
) {
    let (binding, mut resolution) = match binding {
        VisitorBinding::Resolved(frame) => {
            debug!(request_id = %request_id, "Replaying resolution to visitor");
            send_frame(&mut socket, &frame).await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
        VisitorBinding::Waiting {
            binding,
            resolution,
        } => (binding, resolution),
    };
    info!(request_id = %request_id, binding, "Visitor waiting");

    loop {
        tokio::select! {
            outcome = &mut resolution => {
                match outcome {
                    Ok(frame) => {
                        info!(request_id = %request_id, state = ?frame.state(), "Delivering resolution");
                        send_frame(&mut socket, &frame).await;
                    }
                    // Superseded by a newer connection.
                    Err(_) => debug!(request_id = %request_id, binding, "Visitor binding replaced"),
                }
                break;
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<VisitorCommand>(text.as_str()) {
                        Ok(VisitorCommand::Cancel) => {
                            // The resolution comes back through the mailbox.
                            if let Err(e) = state.engine.cancel(&request_id, "visitor") {
                                send_frame(&mut socket, &VisitorServerMessage::error(&api_error(e))).await;
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(request_id = %request_id, "Invalid visitor message: {e}");
                            let frame = VisitorServerMessage::error(&APIError::invalid_message(&e.to_string()));
                            if !send_frame(&mut socket, &frame).await {
                                break;
                            }
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    debug!(request_id = %request_id, "Visitor transport closed, request stays pending");
                    state.engine.release_visitor(&request_id, binding);
                    return;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    state.engine.release_visitor(&request_id, binding);
    let _ = socket.send(Message::Close(None)).await;
}
