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

//! WebSocket gateways for lobby admins and waiting visitors.

pub mod admin;
pub mod visitor;

use axum::extract::ws::Message;
use lobby_types::APIError;
use serde::Serialize;

use crate::error::AppError;
use crate::lobby::LobbyError;

/// The wire error an engine failure maps to.
pub(crate) fn api_error(err: LobbyError) -> APIError {
    AppError::from(err).body
}

/// Encode a frame as a text message.
pub(crate) fn text_frame<T: Serialize>(frame: &T) -> Option<Message> {
    match serde_json::to_string(frame) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!("Failed to encode lobby frame: {e}");
            None
        }
    }
}
