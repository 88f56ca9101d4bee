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

//! Request types for the lobby REST API and WebSocket upgrade queries.
//!
//! These types define the shape of request bodies and query parameters.
//! They are used by both the server (for deserialization) and clients
//! (for serialization).

use serde::{Deserialize, Serialize};

use crate::lobby::LobbyAction;

/// Request body for `POST /api/v1/lobby/request`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LobbyJoinRequest {
    pub meeting_code: String,

    /// Display name. Required for guests; overrides the profile name for
    /// signed-in users.
    #[serde(default)]
    pub user_name: Option<String>,

    /// Stable per-device identifier a guest may send so that a retried
    /// join is recognized as the same visitor.
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Query for endpoints addressing a single request
/// (`DELETE /api/v1/lobby/request`, `GET /api/v1/lobby/status`).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RequestIdQuery {
    pub request_id: String,
}

/// Query for `GET /api/v1/lobby/pending`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MeetingCodeQuery {
    pub meeting_code: String,
}

/// Request body for `POST /api/v1/lobby/respond` (HTTP fallback for the
/// admin WebSocket `respond` command).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LobbyRespondRequest {
    pub meeting_code: String,
    pub request_id: String,
    pub action: LobbyAction,
}

/// Request body for `POST /api/v1/lobby/admit-all`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdmitAllRequest {
    pub meeting_code: String,
}

/// Request body for `POST /api/v1/meetings`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CreateMeetingRequest {
    /// Meeting code in `abc-defg-hij` form. Auto-generated if omitted.
    #[serde(default)]
    pub meeting_code: Option<String>,
}

/// Query for the admin WebSocket upgrade `GET /ws/lobby/admin`.
///
/// Browsers cannot attach headers to a WebSocket handshake, so the session
/// token travels in the query string.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminConnectQuery {
    pub meeting_code: String,
    pub token: String,
}

/// Query for the visitor WebSocket upgrade `GET /ws/lobby/visitor`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VisitorConnectQuery {
    pub request_id: String,
    pub meeting_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_request_optional_fields_default_to_none() {
        let req: LobbyJoinRequest =
            serde_json::from_str(r#"{"meeting_code":"abc-defg-hij"}"#).unwrap();
        assert_eq!(req.meeting_code, "abc-defg-hij");
        assert!(req.user_name.is_none());
        assert!(req.client_id.is_none());
    }

    #[test]
    fn respond_request_rejects_unknown_action() {
        let body = r#"{"meeting_code":"m","request_id":"r","action":"mute"}"#;
        assert!(serde_json::from_str::<LobbyRespondRequest>(body).is_err());
    }
}
