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

//! WebSocket frames exchanged on `/ws/lobby/admin` and `/ws/lobby/visitor`.
//!
//! Every frame is a JSON text message carrying a `type` discriminator.

use serde::{Deserialize, Serialize};

use crate::error::APIError;
use crate::lobby::{EntryCredentials, LobbyAction, LobbyRequestEntry, RequestState};

/// Frames pushed to an admin connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdminServerMessage {
    /// Snapshot of every pending request. Always the first frame after
    /// subscribing, sent exactly once per connection.
    PendingRequests { requests: Vec<LobbyRequestEntry> },
    /// A visitor entered the lobby.
    NewRequest { request: LobbyRequestEntry },
    /// An admin approved or rejected the request; remove it from the view.
    RequestResolved { request_id: String },
    /// The visitor withdrew or the request expired; remove it from the view.
    VisitorCancelled { request_id: String },
    /// A command sent on this connection failed. Only the sender sees it.
    Error {
        code: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
}

impl AdminServerMessage {
    pub fn error(err: &APIError, request_id: Option<&str>) -> Self {
        AdminServerMessage::Error {
            code: err.code.clone(),
            message: err.message.clone(),
            request_id: request_id.map(str::to_string),
        }
    }
}

/// Commands an admin sends over its connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdminCommand {
    Respond {
        request_id: String,
        action: LobbyAction,
    },
    /// Approve every currently pending request, each independently.
    AdmitAll,
}

/// Frames pushed to a visitor waiting in the lobby.
///
/// Every variant except `Error` is terminal: the server closes the
/// connection right after sending it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VisitorServerMessage {
    Approved(EntryCredentials),
    Rejected,
    Cancelled,
    Expired,
    Error { code: String, message: String },
}

impl VisitorServerMessage {
    pub fn error(err: &APIError) -> Self {
        VisitorServerMessage::Error {
            code: err.code.clone(),
            message: err.message.clone(),
        }
    }

    /// The request state this frame reports, if it is a resolution.
    pub fn state(&self) -> Option<RequestState> {
        match self {
            VisitorServerMessage::Approved(_) => Some(RequestState::Approved),
            VisitorServerMessage::Rejected => Some(RequestState::Rejected),
            VisitorServerMessage::Cancelled => Some(RequestState::Cancelled),
            VisitorServerMessage::Expired => Some(RequestState::Expired),
            VisitorServerMessage::Error { .. } => None,
        }
    }
}

/// Commands a visitor sends over its connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VisitorCommand {
    /// Explicitly withdraw the join request. Closing the socket without
    /// sending this leaves the request pending.
    Cancel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_frames_use_snake_case_type_tags() {
        let msg = AdminServerMessage::RequestResolved {
            request_id: "r1".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "request_resolved");
        assert_eq!(json["request_id"], "r1");
    }

    #[test]
    fn respond_command_parses_from_browser_json() {
        let cmd: AdminCommand =
            serde_json::from_str(r#"{"type":"respond","request_id":"r9","action":"reject"}"#)
                .unwrap();
        assert_eq!(
            cmd,
            AdminCommand::Respond {
                request_id: "r9".to_string(),
                action: LobbyAction::Reject,
            }
        );

        let cmd: AdminCommand = serde_json::from_str(r#"{"type":"admit_all"}"#).unwrap();
        assert_eq!(cmd, AdminCommand::AdmitAll);
    }

    #[test]
    fn approved_frame_is_flat() {
        let msg = VisitorServerMessage::Approved(EntryCredentials {
            token: "t".to_string(),
            url: "ws://media".to_string(),
            room_code: "abc-defg-hij".to_string(),
            identity: "guest_1".to_string(),
            user_name: "Alice".to_string(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "approved");
        assert_eq!(json["token"], "t");
        assert_eq!(json["user_name"], "Alice");
        assert_eq!(msg.state(), Some(RequestState::Approved));
    }

    #[test]
    fn rejected_frame_has_only_a_type() {
        let json = serde_json::to_string(&VisitorServerMessage::Rejected).unwrap();
        assert_eq!(json, r#"{"type":"rejected"}"#);
    }
}
