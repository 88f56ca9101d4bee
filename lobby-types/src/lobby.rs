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

//! Core lobby vocabulary shared by REST and WebSocket payloads.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a lobby join request.
///
/// `Pending` is the only non-terminal state. Every other state is final:
/// once a request leaves `Pending` it never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Expired,
}

impl RequestState {
    pub fn is_pending(self) -> bool {
        self == RequestState::Pending
    }

    pub fn is_terminal(self) -> bool {
        !self.is_pending()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestState::Pending => "pending",
            RequestState::Approved => "approved",
            RequestState::Rejected => "rejected",
            RequestState::Cancelled => "cancelled",
            RequestState::Expired => "expired",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision an admin takes on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyAction {
    Approve,
    Reject,
}

impl LobbyAction {
    /// The terminal state this action moves a pending request into.
    pub fn target_state(self) -> RequestState {
        match self {
            LobbyAction::Approve => RequestState::Approved,
            LobbyAction::Reject => RequestState::Rejected,
        }
    }
}

/// A pending request as shown in the admin's lobby panel.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LobbyRequestEntry {
    pub request_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub role: String,
    /// Unix timestamp in seconds when the visitor asked to join.
    pub created_at: i64,
}

/// Credentials a visitor needs to enter the meeting once admitted.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct EntryCredentials {
    /// Signed room access token for the media server.
    pub token: String,
    /// Media server URL the token is valid for.
    pub url: String,
    pub room_code: String,
    pub identity: String,
    pub user_name: String,
}
