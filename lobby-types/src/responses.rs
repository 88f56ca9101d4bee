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

//! Response types for the lobby REST API.
//!
//! Every endpoint returns an [`APIResponse<T>`] envelope:
//! - On success: `{ "success": true,  "result": <T> }`
//! - On failure: `{ "success": false, "result": <APIError> }`

use serde::{Deserialize, Serialize};

use crate::lobby::{EntryCredentials, LobbyRequestEntry, RequestState};

// ---------------------------------------------------------------------------
// Generic envelope
// ---------------------------------------------------------------------------

/// Top-level API response envelope.
///
/// # Success example
///
/// ```json
/// { "success": true, "result": { "request_id": "...", "status": "pending" } }
/// ```
///
/// # Error example
///
/// ```json
/// { "success": false, "result": { "code": "REQUEST_NOT_FOUND", "message": "..." } }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct APIResponse<A: Serialize> {
    pub success: bool,
    pub result: A,
}

impl<A: Serialize> APIResponse<A> {
    /// Wrap a successful result.
    pub fn ok(result: A) -> Self {
        Self {
            success: true,
            result,
        }
    }
}

impl APIResponse<crate::error::APIError> {
    /// Wrap an error result.
    pub fn error(err: crate::error::APIError) -> Self {
        Self {
            success: false,
            result: err,
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoint-specific response payloads
// ---------------------------------------------------------------------------

/// Outcome of a join attempt.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JoinStatus {
    /// The visitor waits in the lobby for an admin decision.
    Pending,
    /// The meeting owner skips the lobby.
    AutoApproved,
}

/// Response payload for `POST /api/v1/lobby/request`.
///
/// Credential fields are present only when `status` is `auto_approved`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LobbyJoinResponse {
    pub request_id: String,
    pub status: JoinStatus,
    #[serde(flatten)]
    pub credentials: Option<EntryCredentials>,
}

/// Response payload for `GET /api/v1/lobby/status`.
///
/// Credential fields are present only when `status` is `approved`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LobbyStatusResponse {
    pub request_id: String,
    pub status: RequestState,
    #[serde(flatten)]
    pub credentials: Option<EntryCredentials>,
}

/// Response payload for `GET /api/v1/lobby/pending`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LobbyPendingResponse {
    pub meeting_code: String,
    pub requests: Vec<LobbyRequestEntry>,
}

/// Response payload for `POST /api/v1/lobby/respond` and
/// `DELETE /api/v1/lobby/request`.
///
/// `applied` is `false` when the request had already been resolved; `status`
/// then reports the state the earlier decision produced.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LobbyDecisionResponse {
    pub request_id: String,
    pub status: RequestState,
    pub applied: bool,
}

/// Per-request result inside [`AdmitAllResponse`].
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdmitResult {
    pub request_id: String,
    pub status: RequestState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<crate::error::APIError>,
}

/// Response payload for `POST /api/v1/lobby/admit-all`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdmitAllResponse {
    pub admitted_count: usize,
    pub results: Vec<AdmitResult>,
}

/// Response payload for `POST /api/v1/meetings` (201 Created).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MeetingResponse {
    pub meeting_code: String,
    pub owner: String,
    /// Unix timestamp in seconds when the meeting was registered.
    pub created_at: i64,
}

/// Response payload for `DELETE /api/v1/meetings/{meeting_code}`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeleteMeetingResponse {
    pub message: String,
    /// Number of lobby requests discarded with the meeting.
    pub purged_requests: usize,
}
