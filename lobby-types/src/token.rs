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

//! JWT claims issued by the lobby service.
//!
//! Two tokens exist:
//! - the **room access token**, minted when a visitor is admitted and
//!   presented to the media server;
//! - the **session token**, identifying a signed-in user to the lobby service
//!   itself (REST `Authorization: Bearer` header or admin WebSocket query).

use serde::{Deserialize, Serialize};

/// JWT payload for a room access token.
///
/// # Example payload
///
/// ```json
/// {
///   "sub": "guest_5f1c2a9b",
///   "room": "abc-defg-hij",
///   "room_join": true,
///   "role": "guest",
///   "display_name": "Alice",
///   "exp": 1707004800,
///   "iss": "videocall-lobby"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoomAccessTokenClaims {
    /// Media server identity of the participant.
    pub sub: String,

    /// The meeting code the participant is authorized to join.
    pub room: String,

    /// Must be `true` for the media server to accept the connection.
    pub room_join: bool,

    /// `"admin"`, `"user"` or `"guest"`.
    pub role: String,

    /// Participant's chosen display name for this meeting.
    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Expiration timestamp (Unix seconds).
    pub exp: i64,

    /// Issuer identifier. Always [`RoomAccessTokenClaims::ISSUER`].
    pub iss: String,
}

impl RoomAccessTokenClaims {
    pub const ISSUER: &'static str = "videocall-lobby";
}

/// JWT payload for a session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Stable user identifier.
    pub sub: String,

    /// Profile display name.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    pub exp: i64,

    pub iss: String,
}

impl SessionClaims {
    pub const ISSUER: &'static str = "videocall-lobby-session";
}
