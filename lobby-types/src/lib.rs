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

//! Shared wire types for the videocall.rs lobby admission service.
//!
//! This crate defines the contract between the lobby server and its
//! consumers (visitors waiting to enter, meeting admins, integration tests):
//! REST bodies, WebSocket messages, error payloads and token claims.
//! It has no axum or tokio dependency.

pub mod error;
pub mod lobby;
pub mod messages;
pub mod requests;
pub mod responses;
pub mod token;

pub use error::APIError;
pub use lobby::{LobbyAction, RequestState};
pub use responses::APIResponse;
pub use token::RoomAccessTokenClaims;
