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

//! Error types for the lobby client.

use thiserror::Error;

/// Errors returned by [`LobbyApiClient`](crate::LobbyApiClient) methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The session JWT is missing, expired, or invalid (HTTP 401).
    #[error("Not authenticated. Please log in.")]
    NotAuthenticated,

    /// The caller does not own the meeting (HTTP 403).
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Unknown meeting or request (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// A pending request already exists for this visitor, or the meeting
    /// code is taken (HTTP 409).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed meeting code or missing display name (HTTP 400).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A server error with status code and body.
    #[error("Server error ({status}): {body}")]
    ServerError { status: u16, body: String },

    /// The server ended a lobby session with an `error` frame.
    #[error("Lobby error {code}: {message}")]
    Lobby { code: String, message: String },

    /// A network or transport error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The WebSocket handshake or stream failed.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// A frame or body could not be decoded.
    #[error("Invalid payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// A configuration error (e.g. missing base URL).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Whether retrying the same call later can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::WebSocket(_) => true,
            ApiError::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
