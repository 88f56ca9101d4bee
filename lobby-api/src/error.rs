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

//! Application error type that implements Axum's `IntoResponse`.
//!
//! Every error is returned as `APIResponse<APIError>` with `success: false`,
//! paired with the appropriate HTTP status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lobby_types::{APIError, APIResponse};

use crate::lobby::LobbyError;

/// Application-level error that pairs an HTTP status code with an [`APIError`].
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub body: APIError,
}

impl AppError {
    pub fn new(status: StatusCode, body: APIError) -> Self {
        Self { status, body }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, APIError::unauthorized())
    }

    pub fn invalid_meeting_code(detail: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            APIError::invalid_meeting_code(detail),
        )
    }

    pub fn meeting_exists(meeting_code: &str) -> Self {
        Self::new(StatusCode::CONFLICT, APIError::meeting_exists(meeting_code))
    }

    pub fn meeting_not_found(meeting_code: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            APIError::meeting_not_found(meeting_code),
        )
    }

    pub fn not_owner() -> Self {
        Self::new(StatusCode::FORBIDDEN, APIError::not_owner())
    }

    pub fn request_not_found(request_id: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            APIError::request_not_found(request_id),
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = APIResponse::error(self.body);
        (self.status, Json(body)).into_response()
    }
}

impl From<LobbyError> for AppError {
    fn from(err: LobbyError) -> Self {
        match err {
            LobbyError::NotFound(request_id) => Self::request_not_found(&request_id),
            LobbyError::DuplicatePending { request_id } => Self::new(
                StatusCode::CONFLICT,
                APIError::duplicate_pending(&request_id),
            ),
            LobbyError::TokenIssuanceFailed(detail) => {
                tracing::error!("Token issuance failed: {detail}");
                Self::new(
                    StatusCode::BAD_GATEWAY,
                    APIError::token_issuance_failed(&detail),
                )
            }
            LobbyError::MeetingNotFound(meeting_code) => Self::meeting_not_found(&meeting_code),
            LobbyError::NotOwner => Self::not_owner(),
            LobbyError::NameRequired => {
                Self::new(StatusCode::BAD_REQUEST, APIError::name_required())
            }
        }
    }
}
