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

//! API error types.
//!
//! Every failed REST response is returned as `APIResponse<APIError>` with
//! `success: false`. The same codes travel inside WebSocket `error` frames.

use serde::{Deserialize, Serialize};

/// Structured error returned in the `result` field of a failed [`super::APIResponse`].
///
/// The `code` field is a machine-readable identifier (e.g. `"REQUEST_NOT_FOUND"`).
/// The `message` field is a human-readable description suitable for display.
/// The `engineering_error` field carries debug-level detail that is useful
/// during development but should be stripped or redacted in production.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct APIError {
    /// Machine-readable error code (e.g. `"UNAUTHORIZED"`, `"DUPLICATE_PENDING"`).
    pub code: String,

    /// Human-readable error message.
    pub message: String,

    /// Optional engineering-level detail for debugging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engineering_error: Option<String>,
}

impl APIError {
    pub const UNAUTHORIZED: &'static str = "UNAUTHORIZED";
    pub const NOT_OWNER: &'static str = "NOT_OWNER";
    pub const MEETING_NOT_FOUND: &'static str = "MEETING_NOT_FOUND";
    pub const MEETING_EXISTS: &'static str = "MEETING_EXISTS";
    pub const INVALID_MEETING_CODE: &'static str = "INVALID_MEETING_CODE";
    pub const REQUEST_NOT_FOUND: &'static str = "REQUEST_NOT_FOUND";
    pub const DUPLICATE_PENDING: &'static str = "DUPLICATE_PENDING";
    pub const NAME_REQUIRED: &'static str = "NAME_REQUIRED";
    pub const TOKEN_ISSUANCE_FAILED: &'static str = "TOKEN_ISSUANCE_FAILED";
    pub const INVALID_MESSAGE: &'static str = "INVALID_MESSAGE";
    pub const INTERNAL_ERROR: &'static str = "INTERNAL_ERROR";

    fn new(code: &str, message: String) -> Self {
        Self {
            code: code.to_string(),
            message,
            engineering_error: None,
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(Self::UNAUTHORIZED, "Authentication required.".to_string())
    }

    pub fn unauthorized_with_detail(detail: &str) -> Self {
        Self {
            engineering_error: Some(detail.to_string()),
            ..Self::unauthorized()
        }
    }

    pub fn not_owner() -> Self {
        Self::new(
            Self::NOT_OWNER,
            "Only the meeting creator can manage the lobby".to_string(),
        )
    }

    pub fn meeting_not_found(meeting_code: &str) -> Self {
        Self::new(
            Self::MEETING_NOT_FOUND,
            format!("Meeting '{meeting_code}' not found"),
        )
    }

    pub fn meeting_exists(meeting_code: &str) -> Self {
        Self::new(
            Self::MEETING_EXISTS,
            format!("Meeting with code '{meeting_code}' already exists"),
        )
    }

    pub fn invalid_meeting_code(detail: &str) -> Self {
        Self::new(
            Self::INVALID_MEETING_CODE,
            format!("Invalid meeting code: {detail}"),
        )
    }

    pub fn request_not_found(request_id: &str) -> Self {
        Self::new(
            Self::REQUEST_NOT_FOUND,
            format!("Lobby request '{request_id}' not found or expired"),
        )
    }

    pub fn duplicate_pending(request_id: &str) -> Self {
        Self::new(
            Self::DUPLICATE_PENDING,
            format!("A join request is already pending for this meeting: {request_id}"),
        )
    }

    pub fn name_required() -> Self {
        Self::new(
            Self::NAME_REQUIRED,
            "User name is required for guest users".to_string(),
        )
    }

    pub fn token_issuance_failed(detail: &str) -> Self {
        Self {
            engineering_error: Some(detail.to_string()),
            ..Self::new(
                Self::TOKEN_ISSUANCE_FAILED,
                "Failed to generate meeting credentials; the request is still pending".to_string(),
            )
        }
    }

    pub fn invalid_message(detail: &str) -> Self {
        Self::new(Self::INVALID_MESSAGE, format!("Invalid message: {detail}"))
    }

    pub fn internal_error(detail: &str) -> Self {
        Self {
            engineering_error: Some(detail.to_string()),
            ..Self::new(Self::INTERNAL_ERROR, "Internal server error".to_string())
        }
    }
}

impl std::fmt::Display for APIError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for APIError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engineering_error_is_omitted_when_absent() {
        let json = serde_json::to_string(&APIError::not_owner()).unwrap();
        assert!(!json.contains("engineering_error"));
    }

    #[test]
    fn duplicate_pending_names_existing_request() {
        let err = APIError::duplicate_pending("req-1");
        assert_eq!(err.code, APIError::DUPLICATE_PENDING);
        assert!(err.message.contains("req-1"));
    }

    #[test]
    fn token_failure_keeps_detail_for_engineers() {
        let err = APIError::token_issuance_failed("hmac key rejected");
        assert_eq!(err.code, "TOKEN_ISSUANCE_FAILED");
        assert_eq!(err.engineering_error.as_deref(), Some("hmac key rejected"));
    }
}
