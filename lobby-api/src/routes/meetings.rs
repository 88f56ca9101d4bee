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

//! Handlers for registering and tearing down in-memory meetings.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use lobby_types::{
    requests::CreateMeetingRequest,
    responses::{APIResponse, DeleteMeetingResponse, MeetingResponse},
};

use crate::auth::AuthUser;
use crate::directory::{generate_meeting_code, is_valid_meeting_code, MEETING_CODE_PATTERN};
use crate::error::AppError;
use crate::state::AppState;

/// POST /api/v1/meetings
pub async fn create_meeting(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    Json(body): Json<CreateMeetingRequest>,
) -> Result<(StatusCode, Json<APIResponse<MeetingResponse>>), AppError> {
    let meeting_code = match body.meeting_code {
        Some(code) => {
            let code = code.trim().to_string();
            if !is_valid_meeting_code(&code) {
                return Err(AppError::invalid_meeting_code(&format!(
                    "'{code}' does not match {MEETING_CODE_PATTERN}"
                )));
            }
            code
        }
        None => generate_meeting_code(),
    };

    let record = state
        .meetings
        .register(&meeting_code, &user_id)
        .ok_or_else(|| AppError::meeting_exists(&meeting_code))?;

    tracing::info!(meeting = %record.meeting_code, owner = %record.owner_id, "Meeting registered");

    Ok((
        StatusCode::CREATED,
        Json(APIResponse::ok(MeetingResponse {
            meeting_code: record.meeting_code,
            owner: record.owner_id,
            created_at: record.created_at.timestamp(),
        })),
    ))
}

/// DELETE /api/v1/meetings/{meeting_code}
pub async fn delete_meeting(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    Path(meeting_code): Path<String>,
) -> Result<Json<APIResponse<DeleteMeetingResponse>>, AppError> {
    state.engine.authorize(&meeting_code, &user_id)?;

    // Unlist first so that no request can be created behind the teardown.
    state.meetings.remove(&meeting_code);
    state.reaper.stop(&meeting_code);
    let purged_requests = state.engine.teardown(&meeting_code);

    Ok(Json(APIResponse::ok(DeleteMeetingResponse {
        message: format!("Meeting {meeting_code} deleted"),
        purged_requests,
    })))
}
