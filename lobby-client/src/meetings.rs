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

//! Meeting registration and teardown.

use lobby_types::{
    requests::CreateMeetingRequest,
    responses::{DeleteMeetingResponse, MeetingResponse},
};

use crate::error::ApiError;
use crate::{parse_api_response, LobbyApiClient};

impl LobbyApiClient {
    /// Register a meeting owned by the authenticated user. A code is
    /// generated when `meeting_code` is `None`.
    ///
    /// Calls `POST /api/v1/meetings`.
    pub async fn create_meeting(
        &self,
        meeting_code: Option<&str>,
    ) -> Result<MeetingResponse, ApiError> {
        let body = CreateMeetingRequest {
            meeting_code: meeting_code.map(str::to_string),
        };
        let response = self.post("/api/v1/meetings").json(&body).send().await?;
        parse_api_response(response).await
    }

    /// Tear down a meeting and its lobby (owner only). Waiting visitors are
    /// told the meeting is gone.
    ///
    /// Calls `DELETE /api/v1/meetings/{meeting_code}`.
    pub async fn delete_meeting(
        &self,
        meeting_code: &str,
    ) -> Result<DeleteMeetingResponse, ApiError> {
        let path = format!("/api/v1/meetings/{meeting_code}");
        let response = self.delete(&path).send().await?;
        parse_api_response(response).await
    }
}
