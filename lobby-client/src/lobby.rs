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

//! Lobby endpoints: join, cancel, status, pending list, respond, admit-all.

use lobby_types::{
    requests::{AdmitAllRequest, LobbyJoinRequest, LobbyRespondRequest},
    responses::{
        AdmitAllResponse, LobbyDecisionResponse, LobbyJoinResponse, LobbyPendingResponse,
        LobbyStatusResponse,
    },
    LobbyAction,
};

use crate::error::ApiError;
use crate::{parse_api_response, LobbyApiClient};

impl LobbyApiClient {
    /// Ask to enter a meeting.
    ///
    /// Calls `POST /api/v1/lobby/request`.
    ///
    /// Guests must pass `user_name`. Sending a stable `client_id` lets the
    /// server recognize a retried join; a second join while the first is
    /// still pending fails with [`ApiError::Conflict`]. The meeting owner is
    /// admitted immediately and gets credentials in the response.
    pub async fn request_to_join(
        &self,
        meeting_code: &str,
        user_name: Option<&str>,
        client_id: Option<&str>,
    ) -> Result<LobbyJoinResponse, ApiError> {
        let body = LobbyJoinRequest {
            meeting_code: meeting_code.to_string(),
            user_name: user_name.map(str::to_string),
            client_id: client_id.map(str::to_string),
        };
        let response = self
            .post("/api/v1/lobby/request")
            .json(&body)
            .send()
            .await?;
        parse_api_response(response).await
    }

    /// Withdraw a join request.
    ///
    /// Calls `DELETE /api/v1/lobby/request?request_id={request_id}`.
    pub async fn cancel_request(&self, request_id: &str) -> Result<LobbyDecisionResponse, ApiError> {
        let response = self
            .delete("/api/v1/lobby/request")
            .query(&[("request_id", request_id)])
            .send()
            .await?;
        parse_api_response(response).await
    }

    /// Current state of a join request; carries credentials once approved.
    ///
    /// Calls `GET /api/v1/lobby/status?request_id={request_id}`.
    pub async fn request_status(&self, request_id: &str) -> Result<LobbyStatusResponse, ApiError> {
        let response = self
            .get("/api/v1/lobby/status")
            .query(&[("request_id", request_id)])
            .send()
            .await?;
        parse_api_response(response).await
    }

    /// Pending requests for a meeting (owner only).
    ///
    /// Calls `GET /api/v1/lobby/pending?meeting_code={meeting_code}`.
    pub async fn pending(&self, meeting_code: &str) -> Result<LobbyPendingResponse, ApiError> {
        let response = self
            .get("/api/v1/lobby/pending")
            .query(&[("meeting_code", meeting_code)])
            .send()
            .await?;
        parse_api_response(response).await
    }

    /// Approve or reject one request (owner only).
    ///
    /// Calls `POST /api/v1/lobby/respond`. Responding to a request that is
    /// already resolved succeeds with `applied: false` and the final state.
    pub async fn respond(
        &self,
        meeting_code: &str,
        request_id: &str,
        action: LobbyAction,
    ) -> Result<LobbyDecisionResponse, ApiError> {
        let body = LobbyRespondRequest {
            meeting_code: meeting_code.to_string(),
            request_id: request_id.to_string(),
            action,
        };
        let response = self
            .post("/api/v1/lobby/respond")
            .json(&body)
            .send()
            .await?;
        parse_api_response(response).await
    }

    /// Approve every pending request (owner only).
    ///
    /// Calls `POST /api/v1/lobby/admit-all`.
    pub async fn admit_all(&self, meeting_code: &str) -> Result<AdmitAllResponse, ApiError> {
        let body = AdmitAllRequest {
            meeting_code: meeting_code.to_string(),
        };
        let response = self
            .post("/api/v1/lobby/admit-all")
            .json(&body)
            .send()
            .await?;
        parse_api_response(response).await
    }
}
