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

//! Lobby handlers: join, cancel, status poll, pending list, respond, admit-all.
//!
//! These are the HTTP face of the admission engine. The WebSocket gateways
//! carry the same operations for connected clients.

use axum::{
    extract::{Query, State},
    Json,
};
use lobby_types::{
    requests::{
        AdmitAllRequest, LobbyJoinRequest, LobbyRespondRequest, MeetingCodeQuery, RequestIdQuery,
    },
    responses::{
        APIResponse, AdmitAllResponse, AdmitResult, JoinStatus, LobbyDecisionResponse,
        LobbyJoinResponse, LobbyPendingResponse, LobbyStatusResponse,
    },
    RequestState,
};

use crate::auth::{AuthUser, OptionalAuthUser};
use crate::directory::is_valid_meeting_code;
use crate::error::AppError;
use crate::lobby::{CreateOutcome, Decision, VisitorInfo};
use crate::state::AppState;

fn decision_response(decision: &Decision) -> LobbyDecisionResponse {
    let request = decision.request();
    LobbyDecisionResponse {
        request_id: request.id.clone(),
        status: request.state,
        applied: decision.applied(),
    }
}

/// POST /api/v1/lobby/request
pub async fn request_to_join(
    State(state): State<AppState>,
    OptionalAuthUser(user): OptionalAuthUser,
    Json(body): Json<LobbyJoinRequest>,
) -> Result<Json<APIResponse<LobbyJoinResponse>>, AppError> {
    if !is_valid_meeting_code(&body.meeting_code) {
        return Err(AppError::invalid_meeting_code(&body.meeting_code));
    }

    let visitor = VisitorInfo {
        profile_name: user.as_ref().map(|u| u.name.clone()),
        avatar_url: user.as_ref().and_then(|u| u.avatar_url.clone()),
        user_id: user.map(|u| u.user_id),
        user_name: body.user_name,
        client_id: body.client_id,
    };

    let outcome = state.engine.create_request(&body.meeting_code, visitor)?;
    state.reaper.watch(&body.meeting_code);

    let response = match outcome {
        CreateOutcome::Pending(request) => LobbyJoinResponse {
            request_id: request.id,
            status: JoinStatus::Pending,
            credentials: None,
        },
        CreateOutcome::AutoApproved(request) => LobbyJoinResponse {
            request_id: request.id,
            status: JoinStatus::AutoApproved,
            credentials: request.credentials,
        },
    };
    Ok(Json(APIResponse::ok(response)))
}

/// DELETE /api/v1/lobby/request?request_id=
///
/// The request id is the capability; no session is needed to withdraw it.
pub async fn cancel_request(
    State(state): State<AppState>,
    Query(query): Query<RequestIdQuery>,
) -> Result<Json<APIResponse<LobbyDecisionResponse>>, AppError> {
    let decision = state.engine.cancel(&query.request_id, "visitor")?;
    Ok(Json(APIResponse::ok(decision_response(&decision))))
}

/// GET /api/v1/lobby/status?request_id=
pub async fn request_status(
    State(state): State<AppState>,
    Query(query): Query<RequestIdQuery>,
) -> Result<Json<APIResponse<LobbyStatusResponse>>, AppError> {
    let request = state.engine.status(&query.request_id)?;
    let credentials = match request.state {
        RequestState::Approved => request.credentials,
        _ => None,
    };
    Ok(Json(APIResponse::ok(LobbyStatusResponse {
        request_id: request.id,
        status: request.state,
        credentials,
    })))
}

/// GET /api/v1/lobby/pending?meeting_code=
pub async fn list_pending(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    Query(query): Query<MeetingCodeQuery>,
) -> Result<Json<APIResponse<LobbyPendingResponse>>, AppError> {
    state.engine.authorize(&query.meeting_code, &user_id)?;

    let requests = state
        .engine
        .list_pending(&query.meeting_code)
        .iter()
        .map(|r| r.to_entry())
        .collect();
    Ok(Json(APIResponse::ok(LobbyPendingResponse {
        meeting_code: query.meeting_code,
        requests,
    })))
}

/// POST /api/v1/lobby/respond
pub async fn respond(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    Json(body): Json<LobbyRespondRequest>,
) -> Result<Json<APIResponse<LobbyDecisionResponse>>, AppError> {
    let decision =
        state
            .engine
            .respond(&body.meeting_code, &body.request_id, body.action, &user_id)?;
    Ok(Json(APIResponse::ok(decision_response(&decision))))
}

/// POST /api/v1/lobby/admit-all
pub async fn admit_all(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    Json(body): Json<AdmitAllRequest>,
) -> Result<Json<APIResponse<AdmitAllResponse>>, AppError> {
    let outcomes = state.engine.admit_all(&body.meeting_code, &user_id)?;

    let results: Vec<AdmitResult> = outcomes
        .into_iter()
        .map(|(request_id, outcome)| match outcome {
            Ok(decision) => AdmitResult {
                request_id,
                status: decision.request().state,
                error: None,
            },
            Err(e) => {
                // Failed approvals are rolled back to pending.
                let status = state
                    .engine
                    .status(&request_id)
                    .map(|r| r.state)
                    .unwrap_or(RequestState::Pending);
                AdmitResult {
                    request_id,
                    status,
                    error: Some(AppError::from(e).body),
                }
            }
        })
        .collect();
    let admitted_count = results
        .iter()
        .filter(|r| r.error.is_none() && r.status == RequestState::Approved)
        .count();

    Ok(Json(APIResponse::ok(AdmitAllResponse {
        admitted_count,
        results,
    })))
}
