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

//! Integration tests for meeting registration and teardown.


use axum::body::Body;
use axum::http::StatusCode;
use lobby_types::{
    responses::{APIResponse, DeleteMeetingResponse, MeetingResponse},
    APIError,
};
use serde_json::json;
use test_helpers::*;
use tower::ServiceExt;

#[tokio::test]
async fn test_create_meeting_with_explicit_code() {
    let state = build_state();
    let app = build_app(&state);

    let req = request_with_session("POST", "/api/v1/meetings", "creator-1")
        .header("Content-Type", "application/json")
        .body(json_body(&json!({ "meeting_code": "xyz-abcd-efg" })))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: APIResponse<MeetingResponse> = response_json(resp).await;
    assert!(body.success);
    assert_eq!(body.result.meeting_code, "xyz-abcd-efg");
    assert_eq!(body.result.owner, "creator-1");
}

#[tokio::test]
async fn test_create_meeting_generates_code_when_omitted() {
    let state = build_state();
    let app = build_app(&state);

    let req = request_with_session("POST", "/api/v1/meetings", "creator-1")
        .header("Content-Type", "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: APIResponse<MeetingResponse> = response_json(resp).await;
    assert!(lobby_api::directory::is_valid_meeting_code(&body.result.meeting_code));
}

#[tokio::test]
async fn test_create_meeting_requires_session() {
    let state = build_state();
    let app = build_app(&state);

    let req = anonymous_request("POST", "/api/v1/meetings")
        .header("Content-Type", "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_meeting_rejects_malformed_code() {
    let state = build_state();
    let app = build_app(&state);

    let req = request_with_session("POST", "/api/v1/meetings", "creator-1")
        .header("Content-Type", "application/json")
        .body(json_body(&json!({ "meeting_code": "Not A Code" })))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: APIResponse<APIError> = response_json(resp).await;
    assert_eq!(body.result.code, "INVALID_MEETING_CODE");
}

#[tokio::test]
async fn test_create_taken_code_returns_409() {
    let state = build_state();
    let app = build_app(&state);

    let req = request_with_session("POST", "/api/v1/meetings", "creator-2")
        .header("Content-Type", "application/json")
        .body(json_body(&json!({ "meeting_code": MEETING })))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: APIResponse<APIError> = response_json(resp).await;
    assert_eq!(body.result.code, "MEETING_EXISTS");
}

#[tokio::test]
async fn test_delete_meeting_tears_down_lobby() {
    let state = build_state();
    let app = build_app(&state);

    for name in ["Ann", "Ben"] {
        let req = anonymous_request("POST", "/api/v1/lobby/request")
            .header("Content-Type", "application/json")
            .body(json_body(&json!({ "meeting_code": MEETING, "user_name": name })))
            .unwrap();
        assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::OK);
    }
    assert!(state.reaper.is_watching(MEETING));

    let req = request_with_session("DELETE", &format!("/api/v1/meetings/{MEETING}"), OWNER)
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: APIResponse<DeleteMeetingResponse> = response_json(resp).await;
    assert_eq!(body.result.purged_requests, 2);

    assert!(!state.reaper.is_watching(MEETING));
    assert!(state.engine.list_pending(MEETING).is_empty());

    // The meeting is gone for new visitors too.
    let req = anonymous_request("POST", "/api/v1/lobby/request")
        .header("Content-Type", "application/json")
        .body(json_body(&json!({ "meeting_code": MEETING, "user_name": "Cid" })))
        .unwrap();
    assert_eq!(
        app.oneshot(req).await.unwrap().status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_only_owner_can_delete_meeting() {
    let state = build_state();
    let app = build_app(&state);

    let req = request_with_session("DELETE", &format!("/api/v1/meetings/{MEETING}"), "intruder")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
