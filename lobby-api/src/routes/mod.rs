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

//! Axum router configuration for the lobby admission service.

pub mod lobby;
pub mod meetings;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::gateway::{admin, visitor};
use crate::state::AppState;

/// Build the full application router with all lobby routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Lobby
        .route(
            "/api/v1/lobby/request",
            post(lobby::request_to_join).delete(lobby::cancel_request),
        )
        .route("/api/v1/lobby/status", get(lobby::request_status))
        .route("/api/v1/lobby/pending", get(lobby::list_pending))
        .route("/api/v1/lobby/respond", post(lobby::respond))
        .route("/api/v1/lobby/admit-all", post(lobby::admit_all))
        // Meetings
        .route("/api/v1/meetings", post(meetings::create_meeting))
        .route(
            "/api/v1/meetings/{meeting_code}",
            delete(meetings::delete_meeting),
        )
        // Real-time gateways
        .route("/ws/lobby/admin", get(admin::admin_ws))
        .route("/ws/lobby/visitor", get(visitor::visitor_ws))
}
