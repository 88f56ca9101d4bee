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

//! Shared application state passed to every Axum handler via `State`.

use std::sync::Arc;

use crate::config::Config;
use crate::directory::InMemoryMeetingDirectory;
use crate::lobby::{AdmissionEngine, Reaper};
use crate::token::{JwtTokenIssuer, TokenIssuer};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The admission engine; owns every lobby request.
    pub engine: Arc<AdmissionEngine>,
    /// Meetings known to this instance and their owners.
    pub meetings: Arc<InMemoryMeetingDirectory>,
    /// Per-meeting expiry and retention sweepers.
    pub reaper: Reaper,
    /// Secret used to validate session tokens.
    pub jwt_secret: String,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let issuer = JwtTokenIssuer::new(
            &config.jwt_secret,
            config.token_ttl_secs,
            &config.media_server_url,
        );
        Self::with_issuer(config, Arc::new(issuer))
    }

    /// Build state around a custom token issuer.
    pub fn with_issuer(config: &Config, issuer: Arc<dyn TokenIssuer>) -> Self {
        let meetings = Arc::new(InMemoryMeetingDirectory::new());
        for (meeting_code, owner) in &config.seed_meetings {
            if meetings.register(meeting_code, owner).is_some() {
                tracing::info!(meeting = %meeting_code, owner = %owner, "Registered seed meeting");
            }
        }

        let engine = Arc::new(AdmissionEngine::new(
            meetings.clone(),
            issuer,
            config.lobby.clone(),
        ));
        Self {
            reaper: Reaper::new(engine.clone()),
            engine,
            meetings,
            jwt_secret: config.jwt_secret.clone(),
        }
    }
}
