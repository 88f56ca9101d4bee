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

//! Axum extractors that resolve the caller's session.
//!
//! The session token is read from `Authorization: Bearer <token>` or, for
//! browsers, from the `session` cookie.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};

use crate::error::AppError;
use crate::state::AppState;
use crate::token::decode_session_token;

/// A signed-in caller.
///
/// Usage in a handler:
/// ```ignore
/// async fn my_handler(AuthUser { user_id, .. }: AuthUser) { ... }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// A caller that may or may not be signed in. Guests joining a lobby use
/// this; an unusable token is treated as no token.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<AuthUser>);

/// Pull the raw session token from the request headers.
pub fn session_token(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    let cookie_header = parts
        .headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    for pair in cookie_header.split(';') {
        let pair = pair.trim();
        if let Some(value) = pair.strip_prefix("session=") {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Validate a session token against the service secret.
pub fn authenticate(secret: &str, token: &str) -> Result<AuthUser, AppError> {
    let claims = decode_session_token(secret, token).map_err(|e| {
        tracing::debug!("Rejected session token: {e}");
        AppError::unauthorized()
    })?;
    Ok(AuthUser {
        user_id: claims.sub,
        name: claims.name,
        avatar_url: claims.avatar_url,
    })
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let token = session_token(parts).ok_or_else(AppError::unauthorized)?;
        authenticate(&state.jwt_secret, &token)
    }
}

impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(OptionalAuthUser(
            session_token(parts).and_then(|token| authenticate(&state.jwt_secret, &token).ok()),
        ))
    }
}
