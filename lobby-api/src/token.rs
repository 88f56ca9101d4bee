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

//! JWT signing and validation.
//!
//! Room access tokens are minted through the [`TokenIssuer`] seam so the
//! admission engine never depends on how the media server authenticates
//! participants. Session tokens identify signed-in users to this service.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lobby_types::lobby::EntryCredentials;
use lobby_types::token::{RoomAccessTokenClaims, SessionClaims};
use thiserror::Error;

/// Everything the media server needs to know about an admitted visitor.
#[derive(Debug, Clone)]
pub struct EntryGrant {
    pub room_code: String,
    pub identity: String,
    pub display_name: String,
    pub role: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("token has expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Produces meeting-entry credentials for an approved request.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, grant: &EntryGrant) -> Result<EntryCredentials, TokenError>;
}

/// Signs HMAC-SHA256 room access tokens shared with the media server.
#[derive(Clone)]
pub struct JwtTokenIssuer {
    secret: String,
    ttl_secs: i64,
    media_server_url: String,
}

impl JwtTokenIssuer {
    pub fn new(secret: &str, ttl_secs: i64, media_server_url: &str) -> Self {
        Self {
            secret: secret.to_string(),
            ttl_secs,
            media_server_url: media_server_url.to_string(),
        }
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(&self, grant: &EntryGrant) -> Result<EntryCredentials, TokenError> {
        let token = generate_room_token(&self.secret, self.ttl_secs, grant)?;
        Ok(EntryCredentials {
            token,
            url: self.media_server_url.clone(),
            room_code: grant.room_code.clone(),
            identity: grant.identity.clone(),
            user_name: grant.display_name.clone(),
        })
    }
}

/// Sign a room access token for the given grant.
pub fn generate_room_token(
    secret: &str,
    ttl_secs: i64,
    grant: &EntryGrant,
) -> Result<String, TokenError> {
    let now = Utc::now().timestamp();
    let claims = RoomAccessTokenClaims {
        sub: grant.identity.clone(),
        room: grant.room_code.clone(),
        room_join: true,
        role: grant.role.clone(),
        display_name: grant.display_name.clone(),
        avatar_url: grant.avatar_url.clone(),
        exp: now + ttl_secs,
        iss: RoomAccessTokenClaims::ISSUER.to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("Failed to sign room token: {e}");
        TokenError::Signing(e.to_string())
    })
}

/// Sign a session token for a signed-in user.
pub fn generate_session_token(
    secret: &str,
    user_id: &str,
    name: &str,
    ttl_secs: i64,
) -> Result<String, TokenError> {
    let claims = SessionClaims {
        sub: user_id.to_string(),
        name: name.to_string(),
        avatar_url: None,
        exp: Utc::now().timestamp() + ttl_secs,
        iss: SessionClaims::ISSUER.to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Validate a session token and return its claims.
///
/// Checks signature, expiry, issuer and the presence of `sub`.
pub fn decode_session_token(secret: &str, token: &str) -> Result<SessionClaims, TokenError> {
    let mut validation = Validation::default();
    validation.set_required_spec_claims(&["exp", "sub"]);
    validation.set_issuer(&[SessionClaims::ISSUER]);

    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid(e.to_string()),
    })
}
