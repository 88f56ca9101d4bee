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

//! Cross-platform REST client for the videocall.rs lobby service.
//!
//! The REST half works on WASM (browser), desktop, and mobile targets via
//! [`reqwest`]. Native targets also get [`waiter`], which holds a visitor's
//! WebSocket open until the request is resolved.
//!
//! # Example
//!
//! ```no_run
//! use lobby_client::{AuthMode, LobbyApiClient, ReconnectPolicy};
//!
//! # async fn example() -> Result<(), lobby_client::ApiError> {
//! let visitor = LobbyApiClient::new("http://localhost:8081", AuthMode::Cookie);
//! let joined = visitor
//!     .request_to_join("abc-defg-hij", Some("Alice"), None)
//!     .await?;
//!
//! let outcome = visitor
//!     .wait_for_admission(&joined.request_id, "abc-defg-hij", &ReconnectPolicy::default())
//!     .await?;
//! println!("Lobby outcome: {outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod lobby;
pub mod meetings;
#[cfg(not(target_arch = "wasm32"))]
pub mod waiter;

pub use error::ApiError;
pub use lobby_types;
#[cfg(not(target_arch = "wasm32"))]
pub use waiter::{LobbyOutcome, ReconnectPolicy};

use lobby_types::{responses::APIResponse, APIError};
use reqwest::Client;

/// How the client authenticates with the lobby service.
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// Browser mode: send credentials (cookies) automatically via `fetch`.
    /// On native targets this sends no credentials, which is how guests join.
    Cookie,
    /// Bearer token mode: attach `Authorization: Bearer <token>` to every
    /// request. Used by CLI tools, mobile apps, and meeting owners.
    Bearer(String),
}

/// A typed REST client for the lobby service.
///
/// All methods return strongly-typed responses from [`lobby_types`] and map
/// HTTP errors to [`ApiError`].
#[derive(Debug, Clone)]
pub struct LobbyApiClient {
    base_url: String,
    auth: AuthMode,
    http: Client,
}

impl LobbyApiClient {
    /// Create a new client pointing at the given lobby service base URL,
    /// e.g. `"http://localhost:8081"`.
    pub fn new(base_url: &str, auth: AuthMode) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            http: Client::new(),
        }
    }

    /// Update the bearer token (e.g. after a token refresh).
    pub fn set_bearer_token(&mut self, token: String) {
        self.auth = AuthMode::Bearer(token);
    }

    pub(crate) fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.apply_auth(self.http.get(self.url(path)))
    }

    pub(crate) fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.apply_auth(self.http.post(self.url(path)))
    }

    pub(crate) fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.apply_auth(self.http.delete(self.url(path)))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// The `ws://` / `wss://` form of `path` on the same host.
    pub(crate) fn ws_url(&self, path: &str) -> Result<String, ApiError> {
        let url = self.url(path);
        if let Some(rest) = url.strip_prefix("https://") {
            Ok(format!("wss://{rest}"))
        } else if let Some(rest) = url.strip_prefix("http://") {
            Ok(format!("ws://{rest}"))
        } else {
            Err(ApiError::Config(format!(
                "base URL must start with http:// or https://, got {}",
                self.base_url
            )))
        }
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            AuthMode::Cookie => {
                #[cfg(target_arch = "wasm32")]
                {
                    builder.fetch_credentials_include()
                }
                #[cfg(not(target_arch = "wasm32"))]
                {
                    builder
                }
            }
            AuthMode::Bearer(token) => {
                builder.header(reqwest::header::AUTHORIZATION, format!("Bearer {token}"))
            }
        }
    }
}

/// Human-readable text for an error body, preferring the envelope's
/// `code: message` when the body is a well-formed `APIResponse<APIError>`.
fn error_text(body: String) -> String {
    match serde_json::from_str::<APIResponse<APIError>>(&body) {
        Ok(envelope) => format!("{}: {}", envelope.result.code, envelope.result.message),
        Err(_) => body,
    }
}

/// Parse a standard `APIResponse<T>` body, returning `T` on success or
/// mapping the error to [`ApiError`].
pub(crate) async fn parse_api_response<T: serde::de::DeserializeOwned + serde::Serialize>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status().as_u16();
    if matches!(status, 200 | 201) {
        let wrapper: APIResponse<T> = response.json().await?;
        return Ok(wrapper.result);
    }

    let body = response.text().await.unwrap_or_default();
    log::debug!("lobby service returned {status}: {body}");
    Err(match status {
        400 => ApiError::BadRequest(error_text(body)),
        401 => ApiError::NotAuthenticated,
        403 => ApiError::Forbidden(error_text(body)),
        404 => ApiError::NotFound(error_text(body)),
        409 => ApiError::Conflict(error_text(body)),
        _ => ApiError::ServerError { status, body },
    })
}
