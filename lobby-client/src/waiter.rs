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

//! Visitor waiter: hold a WebSocket on `/ws/lobby/visitor` until the join
//! request is resolved.
//!
//! A dropped connection is retried with exponential backoff. Between
//! attempts the request status is polled, so a decision taken while the
//! visitor was offline is picked up without reconnecting. Once the attempt
//! budget is spent the waiter keeps polling `GET /api/v1/lobby/status` at the
//! maximum backoff until the request leaves `pending`.

use std::time::Duration;

use futures::StreamExt;
use lobby_types::{
    lobby::EntryCredentials, messages::VisitorServerMessage, responses::LobbyStatusResponse,
    RequestState,
};
use tokio_tungstenite::{connect_async, tungstenite};

use crate::error::ApiError;
use crate::LobbyApiClient;

/// How hard the waiter tries to keep a WebSocket open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Connection attempts before falling back to polling.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 12,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(32),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `retry` (zero-based), doubling from
    /// `initial_backoff` and capped at `max_backoff`.
    pub fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(retry))
            .min(self.max_backoff)
    }
}

/// How a join request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyOutcome {
    Admitted(EntryCredentials),
    Rejected,
    Cancelled,
    Expired,
}

impl LobbyOutcome {
    /// `None` while the request is still pending, or approved but not yet
    /// carrying credentials.
    pub fn from_status(status: LobbyStatusResponse) -> Option<Self> {
        Some(match status.status {
            RequestState::Pending => return None,
            RequestState::Approved => match status.credentials {
                Some(credentials) => LobbyOutcome::Admitted(credentials),
                None => {
                    log::warn!(
                        "Request {} approved without credentials, polling again",
                        status.request_id
                    );
                    return None;
                }
            },
            RequestState::Rejected => LobbyOutcome::Rejected,
            RequestState::Cancelled => LobbyOutcome::Cancelled,
            RequestState::Expired => LobbyOutcome::Expired,
        })
    }

    fn from_frame(frame: VisitorServerMessage) -> Result<Self, ApiError> {
        match frame {
            VisitorServerMessage::Approved(credentials) => Ok(LobbyOutcome::Admitted(credentials)),
            VisitorServerMessage::Rejected => Ok(LobbyOutcome::Rejected),
            VisitorServerMessage::Cancelled => Ok(LobbyOutcome::Cancelled),
            VisitorServerMessage::Expired => Ok(LobbyOutcome::Expired),
            VisitorServerMessage::Error { code, message } => Err(ApiError::Lobby { code, message }),
        }
    }
}

fn handshake_error(request_id: &str, err: tungstenite::Error) -> ApiError {
    match err {
        tungstenite::Error::Http(response) => match response.status().as_u16() {
            404 => ApiError::NotFound(format!("lobby request {request_id}")),
            status => ApiError::ServerError {
                status,
                body: response
                    .body()
                    .as_deref()
                    .map(|b| String::from_utf8_lossy(b).into_owned())
                    .unwrap_or_default(),
            },
        },
        other => ApiError::WebSocket(other.to_string()),
    }
}

impl LobbyApiClient {
    /// Wait until `request_id` is approved, rejected, cancelled, or expired.
    ///
    /// Returns early with an error when the request or meeting no longer
    /// exists. Transport failures are retried according to `policy`.
    pub async fn wait_for_admission(
        &self,
        request_id: &str,
        meeting_code: &str,
        policy: &ReconnectPolicy,
    ) -> Result<LobbyOutcome, ApiError> {
        let url = format!(
            "{}?request_id={request_id}&meeting_code={meeting_code}",
            self.ws_url("/ws/lobby/visitor")?
        );

        for attempt in 0..policy.max_attempts {
            match self.wait_once(&url, request_id).await {
                Ok(Some(outcome)) => return Ok(outcome),
                Ok(None) => log::info!("Lobby connection for {request_id} closed before a decision"),
                Err(e) if e.is_retryable() => {
                    log::warn!("Lobby connection attempt {} failed: {e}", attempt + 1)
                }
                Err(e) => return Err(e),
            }

            if let Some(outcome) = self.poll_outcome(request_id).await? {
                return Ok(outcome);
            }
            if attempt + 1 < policy.max_attempts {
                tokio::time::sleep(policy.backoff(attempt)).await;
            }
        }

        log::warn!(
            "Giving up on lobby WebSocket after {} attempts, polling status",
            policy.max_attempts
        );
        loop {
            if let Some(outcome) = self.poll_outcome(request_id).await? {
                return Ok(outcome);
            }
            tokio::time::sleep(policy.max_backoff).await;
        }
    }

    /// One WebSocket session. `Ok(None)` means the connection ended without
    /// a resolution.
    async fn wait_once(&self, url: &str, request_id: &str) -> Result<Option<LobbyOutcome>, ApiError> {
        let (mut ws, _) = connect_async(url)
            .await
            .map_err(|e| handshake_error(request_id, e))?;
        log::debug!("Waiting in lobby as {request_id}");

        while let Some(frame) = ws.next().await {
            match frame.map_err(|e| ApiError::WebSocket(e.to_string()))? {
                tungstenite::Message::Text(text) => {
                    let frame: VisitorServerMessage = serde_json::from_str(&text)?;
                    return LobbyOutcome::from_frame(frame).map(Some);
                }
                tungstenite::Message::Close(_) => break,
                _ => {}
            }
        }
        Ok(None)
    }

    async fn poll_outcome(&self, request_id: &str) -> Result<Option<LobbyOutcome>, ApiError> {
        match self.request_status(request_id).await {
            Ok(status) => Ok(LobbyOutcome::from_status(status)),
            Err(e) if e.is_retryable() => {
                log::warn!("Lobby status poll for {request_id} failed: {e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(state: RequestState, credentials: Option<EntryCredentials>) -> LobbyStatusResponse {
        LobbyStatusResponse {
            request_id: "r1".to_string(),
            status: state,
            credentials,
        }
    }

    fn credentials() -> EntryCredentials {
        EntryCredentials {
            token: "t".to_string(),
            url: "ws://media".to_string(),
            room_code: "abc-defg-hij".to_string(),
            identity: "guest_1".to_string(),
            user_name: "Alice".to_string(),
        }
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let policy = ReconnectPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(1000),
        };
        let delays: Vec<u128> = (0..6).map(|n| policy.backoff(n).as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1000, 1000]);
    }

    #[test]
    fn backoff_does_not_overflow_on_large_retry_counts() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.backoff(u32::MAX), policy.max_backoff);
    }

    #[test]
    fn pending_status_is_not_an_outcome() {
        assert_eq!(
            LobbyOutcome::from_status(status(RequestState::Pending, None)),
            None
        );
    }

    #[test]
    fn terminal_status_maps_to_outcome() {
        assert_eq!(
            LobbyOutcome::from_status(status(RequestState::Approved, Some(credentials()))),
            Some(LobbyOutcome::Admitted(credentials()))
        );
        assert_eq!(
            LobbyOutcome::from_status(status(RequestState::Expired, None)),
            Some(LobbyOutcome::Expired)
        );
    }

    #[test]
    fn approval_without_credentials_keeps_waiting() {
        assert_eq!(
            LobbyOutcome::from_status(status(RequestState::Approved, None)),
            None
        );
    }

    #[test]
    fn error_frame_ends_the_wait() {
        let err = LobbyOutcome::from_frame(VisitorServerMessage::Error {
            code: "MEETING_NOT_FOUND".to_string(),
            message: "gone".to_string(),
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::Lobby { code, .. } if code == "MEETING_NOT_FOUND"));
    }
}
