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

//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

/// Configuration for the lobby admission service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server (e.g. "0.0.0.0:8081").
    pub listen_addr: String,
    /// Shared secret used to sign session and room access tokens (HMAC-SHA256).
    pub jwt_secret: String,
    /// Media server URL handed to admitted visitors alongside their token.
    pub media_server_url: String,
    /// Room access token time-to-live in seconds (default: 600).
    pub token_ttl_secs: i64,
    /// Lobby timing and queue settings.
    pub lobby: LobbySettings,
    /// Meetings registered at startup as `(meeting_code, owner)` pairs.
    pub seed_meetings: Vec<(String, String)>,
}

/// Timing knobs for the admission engine and its reaper.
#[derive(Debug, Clone)]
pub struct LobbySettings {
    /// How long a request may stay pending before it expires.
    pub request_ttl: Duration,
    /// How long resolved requests are kept so late duplicates stay no-ops.
    pub retention: Duration,
    /// Interval between reaper passes for a meeting.
    pub sweep_interval: Duration,
    /// Per-admin outbound queue depth; a full queue evicts the subscriber.
    pub admin_queue_depth: usize,
}

impl Default for LobbySettings {
    fn default() -> Self {
        Self {
            request_ttl: Duration::from_secs(3600),
            retention: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(5),
            admin_queue_depth: 256,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> Result<T, String> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .map_err(|_| format!("{name} must be a valid integer"))
}

/// Parse `LOBBY_MEETINGS` (`code=owner,code=owner`).
fn parse_seed_meetings(raw: &str) -> Result<Vec<(String, String)>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (code, owner) = entry
                .split_once('=')
                .ok_or_else(|| format!("LOBBY_MEETINGS entry '{entry}' must be code=owner"))?;
            let (code, owner) = (code.trim(), owner.trim());
            if code.is_empty() || owner.is_empty() {
                return Err(format!("LOBBY_MEETINGS entry '{entry}' must be code=owner"));
            }
            Ok((code.to_string(), owner.to_string()))
        })
        .collect()
}

impl Config {
    /// Configuration with every optional setting at its default.
    pub fn with_defaults(jwt_secret: &str) -> Self {
        Self {
            listen_addr: "0.0.0.0:8081".to_string(),
            jwt_secret: jwt_secret.to_string(),
            media_server_url: "ws://localhost:7880".to_string(),
            token_ttl_secs: 600,
            lobby: LobbySettings::default(),
            seed_meetings: Vec::new(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Required
    /// - `JWT_SECRET`
    ///
    /// # Optional
    /// - `LISTEN_ADDR` (default: `"0.0.0.0:8081"`)
    /// - `MEDIA_SERVER_URL` (default: `"ws://localhost:7880"`)
    /// - `TOKEN_TTL_SECS` (default: `"600"`)
    /// - `LOBBY_REQUEST_TTL_SECS` (default: `"3600"`)
    /// - `LOBBY_RETENTION_SECS` (default: `"30"`)
    /// - `LOBBY_SWEEP_INTERVAL_SECS` (default: `"5"`)
    /// - `LOBBY_ADMIN_QUEUE_DEPTH` (default: `"256"`)
    /// - `LOBBY_MEETINGS` (e.g. `"abc-defg-hij=user-1,xyz-abcd-efg=user-2"`)
    pub fn from_env() -> Result<Self, String> {
        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| "JWT_SECRET environment variable is required")?;
        if jwt_secret.is_empty() {
            return Err("JWT_SECRET must not be empty".to_string());
        }

        let listen_addr = env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8081".to_string());
        let media_server_url =
            env::var("MEDIA_SERVER_URL").unwrap_or_else(|_| "ws://localhost:7880".to_string());
        let token_ttl_secs = parse_var::<i64>("TOKEN_TTL_SECS", "600")?;

        let sweep_interval_secs = parse_var::<u64>("LOBBY_SWEEP_INTERVAL_SECS", "5")?;
        if sweep_interval_secs == 0 {
            return Err("LOBBY_SWEEP_INTERVAL_SECS must be greater than zero".to_string());
        }
        let lobby = LobbySettings {
            request_ttl: Duration::from_secs(parse_var("LOBBY_REQUEST_TTL_SECS", "3600")?),
            retention: Duration::from_secs(parse_var("LOBBY_RETENTION_SECS", "30")?),
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            admin_queue_depth: parse_var::<usize>("LOBBY_ADMIN_QUEUE_DEPTH", "256")?.max(1),
        };

        let seed_meetings = parse_seed_meetings(&env::var("LOBBY_MEETINGS").unwrap_or_default())?;

        Ok(Self {
            listen_addr,
            jwt_secret,
            media_server_url,
            token_ttl_secs,
            lobby,
            seed_meetings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_meetings_parse_pairs_and_skip_blanks() {
        let parsed = parse_seed_meetings(" abc-defg-hij = owner-1 ,, xyz-abcd-efg=owner-2").unwrap();
        assert_eq!(
            parsed,
            vec![
                ("abc-defg-hij".to_string(), "owner-1".to_string()),
                ("xyz-abcd-efg".to_string(), "owner-2".to_string()),
            ]
        );
    }

    #[test]
    fn seed_meetings_reject_missing_owner() {
        assert!(parse_seed_meetings("abc-defg-hij").is_err());
        assert!(parse_seed_meetings("abc-defg-hij=").is_err());
    }

    #[test]
    fn empty_seed_list_is_fine() {
        assert!(parse_seed_meetings("").unwrap().is_empty());
    }
}
