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

//! Background sweepers, one per meeting with lobby activity.
//!
//! A sweeper wakes every `sweep_interval`, runs [`AdmissionEngine::sweep`]
//! and retires itself once the meeting holds no requests. Meeting teardown
//! stops it explicitly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::engine::AdmissionEngine;

struct Sweeper {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Clone)]
pub struct Reaper {
    engine: Arc<AdmissionEngine>,
    interval: Duration,
    sweepers: Arc<DashMap<String, Sweeper>>,
    generation: Arc<AtomicU64>,
}

impl Reaper {
    pub fn new(engine: Arc<AdmissionEngine>) -> Self {
        let interval = engine.settings().sweep_interval;
        Self {
            engine,
            interval,
            sweepers: Arc::new(DashMap::new()),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Make sure a sweeper runs for `meeting_code`. Must be called after the
    /// request that needs sweeping has been created.
    pub fn watch(&self, meeting_code: &str) {
        let Entry::Vacant(slot) = self.sweepers.entry(meeting_code.to_string()) else {
            return;
        };
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let handle = tokio::spawn(sweep_loop(
            self.engine.clone(),
            self.sweepers.clone(),
            meeting_code.to_string(),
            generation,
            self.interval,
        ));
        slot.insert(Sweeper { generation, handle });
        debug!(meeting = %meeting_code, generation, "Lobby sweeper started");
    }

    /// Stop the sweeper of a meeting, if one is running.
    pub fn stop(&self, meeting_code: &str) {
        if let Some((_, sweeper)) = self.sweepers.remove(meeting_code) {
            sweeper.handle.abort();
            info!(meeting = %meeting_code, "Lobby sweeper stopped");
        }
    }

    pub fn is_watching(&self, meeting_code: &str) -> bool {
        self.sweepers.contains_key(meeting_code)
    }
}

async fn sweep_loop(
    engine: Arc<AdmissionEngine>,
    sweepers: Arc<DashMap<String, Sweeper>>,
    meeting_code: String,
    generation: u64,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let report = engine.sweep(&meeting_code, Utc::now());
        if report.remaining > 0 {
            continue;
        }
        let retired = engine.retire_if_idle(&meeting_code, || {
            sweepers.remove_if(&meeting_code, |_, s| s.generation == generation);
        });
        if retired {
            debug!(meeting = %meeting_code, generation, "Lobby sweeper retired");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LobbySettings;
    use crate::directory::InMemoryMeetingDirectory;
    use crate::lobby::engine::VisitorInfo;
    use crate::token::JwtTokenIssuer;
    use lobby_types::RequestState;

    const MEETING: &str = "abc-defg-hij";

    fn engine(request_ttl: Duration) -> Arc<AdmissionEngine> {
        let directory = Arc::new(InMemoryMeetingDirectory::new());
        directory.register(MEETING, "owner");
        Arc::new(AdmissionEngine::new(
            directory,
            Arc::new(JwtTokenIssuer::new("secret", 60, "ws://media")),
            LobbySettings {
                request_ttl,
                retention: Duration::ZERO,
                sweep_interval: Duration::from_millis(20),
                admin_queue_depth: 8,
            },
        ))
    }

    fn guest() -> VisitorInfo {
        VisitorInfo {
            user_name: Some("Guest".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn sweeper_expires_then_retires() {
        let engine = engine(Duration::ZERO);
        let reaper = Reaper::new(engine.clone());
        let id = engine
            .create_request(MEETING, guest())
            .unwrap()
            .request()
            .id
            .clone();
        reaper.watch(MEETING);
        assert!(reaper.is_watching(MEETING));

        // Expired on one pass, purged (zero retention) on a later one.
        for _ in 0..100 {
            if !reaper.is_watching(MEETING) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!reaper.is_watching(MEETING));
        assert!(engine.status(&id).is_err());
    }

    #[tokio::test]
    async fn watch_is_idempotent_and_stop_aborts() {
        let engine = engine(Duration::from_secs(3600));
        let reaper = Reaper::new(engine.clone());
        let id = engine
            .create_request(MEETING, guest())
            .unwrap()
            .request()
            .id
            .clone();
        reaper.watch(MEETING);
        reaper.watch(MEETING);
        assert_eq!(reaper.sweepers.len(), 1);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(engine.status(&id).unwrap().state, RequestState::Pending);
        assert!(reaper.is_watching(MEETING));

        reaper.stop(MEETING);
        assert!(!reaper.is_watching(MEETING));
    }
}
