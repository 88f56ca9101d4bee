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

//! Meeting directory: which meetings exist and who owns them.
//!
//! Meeting persistence lives outside this service. The admission engine only
//! needs ownership lookups, so it talks to the [`MeetingDirectory`] trait;
//! [`InMemoryMeetingDirectory`] backs it for single-process deployments and
//! tests.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;
use regex::Regex;

/// Meeting codes look like `abc-defg-hij`.
pub const MEETING_CODE_PATTERN: &str = "^[a-z]{3}-[a-z]{4}-[a-z]{3}$";

static MEETING_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(MEETING_CODE_PATTERN).expect("valid regex"));

#[derive(Debug, Clone)]
pub struct MeetingRecord {
    pub meeting_code: String,
    /// Session subject of the meeting creator; auto-approved on join.
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

impl MeetingRecord {
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}

pub trait MeetingDirectory: Send + Sync {
    fn get(&self, meeting_code: &str) -> Option<MeetingRecord>;
}

#[derive(Debug, Default)]
pub struct InMemoryMeetingDirectory {
    meetings: DashMap<String, MeetingRecord>,
}

impl InMemoryMeetingDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a meeting. Returns `None` if the code is already taken.
    pub fn register(&self, meeting_code: &str, owner_id: &str) -> Option<MeetingRecord> {
        match self.meetings.entry(meeting_code.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let record = MeetingRecord {
                    meeting_code: meeting_code.to_string(),
                    owner_id: owner_id.to_string(),
                    created_at: Utc::now(),
                };
                slot.insert(record.clone());
                Some(record)
            }
        }
    }

    pub fn remove(&self, meeting_code: &str) -> Option<MeetingRecord> {
        self.meetings.remove(meeting_code).map(|(_, record)| record)
    }
}

impl MeetingDirectory for InMemoryMeetingDirectory {
    fn get(&self, meeting_code: &str) -> Option<MeetingRecord> {
        self.meetings.get(meeting_code).map(|r| r.value().clone())
    }
}

pub fn is_valid_meeting_code(meeting_code: &str) -> bool {
    MEETING_CODE_RE.is_match(meeting_code)
}

/// Generate a random `abc-defg-hij` meeting code.
pub fn generate_meeting_code() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let mut group = |len: usize| -> String {
        (0..len)
            .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
            .collect()
    };
    let (head, middle, tail) = (group(3), group(4), group(3));
    format!("{head}-{middle}-{tail}")
}
