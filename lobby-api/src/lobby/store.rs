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

//! In-memory registry of lobby requests.
//!
//! The store is the single source of truth for request state. State changes
//! go through [`RequestStore::transition`], a compare-and-set that only
//! succeeds from `Pending`; everything else observes a terminal state and is
//! reported as [`Transition::AlreadyResolved`].
//!
//! Resolved requests are kept until [`RequestStore::purge_resolved_before`]
//! or [`RequestStore::purge_meeting`] removes them, so late duplicate
//! decisions remain idempotent.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use lobby_types::lobby::{EntryCredentials, LobbyRequestEntry};
use lobby_types::RequestState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
    Guest,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Guest => "guest",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LobbyRequest {
    pub id: String,
    pub meeting_code: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    /// Identity presented to the media server.
    pub identity: String,
    /// Key for duplicate-pending detection; `None` for anonymous guests.
    pub visitor_key: Option<String>,
    pub state: RequestState,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Set once an approval has minted entry credentials.
    pub credentials: Option<EntryCredentials>,
}

impl LobbyRequest {
    pub fn to_entry(&self) -> LobbyRequestEntry {
        LobbyRequestEntry {
            request_id: self.id.clone(),
            name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
            role: self.role.as_str().to_string(),
            created_at: self.created_at.timestamp(),
        }
    }
}

/// Result of a compare-and-set on a request's state.
#[derive(Debug, Clone)]
pub enum Transition {
    /// The request was pending and now holds the requested state.
    Applied(LobbyRequest),
    /// The request was already terminal; nothing changed.
    AlreadyResolved(LobbyRequest),
}

#[derive(Debug, Default)]
pub struct RequestStore {
    requests: DashMap<String, LobbyRequest>,
    /// Request ids per meeting, in creation order.
    by_meeting: DashMap<String, Vec<String>>,
}

impl RequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, request: LobbyRequest) {
        self.by_meeting
            .entry(request.meeting_code.clone())
            .or_default()
            .push(request.id.clone());
        self.requests.insert(request.id.clone(), request);
    }

    pub fn get(&self, request_id: &str) -> Option<LobbyRequest> {
        self.requests.get(request_id).map(|r| r.value().clone())
    }

    /// Move a pending request to `to`, stamping `resolved_at`.
    ///
    /// Returns `None` if the request does not exist.
    pub fn transition(
        &self,
        request_id: &str,
        to: RequestState,
        at: DateTime<Utc>,
    ) -> Option<Transition> {
        let mut entry = self.requests.get_mut(request_id)?;
        let request = entry.value_mut();
        if request.state.is_terminal() || to.is_pending() {
            return Some(Transition::AlreadyResolved(request.clone()));
        }
        request.state = to;
        request.resolved_at = Some(at);
        Some(Transition::Applied(request.clone()))
    }

    /// Approve a pending request, storing its credentials in the same step.
    ///
    /// Returns `None` if the request does not exist.
    pub fn approve(
        &self,
        request_id: &str,
        credentials: EntryCredentials,
        at: DateTime<Utc>,
    ) -> Option<Transition> {
        let mut entry = self.requests.get_mut(request_id)?;
        let request = entry.value_mut();
        if request.state.is_terminal() {
            return Some(Transition::AlreadyResolved(request.clone()));
        }
        request.state = RequestState::Approved;
        request.resolved_at = Some(at);
        request.credentials = Some(credentials);
        Some(Transition::Applied(request.clone()))
    }

    fn ids_for(&self, meeting_code: &str) -> Vec<String> {
        self.by_meeting
            .get(meeting_code)
            .map(|ids| ids.value().clone())
            .unwrap_or_default()
    }

    fn requests_for(&self, meeting_code: &str) -> Vec<LobbyRequest> {
        self.ids_for(meeting_code)
            .iter()
            .filter_map(|id| self.get(id))
            .collect()
    }

    /// Pending requests of a meeting in creation order.
    pub fn list_pending(&self, meeting_code: &str) -> Vec<LobbyRequest> {
        self.requests_for(meeting_code)
            .into_iter()
            .filter(|r| r.state.is_pending())
            .collect()
    }

    /// The pending request a visitor already holds in this meeting, if any.
    pub fn find_pending(&self, meeting_code: &str, visitor_key: &str) -> Option<LobbyRequest> {
        self.requests_for(meeting_code)
            .into_iter()
            .find(|r| r.state.is_pending() && r.visitor_key.as_deref() == Some(visitor_key))
    }

    /// Ids of pending requests created at or before `cutoff`.
    pub fn pending_created_before(&self, meeting_code: &str, cutoff: DateTime<Utc>) -> Vec<String> {
        self.requests_for(meeting_code)
            .into_iter()
            .filter(|r| r.state.is_pending() && r.created_at <= cutoff)
            .map(|r| r.id)
            .collect()
    }

    /// Drop resolved requests whose `resolved_at` is at or before `cutoff`.
    /// Returns the purged ids.
    pub fn purge_resolved_before(&self, meeting_code: &str, cutoff: DateTime<Utc>) -> Vec<String> {
        let purged: Vec<String> = self
            .requests_for(meeting_code)
            .into_iter()
            .filter(|r| r.resolved_at.is_some_and(|at| at <= cutoff))
            .map(|r| r.id)
            .collect();
        if purged.is_empty() {
            return purged;
        }

        for id in &purged {
            self.requests.remove(id);
        }
        let now_empty = match self.by_meeting.get_mut(meeting_code) {
            Some(mut ids) => {
                ids.retain(|id| !purged.contains(id));
                ids.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.by_meeting.remove_if(meeting_code, |_, ids| ids.is_empty());
        }
        purged
    }

    /// Drop every request of a meeting. Returns the purged ids.
    pub fn purge_meeting(&self, meeting_code: &str) -> Vec<String> {
        let ids = self
            .by_meeting
            .remove(meeting_code)
            .map(|(_, ids)| ids)
            .unwrap_or_default();
        for id in &ids {
            self.requests.remove(id);
        }
        ids
    }

    /// Number of requests (any state) still held for a meeting.
    pub fn len_for(&self, meeting_code: &str) -> usize {
        self.by_meeting
            .get(meeting_code)
            .map(|ids| ids.len())
            .unwrap_or(0)
    }
}
