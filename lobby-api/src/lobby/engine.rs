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

//! Admission engine: the only component that mutates lobby requests.
//!
//! Every mutation of a meeting's requests runs under that meeting's hub lock
//! (see [`EventChannel::lock_hub`]) and never awaits while holding it. On top
//! of that the store's compare-and-set guarantees a request leaves `Pending`
//! exactly once, so racing admins produce one winner and one token.
//!
//! A hub exists while its meeting holds requests or admin subscribers. Hubs
//! are only created for meetings found in the directory, and the engine
//! retires a hub under its own lock once it holds neither.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lobby_types::messages::{AdminServerMessage, VisitorServerMessage};
use lobby_types::{LobbyAction, RequestState};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::channel::{AdminSubscription, EventChannel, MeetingHub};
use super::store::{LobbyRequest, RequestStore, Role, Transition};
use crate::config::LobbySettings;
use crate::directory::{MeetingDirectory, MeetingRecord};
use crate::token::{EntryGrant, TokenIssuer};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LobbyError {
    #[error("lobby request {0} not found")]
    NotFound(String),
    #[error("visitor already has pending request {request_id}")]
    DuplicatePending { request_id: String },
    #[error("could not issue entry token: {0}")]
    TokenIssuanceFailed(String),
    #[error("meeting {0} not found")]
    MeetingNotFound(String),
    #[error("only the meeting owner can manage its lobby")]
    NotOwner,
    #[error("a display name is required")]
    NameRequired,
}

/// Who is knocking.
#[derive(Debug, Clone, Default)]
pub struct VisitorInfo {
    /// Session subject of a signed-in visitor.
    pub user_id: Option<String>,
    /// Name from the visitor's session, used when no name is supplied.
    pub profile_name: Option<String>,
    /// Name typed by the visitor.
    pub user_name: Option<String>,
    pub avatar_url: Option<String>,
    /// Per-device id a guest may send for duplicate detection.
    pub client_id: Option<String>,
}

impl VisitorInfo {
    fn display_name(&self) -> Option<String> {
        [self.user_name.as_deref(), self.profile_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|name| !name.is_empty())
            .map(str::to_string)
    }

    fn visitor_key(&self) -> Option<String> {
        match (&self.user_id, &self.client_id) {
            (Some(user_id), _) => Some(format!("user:{user_id}")),
            (None, Some(client_id)) if !client_id.trim().is_empty() => {
                Some(format!("client:{}", client_id.trim()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CreateOutcome {
    /// Waiting for an admin.
    Pending(LobbyRequest),
    /// The owner skipped the lobby; credentials are on the request.
    AutoApproved(LobbyRequest),
}

impl CreateOutcome {
    pub fn request(&self) -> &LobbyRequest {
        match self {
            CreateOutcome::Pending(r) | CreateOutcome::AutoApproved(r) => r,
        }
    }
}

/// Result of a decision on a request.
#[derive(Debug, Clone)]
pub enum Decision {
    Applied(LobbyRequest),
    /// Someone else got there first. Carries the state they left behind.
    AlreadyResolved(LobbyRequest),
}

impl Decision {
    pub fn request(&self) -> &LobbyRequest {
        match self {
            Decision::Applied(r) | Decision::AlreadyResolved(r) => r,
        }
    }

    pub fn applied(&self) -> bool {
        matches!(self, Decision::Applied(_))
    }
}

/// What a visitor connection should do after binding.
pub enum VisitorBinding {
    /// The request is already terminal; send this and close.
    Resolved(VisitorServerMessage),
    /// Wait on the mailbox.
    Waiting {
        binding: u64,
        resolution: oneshot::Receiver<VisitorServerMessage>,
    },
}

/// Outcome of one reaper pass over a meeting.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: Vec<String>,
    pub purged: usize,
    /// Requests of any state still held for the meeting.
    pub remaining: usize,
}

pub struct AdmissionEngine {
    store: RequestStore,
    channel: EventChannel,
    directory: Arc<dyn MeetingDirectory>,
    issuer: Arc<dyn TokenIssuer>,
    settings: LobbySettings,
}

fn cutoff(now: DateTime<Utc>, age: Duration) -> Option<DateTime<Utc>> {
    let age = chrono::Duration::from_std(age).ok()?;
    now.checked_sub_signed(age)
}

impl AdmissionEngine {
    pub fn new(
        directory: Arc<dyn MeetingDirectory>,
        issuer: Arc<dyn TokenIssuer>,
        settings: LobbySettings,
    ) -> Self {
        Self {
            store: RequestStore::new(),
            channel: EventChannel::new(settings.admin_queue_depth),
            directory,
            issuer,
            settings,
        }
    }

    pub fn settings(&self) -> &LobbySettings {
        &self.settings
    }

    fn meeting(&self, meeting_code: &str) -> Result<MeetingRecord, LobbyError> {
        self.directory
            .get(meeting_code)
            .ok_or_else(|| LobbyError::MeetingNotFound(meeting_code.to_string()))
    }

    /// Check that `actor` owns `meeting_code`.
    pub fn authorize(&self, meeting_code: &str, actor: &str) -> Result<MeetingRecord, LobbyError> {
        let meeting = self.meeting(meeting_code)?;
        if !meeting.is_owner(actor) {
            return Err(LobbyError::NotOwner);
        }
        Ok(meeting)
    }

    /// A request of `meeting_code`. Requests of other meetings are reported as
    /// not found.
    fn request_in(&self, meeting_code: &str, request_id: &str) -> Result<LobbyRequest, LobbyError> {
        self.store
            .get(request_id)
            .filter(|r| r.meeting_code == meeting_code)
            .ok_or_else(|| LobbyError::NotFound(request_id.to_string()))
    }

    fn grant_for(request: &LobbyRequest) -> EntryGrant {
        EntryGrant {
            room_code: request.meeting_code.clone(),
            identity: request.identity.clone(),
            display_name: request.display_name.clone(),
            role: request.role.as_str().to_string(),
            avatar_url: request.avatar_url.clone(),
        }
    }

    /// Open a lobby request, or admit the owner straight away.
    pub fn create_request(
        &self,
        meeting_code: &str,
        visitor: VisitorInfo,
    ) -> Result<CreateOutcome, LobbyError> {
        self.meeting(meeting_code)?;
        let display_name = visitor.display_name().ok_or(LobbyError::NameRequired)?;

        let mut hub = self.channel.lock_hub(meeting_code);
        // The meeting may have been deleted while we waited for the lock.
        let meeting = match self.meeting(meeting_code) {
            Ok(meeting) => meeting,
            Err(e) => {
                self.retire_hub_if_unused(&mut hub);
                return Err(e);
            }
        };

        let is_owner = visitor
            .user_id
            .as_deref()
            .is_some_and(|user_id| meeting.is_owner(user_id));
        let (role, identity) = match (&visitor.user_id, is_owner) {
            (Some(user_id), true) => (Role::Admin, format!("user_{user_id}")),
            (Some(user_id), false) => (Role::User, format!("user_{user_id}")),
            (None, _) => {
                let suffix = Uuid::new_v4().simple().to_string();
                (Role::Guest, format!("guest_{}", &suffix[..12]))
            }
        };

        let now = Utc::now();
        let mut request = LobbyRequest {
            id: Uuid::new_v4().to_string(),
            meeting_code: meeting_code.to_string(),
            display_name,
            avatar_url: visitor.avatar_url.clone(),
            role,
            identity,
            visitor_key: visitor.visitor_key(),
            state: RequestState::Pending,
            created_at: now,
            resolved_at: None,
            credentials: None,
        };

        if is_owner {
            let credentials = match self.issuer.issue(&Self::grant_for(&request)) {
                Ok(credentials) => credentials,
                Err(e) => {
                    self.retire_hub_if_unused(&mut hub);
                    return Err(LobbyError::TokenIssuanceFailed(e.to_string()));
                }
            };
            request.state = RequestState::Approved;
            request.resolved_at = Some(now);
            request.credentials = Some(credentials);
            self.store.insert(request.clone());
            info!(meeting = %meeting_code, request_id = %request.id, "Owner auto-approved");
            return Ok(CreateOutcome::AutoApproved(request));
        }

        if let Some(key) = request.visitor_key.as_deref() {
            if let Some(existing) = self.store.find_pending(meeting_code, key) {
                debug!(meeting = %meeting_code, request_id = %existing.id, "Duplicate pending request refused");
                return Err(LobbyError::DuplicatePending {
                    request_id: existing.id,
                });
            }
        }
        self.store.insert(request.clone());
        hub.broadcast(AdminServerMessage::NewRequest {
            request: request.to_entry(),
        });
        info!(
            meeting = %meeting_code,
            request_id = %request.id,
            role = request.role.as_str(),
            "Visitor entered the lobby"
        );
        Ok(CreateOutcome::Pending(request))
    }

    /// Approve or reject a pending request on behalf of the meeting owner.
    ///
    /// A request that is no longer pending yields `Decision::AlreadyResolved`.
    /// Approval mints the entry token before the request leaves `Pending`, so
    /// a failed issuance leaves the request pending and broadcasts nothing.
    pub fn respond(
        &self,
        meeting_code: &str,
        request_id: &str,
        action: LobbyAction,
        actor: &str,
    ) -> Result<Decision, LobbyError> {
        self.authorize(meeting_code, actor)?;

        let mut hub = self
            .channel
            .lock_existing_hub(meeting_code)
            .ok_or_else(|| LobbyError::NotFound(request_id.to_string()))?;
        let current = self.request_in(meeting_code, request_id)?;
        if current.state.is_terminal() {
            debug!(request_id, state = %current.state, "Decision on resolved request ignored");
            return Ok(Decision::AlreadyResolved(current));
        }

        let now = Utc::now();
        let transition = match action {
            LobbyAction::Approve => {
                let credentials = self.issuer.issue(&Self::grant_for(&current)).map_err(|e| {
                    warn!(request_id, "Approval not applied, token issuance failed: {e}");
                    LobbyError::TokenIssuanceFailed(e.to_string())
                })?;
                self.store.approve(request_id, credentials, now)
            }
            LobbyAction::Reject => self.store.transition(request_id, action.target_state(), now),
        };
        let request = match transition.ok_or_else(|| LobbyError::NotFound(request_id.to_string()))? {
            Transition::Applied(request) => request,
            Transition::AlreadyResolved(request) => return Ok(Decision::AlreadyResolved(request)),
        };

        hub.broadcast(AdminServerMessage::RequestResolved {
            request_id: request_id.to_string(),
        });
        drop(hub);

        if let Some(msg) = Self::resolution_message(&request) {
            self.channel.deliver(request_id, msg);
        }
        info!(meeting = %meeting_code, request_id, actor, state = %request.state, "Lobby request resolved");
        Ok(Decision::Applied(request))
    }

    /// Withdraw a pending request. Resolved requests are left as they are.
    pub fn cancel(&self, request_id: &str, actor: &str) -> Result<Decision, LobbyError> {
        let decision = self.withdraw(request_id, RequestState::Cancelled, Utc::now())?;
        if decision.applied() {
            info!(request_id, actor, "Lobby request cancelled");
        }
        Ok(decision)
    }

    /// Expire a pending request regardless of its age.
    pub fn expire(&self, request_id: &str) -> Result<Decision, LobbyError> {
        self.withdraw(request_id, RequestState::Expired, Utc::now())
    }

    fn withdraw(
        &self,
        request_id: &str,
        to: RequestState,
        at: DateTime<Utc>,
    ) -> Result<Decision, LobbyError> {
        let meeting_code = self
            .store
            .get(request_id)
            .map(|r| r.meeting_code)
            .ok_or_else(|| LobbyError::NotFound(request_id.to_string()))?;

        // Requests only exist while their meeting's hub does.
        let mut hub = self
            .channel
            .lock_existing_hub(&meeting_code)
            .ok_or_else(|| LobbyError::NotFound(request_id.to_string()))?;
        let request = match self
            .store
            .transition(request_id, to, at)
            .ok_or_else(|| LobbyError::NotFound(request_id.to_string()))?
        {
            Transition::Applied(request) => request,
            Transition::AlreadyResolved(request) => return Ok(Decision::AlreadyResolved(request)),
        };
        hub.broadcast(AdminServerMessage::VisitorCancelled {
            request_id: request_id.to_string(),
        });
        drop(hub);

        if let Some(msg) = Self::resolution_message(&request) {
            self.channel.deliver(request_id, msg);
        }
        Ok(Decision::Applied(request))
    }

    /// Pending requests of a meeting, oldest first.
    pub fn list_pending(&self, meeting_code: &str) -> Vec<LobbyRequest> {
        self.store.list_pending(meeting_code)
    }

    /// Approve every pending request. Each approval stands on its own; one
    /// failure does not undo the others.
    pub fn admit_all(
        &self,
        meeting_code: &str,
        actor: &str,
    ) -> Result<Vec<(String, Result<Decision, LobbyError>)>, LobbyError> {
        self.authorize(meeting_code, actor)?;
        let results = self
            .store
            .list_pending(meeting_code)
            .into_iter()
            .map(|r| {
                let outcome = self.respond(meeting_code, &r.id, LobbyAction::Approve, actor);
                (r.id, outcome)
            })
            .collect::<Vec<_>>();
        info!(meeting = %meeting_code, actor, count = results.len(), "Admit all");
        Ok(results)
    }

    pub fn status(&self, request_id: &str) -> Result<LobbyRequest, LobbyError> {
        self.store
            .get(request_id)
            .ok_or_else(|| LobbyError::NotFound(request_id.to_string()))
    }

    /// Subscribe an admin. The `pending_requests` snapshot is queued first,
    /// atomically with respect to new requests.
    ///
    /// Callers check the meeting beforehand.
    pub fn subscribe_admin(&self, meeting_code: &str) -> AdminSubscription {
        let mut hub = self.channel.lock_hub(meeting_code);
        let snapshot = self
            .store
            .list_pending(meeting_code)
            .iter()
            .map(LobbyRequest::to_entry)
            .collect();
        self.channel.subscribe(&mut hub, snapshot)
    }

    pub fn unsubscribe_admin(&self, meeting_code: &str, subscriber: u64) {
        if let Some(mut hub) = self.channel.lock_existing_hub(meeting_code) {
            hub.unsubscribe(subscriber);
            self.retire_hub_if_unused(&mut hub);
        }
    }

    /// Attach a visitor connection to its request.
    pub fn bind_visitor(
        &self,
        request_id: &str,
        meeting_code: &str,
    ) -> Result<VisitorBinding, LobbyError> {
        let _hub = self
            .channel
            .lock_existing_hub(meeting_code)
            .ok_or_else(|| LobbyError::NotFound(request_id.to_string()))?;
        let request = self.request_in(meeting_code, request_id)?;
        if let Some(msg) = Self::resolution_message(&request) {
            return Ok(VisitorBinding::Resolved(msg));
        }
        let mailbox = self.channel.bind_visitor(request_id);
        Ok(VisitorBinding::Waiting {
            binding: mailbox.binding,
            resolution: mailbox.resolution,
        })
    }

    pub fn release_visitor(&self, request_id: &str, binding: u64) {
        self.channel.release_visitor(request_id, binding);
    }

    /// The frame a visitor receives for a terminal request.
    pub fn resolution_message(request: &LobbyRequest) -> Option<VisitorServerMessage> {
        match request.state {
            RequestState::Pending => None,
            RequestState::Approved => request
                .credentials
                .clone()
                .map(VisitorServerMessage::Approved),
            RequestState::Rejected => Some(VisitorServerMessage::Rejected),
            RequestState::Cancelled => Some(VisitorServerMessage::Cancelled),
            RequestState::Expired => Some(VisitorServerMessage::Expired),
        }
    }

    /// Drop everything the lobby holds for a meeting. Waiting visitors are
    /// told the meeting is gone; admin connections are closed.
    ///
    /// Run this after the meeting has left the directory, so no new request
    /// can slip in behind the purge.
    pub fn teardown(&self, meeting_code: &str) -> usize {
        let Some(mut hub) = self.channel.lock_existing_hub(meeting_code) else {
            return 0;
        };
        let pending: Vec<String> = self
            .store
            .list_pending(meeting_code)
            .into_iter()
            .map(|r| r.id)
            .collect();
        let purged = self.store.purge_meeting(meeting_code);
        self.channel.retire_hub(&mut hub);
        drop(hub);

        let gone = lobby_types::APIError::meeting_not_found(meeting_code);
        for id in &pending {
            self.channel.deliver(id, VisitorServerMessage::error(&gone));
        }
        self.channel.release_visitors(&purged);
        info!(meeting = %meeting_code, purged = purged.len(), "Lobby torn down");
        purged.len()
    }

    /// One reaper pass: expire pending requests older than the request TTL
    /// and purge resolved requests past the retention window.
    pub fn sweep(&self, meeting_code: &str, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        if let Some(stale_before) = cutoff(now, self.settings.request_ttl) {
            for id in self.store.pending_created_before(meeting_code, stale_before) {
                if let Ok(Decision::Applied(_)) = self.withdraw(&id, RequestState::Expired, now) {
                    report.expired.push(id);
                }
            }
        }

        if let Some(resolved_before) = cutoff(now, self.settings.retention) {
            let purged = match self.channel.lock_existing_hub(meeting_code) {
                Some(_hub) => self.store.purge_resolved_before(meeting_code, resolved_before),
                None => Vec::new(),
            };
            self.channel.release_visitors(&purged);
            report.purged = purged.len();
        }

        report.remaining = self.store.len_for(meeting_code);
        if !report.expired.is_empty() || report.purged > 0 {
            debug!(
                meeting = %meeting_code,
                expired = report.expired.len(),
                purged = report.purged,
                remaining = report.remaining,
                "Lobby sweep"
            );
        }
        report
    }

    /// Run `retire` under the meeting lock if the meeting holds no requests.
    /// The meeting's hub is dropped too when no admin is subscribed.
    ///
    /// Requests are only inserted under the same lock, so a caller that
    /// registers interest after creating a request cannot miss it.
    pub fn retire_if_idle(&self, meeting_code: &str, retire: impl FnOnce()) -> bool {
        let mut hub = self.channel.lock_hub(meeting_code);
        if self.store.len_for(meeting_code) > 0 {
            return false;
        }
        retire();
        self.retire_hub_if_unused(&mut hub);
        true
    }

    /// Retire a locked hub that holds neither admins nor requests.
    fn retire_hub_if_unused(&self, hub: &mut MeetingHub) -> bool {
        if hub.subscriber_count() > 0 || self.store.len_for(hub.meeting_code()) > 0 {
            return false;
        }
        self.channel.retire_hub(hub);
        true
    }
}
