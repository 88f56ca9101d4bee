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

//! Event fan-out for the lobby.
//!
//! Two audiences:
//!
//! - **Admins** subscribe per meeting through a [`MeetingHub`]. Each
//!   subscriber owns a bounded queue; the hub pushes with `try_send` so a slow
//!   admin never stalls the others. A full or closed queue evicts that
//!   subscriber and its gateway closes the socket.
//! - **Visitors** get a single-slot mailbox per request id. At most one
//!   resolution is ever pushed into a slot; binding again replaces the slot.
//!
//! The hub mutex doubles as the per-meeting serialization point for the
//! admission engine: every mutation of a meeting's requests happens while
//! holding it, which keeps snapshot-then-stream atomic.
//!
//! A hub is registered while it is not retired. Retiring happens under the
//! hub's own lock, so a caller that wins the lock of a retired hub simply
//! looks the meeting up again.

use std::ops::DerefMut;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use lobby_types::lobby::LobbyRequestEntry;
use lobby_types::messages::{AdminServerMessage, VisitorServerMessage};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

struct AdminSubscriber {
    id: u64,
    tx: mpsc::Sender<AdminServerMessage>,
}

/// Admin subscribers of one meeting.
pub struct MeetingHub {
    meeting_code: String,
    admins: Vec<AdminSubscriber>,
    retired: bool,
}

impl MeetingHub {
    fn new(meeting_code: &str) -> Self {
        Self {
            meeting_code: meeting_code.to_string(),
            admins: Vec::new(),
            retired: false,
        }
    }

    pub fn meeting_code(&self) -> &str {
        &self.meeting_code
    }

    /// Push an event to every subscriber, evicting the ones that cannot keep up.
    pub fn broadcast(&mut self, msg: AdminServerMessage) {
        let meeting_code = &self.meeting_code;
        self.admins.retain(|admin| match admin.tx.try_send(msg.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    meeting = %meeting_code,
                    subscriber = admin.id,
                    "Admin queue full, evicting slow subscriber"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(meeting = %meeting_code, subscriber = admin.id, "Dropping closed admin subscriber");
                false
            }
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.admins.len()
    }

    pub fn unsubscribe(&mut self, subscriber: u64) {
        self.admins.retain(|admin| admin.id != subscriber);
        info!(
            meeting = %self.meeting_code,
            subscriber,
            remaining = self.admins.len(),
            "Admin unsubscribed"
        );
    }
}

/// A live admin subscription. The first queued message is always the
/// `pending_requests` snapshot.
pub struct AdminSubscription {
    pub id: u64,
    pub meeting_code: String,
    pub events: mpsc::Receiver<AdminServerMessage>,
}

struct VisitorSlot {
    binding: u64,
    tx: oneshot::Sender<VisitorServerMessage>,
}

/// A bound visitor mailbox.
pub struct VisitorMailbox {
    pub binding: u64,
    pub resolution: oneshot::Receiver<VisitorServerMessage>,
}

pub struct EventChannel {
    hubs: DashMap<String, Arc<Mutex<MeetingHub>>>,
    visitors: DashMap<String, VisitorSlot>,
    admin_queue_depth: usize,
    next_id: AtomicU64,
}

impl EventChannel {
    pub fn new(admin_queue_depth: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            visitors: DashMap::new(),
            admin_queue_depth: admin_queue_depth.max(1),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Lock the hub of a meeting, creating it on first use.
    ///
    /// Callers validate the meeting first; every hub created here must be
    /// retired again once it holds neither admins nor requests.
    pub fn lock_hub(&self, meeting_code: &str) -> impl DerefMut<Target = MeetingHub> {
        loop {
            let hub = self
                .hubs
                .entry(meeting_code.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(MeetingHub::new(meeting_code))))
                .value()
                .clone();
            let guard = hub.lock_arc();
            if !guard.retired {
                return guard;
            }
        }
    }

    /// Lock the hub of a meeting if one is registered.
    pub fn lock_existing_hub(&self, meeting_code: &str) -> Option<impl DerefMut<Target = MeetingHub>> {
        loop {
            let hub = self.hubs.get(meeting_code)?.value().clone();
            let guard = hub.lock_arc();
            if !guard.retired {
                return Some(guard);
            }
        }
    }

    /// Unregister a locked hub. Remaining admin queues are dropped, which
    /// ends their gateway sessions.
    pub fn retire_hub(&self, hub: &mut MeetingHub) {
        hub.retired = true;
        hub.admins.clear();
        self.hubs.remove(&hub.meeting_code);
        debug!(meeting = %hub.meeting_code, "Meeting hub retired");
    }

    #[cfg(test)]
    pub(crate) fn hub_count(&self) -> usize {
        self.hubs.len()
    }

    /// Register an admin. Must be called with the meeting's hub locked so the
    /// snapshot and the live stream are contiguous.
    pub fn subscribe(
        &self,
        hub: &mut MeetingHub,
        snapshot: Vec<LobbyRequestEntry>,
    ) -> AdminSubscription {
        let id = self.next_id();
        let (tx, events) = mpsc::channel(self.admin_queue_depth + 1);
        // Fresh queue with spare capacity: the snapshot always fits.
        let _ = tx.try_send(AdminServerMessage::PendingRequests { requests: snapshot });
        hub.admins.push(AdminSubscriber { id, tx });
        info!(
            meeting = %hub.meeting_code,
            subscriber = id,
            total = hub.admins.len(),
            "Admin subscribed"
        );
        AdminSubscription {
            id,
            meeting_code: hub.meeting_code.clone(),
            events,
        }
    }

    /// Install the visitor mailbox for a request, replacing any previous one.
    /// The replaced connection observes its receiver closing.
    pub fn bind_visitor(&self, request_id: &str) -> VisitorMailbox {
        let binding = self.next_id();
        let (tx, resolution) = oneshot::channel();
        if self
            .visitors
            .insert(request_id.to_string(), VisitorSlot { binding, tx })
            .is_some()
        {
            debug!(request_id, "Visitor rebound, previous connection superseded");
        }
        VisitorMailbox {
            binding,
            resolution,
        }
    }

    /// Release a mailbox if it still belongs to `binding`.
    pub fn release_visitor(&self, request_id: &str, binding: u64) {
        self.visitors
            .remove_if(request_id, |_, slot| slot.binding == binding);
    }

    /// Deliver a resolution to the bound visitor, if any.
    ///
    /// Returns `false` when nobody is bound; the stored request state is then
    /// what a reconnecting visitor replays.
    pub fn deliver(&self, request_id: &str, msg: VisitorServerMessage) -> bool {
        match self.visitors.remove(request_id) {
            Some((_, slot)) => slot.tx.send(msg).is_ok(),
            None => {
                debug!(request_id, "No visitor bound, resolution kept for replay");
                false
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn is_visitor_bound(&self, request_id: &str) -> bool {
        self.visitors.contains_key(request_id)
    }

    pub fn release_visitors(&self, request_ids: &[String]) {
        for id in request_ids {
            self.visitors.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> LobbyRequestEntry {
        LobbyRequestEntry {
            request_id: id.to_string(),
            name: "Alice".to_string(),
            avatar_url: None,
            role: "guest".to_string(),
            created_at: 0,
        }
    }

    #[test]
    fn snapshot_precedes_live_events() {
        let channel = EventChannel::new(8);
        let mut sub = {
            let mut hub = channel.lock_hub("m");
            let sub = channel.subscribe(&mut hub, vec![entry("r1")]);
            hub.broadcast(AdminServerMessage::NewRequest { request: entry("r2") });
            sub
        };

        assert_eq!(
            sub.events.try_recv().unwrap(),
            AdminServerMessage::PendingRequests {
                requests: vec![entry("r1")]
            }
        );
        assert_eq!(
            sub.events.try_recv().unwrap(),
            AdminServerMessage::NewRequest { request: entry("r2") }
        );
    }

    #[test]
    fn full_queue_evicts_only_the_slow_admin() {
        let channel = EventChannel::new(1);
        let mut hub = channel.lock_hub("m");
        let mut fast = channel.subscribe(&mut hub, vec![]);
        let _slow = channel.subscribe(&mut hub, vec![]);

        // Capacity is depth + 1 and the snapshot used one slot.
        hub.broadcast(AdminServerMessage::RequestResolved {
            request_id: "a".to_string(),
        });
        assert_eq!(hub.subscriber_count(), 2);

        // Drain the fast admin; the slow one still holds two frames.
        let _ = fast.events.try_recv();
        let _ = fast.events.try_recv();
        hub.broadcast(AdminServerMessage::RequestResolved {
            request_id: "b".to_string(),
        });
        assert_eq!(hub.subscriber_count(), 1);
        assert!(matches!(
            fast.events.try_recv(),
            Ok(AdminServerMessage::RequestResolved { .. })
        ));
    }

    #[test]
    fn dropped_receiver_is_pruned_on_next_broadcast() {
        let channel = EventChannel::new(4);
        let mut hub = channel.lock_hub("m");
        drop(channel.subscribe(&mut hub, vec![]));
        hub.broadcast(AdminServerMessage::VisitorCancelled {
            request_id: "r".to_string(),
        });
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribe_removes_the_admin() {
        let channel = EventChannel::new(4);
        let mut hub = channel.lock_hub("m");
        let sub = channel.subscribe(&mut hub, vec![]);
        hub.unsubscribe(sub.id);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn visitor_delivery_is_single_shot() {
        let channel = EventChannel::new(4);
        let mut mailbox = channel.bind_visitor("r1");

        assert!(channel.deliver("r1", VisitorServerMessage::Rejected));
        assert!(!channel.deliver("r1", VisitorServerMessage::Rejected));
        assert_eq!(mailbox.resolution.try_recv().unwrap(), VisitorServerMessage::Rejected);
    }

    #[test]
    fn rebinding_supersedes_the_previous_mailbox() {
        let channel = EventChannel::new(4);
        let mut first = channel.bind_visitor("r1");
        let mut second = channel.bind_visitor("r1");

        assert!(matches!(
            first.resolution.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));

        // The stale connection must not release the new binding.
        channel.release_visitor("r1", first.binding);
        assert!(channel.is_visitor_bound("r1"));

        channel.deliver("r1", VisitorServerMessage::Cancelled);
        assert_eq!(second.resolution.try_recv().unwrap(), VisitorServerMessage::Cancelled);
    }

    #[test]
    fn retiring_a_hub_drops_admin_queues() {
        let channel = EventChannel::new(4);
        let mut sub = {
            let mut hub = channel.lock_hub("m");
            let sub = channel.subscribe(&mut hub, vec![]);
            channel.retire_hub(&mut hub);
            sub
        };
        let mut mailbox = channel.bind_visitor("r1");
        channel.release_visitors(&["r1".to_string()]);

        assert!(sub.events.try_recv().is_ok()); // snapshot
        assert!(matches!(
            sub.events.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
        assert!(mailbox.resolution.try_recv().is_err());
        assert_eq!(channel.hub_count(), 0);
    }

    #[test]
    fn retired_hub_is_replaced_on_next_lock() {
        let channel = EventChannel::new(4);
        {
            let mut hub = channel.lock_hub("m");
            channel.retire_hub(&mut hub);
        }
        assert!(channel.lock_existing_hub("m").is_none());

        let hub = channel.lock_hub("m");
        assert_eq!(hub.meeting_code(), "m");
        assert_eq!(hub.subscriber_count(), 0);
        drop(hub);
        assert_eq!(channel.hub_count(), 1);
    }

    #[test]
    fn waiter_on_a_retired_hub_gets_the_live_one() {
        let channel = Arc::new(EventChannel::new(4));
        let mut hub = channel.lock_hub("m");

        let waiter = {
            let channel = channel.clone();
            std::thread::spawn(move || {
                let mut hub = channel.lock_hub("m");
                channel.subscribe(&mut hub, vec![]).id
            })
        };
        // Give the waiter time to block on the old hub.
        std::thread::sleep(std::time::Duration::from_millis(50));
        channel.retire_hub(&mut hub);
        drop(hub);
        waiter.join().unwrap();

        let hub = channel.lock_existing_hub("m").expect("live hub");
        assert_eq!(hub.subscriber_count(), 1);
    }
}
