//! Simulated process-wide transport.
//!
//! One `SimTransport` stands for the single persistent connection a process
//! holds. Every widget in the process subscribes to it, and every subscriber
//! sees every frame the process receives; filtering by session is the
//! widget's job.
//!
//! Real-time emits are queued in an outbox and only reach the backend when
//! the test calls [`SimTransport::deliver_pending`] (or immediately with
//! [`SimTransport::with_auto_delivery`]). Delivery broadcasts, for each
//! queued message whose room the process has joined:
//!
//! ```text
//! typing(true) -> new_message(assistant reply) -> typing(false)
//! ```
//!
//! Dropping the connection forgets every joined room, like a real server
//! does when a socket goes away.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use studychat_app::{Subscription, Transport};
use studychat_core::{ChannelFrame, SessionId};
use tokio::sync::mpsc;

use crate::SimBackend;

struct TransportState {
    connected: bool,
    auto_deliver: bool,
    /// Joined rooms with their join count.
    rooms: HashMap<SessionId, usize>,
    subscribers: BTreeMap<u64, mpsc::UnboundedSender<ChannelFrame>>,
    next_subscriber: u64,
    outbox: VecDeque<(SessionId, String)>,
    sent: Vec<(SessionId, String)>,
}

impl TransportState {
    fn broadcast(&mut self, frame: &ChannelFrame) -> usize {
        self.subscribers.retain(|_, tx| tx.send(frame.clone()).is_ok());
        self.subscribers.len()
    }

    fn in_room(&self, session_id: &SessionId) -> bool {
        self.rooms.get(session_id).is_some_and(|count| *count > 0)
    }
}

/// Simulated transport. Clones share the connection.
#[derive(Clone)]
pub struct SimTransport {
    state: Arc<Mutex<TransportState>>,
    backend: SimBackend,
}

impl std::fmt::Debug for SimTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SimTransport")
            .field("connected", &state.connected)
            .field("rooms", &state.rooms)
            .field("subscribers", &state.subscribers.len())
            .field("outbox", &state.outbox.len())
            .finish_non_exhaustive()
    }
}

impl SimTransport {
    /// Connected transport forwarding to `backend`.
    pub fn new(backend: SimBackend) -> Self {
        let state = TransportState {
            connected: true,
            auto_deliver: false,
            rooms: HashMap::new(),
            subscribers: BTreeMap::new(),
            next_subscriber: 1,
            outbox: VecDeque::new(),
            sent: Vec::new(),
        };
        Self { state: Arc::new(Mutex::new(state)), backend }
    }

    /// Start disconnected.
    #[must_use]
    pub fn disconnected(self) -> Self {
        self.set_connected(false);
        self
    }

    /// Deliver every emit as soon as it is sent.
    #[must_use]
    pub fn with_auto_delivery(self) -> Self {
        self.lock().auto_deliver = true;
        self
    }

    /// Bring the connection up or down. Going down forgets joined rooms.
    pub fn set_connected(&self, connected: bool) {
        let mut state = self.lock();
        if state.connected == connected {
            return;
        }
        state.connected = connected;
        if !connected {
            state.rooms.clear();
        }
        tracing::debug!(connected, "simulated connection changed");
    }

    /// Process queued emits. Returns how many were processed.
    pub fn deliver_pending(&self) -> usize {
        let mut state = self.lock();
        let mut processed = 0;
        while let Some((session_id, text)) = state.outbox.pop_front() {
            self.process(&mut state, &session_id, &text);
            processed += 1;
        }
        processed
    }

    fn process(&self, state: &mut TransportState, session_id: &SessionId, text: &str) {
        let Some(reply) = self.backend.realtime(session_id, text) else {
            return;
        };
        if !state.connected || !state.in_room(session_id) {
            tracing::debug!(%session_id, "room not joined, reply not broadcast");
            return;
        }

        state.broadcast(&ChannelFrame::typing(Some(session_id), true));
        state.broadcast(&ChannelFrame::new_message(session_id, &reply));
        state.broadcast(&ChannelFrame::typing(Some(session_id), false));
    }

    /// Broadcast a raw frame to every subscriber, ignoring rooms.
    ///
    /// Returns the number of subscribers reached.
    pub fn inject(&self, frame: ChannelFrame) -> usize {
        self.lock().broadcast(&frame)
    }

    /// True if the process has joined `session_id`'s room.
    pub fn is_joined(&self, session_id: &SessionId) -> bool {
        self.lock().in_room(session_id)
    }

    /// Number of registered listeners.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Emits waiting for delivery.
    pub fn outbox_len(&self) -> usize {
        self.lock().outbox.len()
    }

    /// Every accepted emit, in order.
    pub fn sent(&self) -> Vec<(SessionId, String)> {
        self.lock().sent.clone()
    }

    /// The backend emits are forwarded to.
    pub fn backend(&self) -> &SimBackend {
        &self.backend
    }

    fn lock(&self) -> MutexGuard<'_, TransportState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for SimTransport {
    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn join_room(&self, session_id: &SessionId) {
        let mut state = self.lock();
        if !state.connected {
            tracing::warn!(%session_id, "join while disconnected ignored");
            return;
        }
        *state.rooms.entry(session_id.clone()).or_default() += 1;
    }

    fn leave_room(&self, session_id: &SessionId) {
        let mut state = self.lock();
        if let Some(count) = state.rooms.get_mut(session_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.rooms.remove(session_id);
            }
        }
    }

    fn send(&self, session_id: &SessionId, text: &str) {
        let mut state = self.lock();
        if !state.connected {
            tracing::warn!(%session_id, "emit while disconnected lost");
            return;
        }

        state.sent.push((session_id.clone(), text.to_string()));
        if state.auto_deliver {
            self.process(&mut state, session_id, text);
        } else {
            state.outbox.push_back((session_id.clone(), text.to_string()));
        }
    }

    fn subscribe(&self) -> Subscription {
        let mut state = self.lock();
        let id = state.next_subscriber;
        state.next_subscriber += 1;

        let (tx, rx) = mpsc::unbounded_channel();
        state.subscribers.insert(id, tx);
        Subscription::new(id, rx)
    }

    fn unsubscribe(&self, subscription: Subscription) {
        self.lock().subscribers.remove(&subscription.id());
    }
}

#[cfg(test)]
mod tests {
    use studychat_core::{ChannelEvent, ChatContext, Environment};

    use super::*;
    use crate::SimEnv;

    fn setup() -> (SimTransport, SessionId) {
        let backend = SimBackend::new(SimEnv::new());
        let session =
            backend.create_or_resume("ada", "General AI Chat", &ChatContext::general()).unwrap();
        (SimTransport::new(backend), session.id)
    }

    fn events(subscription: &mut Subscription) -> Vec<ChannelEvent> {
        let now = SimEnv::new().now();
        std::iter::from_fn(|| subscription.try_recv())
            .map(|frame| ChannelEvent::decode(&frame, now).unwrap())
            .collect()
    }

    #[test]
    fn delivery_brackets_reply_with_typing() {
        let (transport, id) = setup();
        let mut subscription = transport.subscribe();
        transport.join_room(&id);

        transport.send(&id, "hi");
        assert_eq!(transport.deliver_pending(), 1);

        let events = events(&mut subscription);
        assert!(matches!(events.as_slice(), [
            ChannelEvent::Typing { is_typing: true, .. },
            ChannelEvent::NewMessage { message, .. },
            ChannelEvent::Typing { is_typing: false, .. }
        ] if message.content == "Re: hi"));
    }

    #[test]
    fn reply_not_broadcast_without_room() {
        let (transport, id) = setup();
        let mut subscription = transport.subscribe();

        transport.send(&id, "hi");
        transport.deliver_pending();

        assert!(events(&mut subscription).is_empty());
        assert_eq!(transport.backend().history(&id).len(), 2);
    }

    #[test]
    fn disconnect_forgets_rooms() {
        let (transport, id) = setup();
        transport.join_room(&id);
        transport.set_connected(false);
        transport.set_connected(true);

        assert!(!transport.is_joined(&id));
    }

    #[test]
    fn rooms_are_reference_counted() {
        let (transport, id) = setup();
        transport.join_room(&id);
        transport.join_room(&id);
        transport.leave_room(&id);
        assert!(transport.is_joined(&id));

        transport.leave_room(&id);
        assert!(!transport.is_joined(&id));
    }

    #[test]
    fn unsubscribe_drops_queued_frames() {
        let (transport, _) = setup();
        let subscription = transport.subscribe();
        transport.inject(ChannelFrame::typing(None, true));

        transport.unsubscribe(subscription);
        assert_eq!(transport.subscriber_count(), 0);
        assert_eq!(transport.inject(ChannelFrame::typing(None, false)), 0);
    }
}
