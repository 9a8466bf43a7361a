//! In-memory chat backend for simulation.
//!
//! `SimBackend` plays the server: it persists sessions and their history,
//! answers user messages through a pluggable responder, and can be told to
//! fail upcoming calls. Each simulated user reaches it through a [`SimStore`]
//! (the request/response path); [`crate::SimTransport`] forwards real-time
//! emits to it.
//!
//! Sessions are keyed by `(user, context type, context id)`, which is what
//! makes create-or-resume idempotent per user and context.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use studychat_app::SessionStore;
use studychat_core::{
    ChatContext, ChatSession, ContextType, Environment, FallbackReply, Message, SessionId,
    StoreError,
};

/// Produces the assistant reply for a user message.
pub type Responder = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Reads the current time for message timestamps.
type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Session key: one session per user and context.
type SessionKey = (String, ContextType, Option<String>);

/// Call counters for assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// `create_or_resume_session` calls, including failed ones.
    pub create_calls: u64,
    /// Sessions actually created (not resumed).
    pub sessions_created: u64,
    /// Fallback sends, including failed ones.
    pub fallback_calls: u64,
    /// Real-time messages processed.
    pub realtime_messages: u64,
}

struct BackendState {
    sessions: HashMap<SessionId, ChatSession>,
    index: HashMap<SessionKey, SessionId>,
    next_session: u64,
    create_faults: VecDeque<StoreError>,
    fallback_faults: VecDeque<StoreError>,
    stats: BackendStats,
}

/// Shared in-memory backend. Clones share state.
#[derive(Clone)]
pub struct SimBackend {
    state: Arc<Mutex<BackendState>>,
    responder: Responder,
    clock: Clock,
}

impl std::fmt::Debug for SimBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimBackend").field("stats", &self.stats()).finish_non_exhaustive()
    }
}

impl SimBackend {
    /// Backend that answers every message with `"Re: <text>"`.
    ///
    /// Replies are stamped with `env`'s clock: a [`crate::SimEnv`] in tests,
    /// the system clock in the demo binary.
    pub fn new<E: Environment>(env: E) -> Self {
        Self::with_responder(env, Arc::new(|text: &str| format!("Re: {text}")))
    }

    /// Backend with a custom responder.
    pub fn with_responder<E: Environment>(env: E, responder: Responder) -> Self {
        let state = BackendState {
            sessions: HashMap::new(),
            index: HashMap::new(),
            next_session: 1,
            create_faults: VecDeque::new(),
            fallback_faults: VecDeque::new(),
            stats: BackendStats::default(),
        };
        let clock: Clock = Arc::new(move || env.now());
        Self { state: Arc::new(Mutex::new(state)), responder, clock }
    }

    /// Store handle acting on behalf of `user`.
    pub fn store_for(&self, user: impl Into<String>) -> SimStore {
        SimStore { backend: self.clone(), user: user.into() }
    }

    /// Fail the next create-or-resume call with `error`. Faults queue up.
    pub fn fail_next_create(&self, error: StoreError) {
        self.lock().create_faults.push_back(error);
    }

    /// Fail the next fallback send with `error`. Faults queue up.
    pub fn fail_next_fallback(&self, error: StoreError) {
        self.lock().fallback_faults.push_back(error);
    }

    /// Create or resume the session for `user` in `context`.
    pub fn create_or_resume(
        &self,
        user: &str,
        title: &str,
        context: &ChatContext,
    ) -> Result<ChatSession, StoreError> {
        let mut state = self.lock();
        state.stats.create_calls += 1;
        if let Some(error) = state.create_faults.pop_front() {
            return Err(error);
        }

        let key = (user.to_string(), context.context_type, context.context_id.clone());
        if let Some(existing) = state.index.get(&key).and_then(|id| state.sessions.get(id)) {
            tracing::debug!(session_id = %existing.id, "resuming session");
            return Ok(existing.clone());
        }

        let id = SessionId::new(format!("session-{}", state.next_session));
        state.next_session += 1;
        state.stats.sessions_created += 1;
        tracing::debug!(session_id = %id, title, "creating session");

        let session = ChatSession {
            id: id.clone(),
            context_type: context.context_type,
            context_id: context.context_id.clone(),
            messages: Vec::new(),
        };
        state.index.insert(key, id.clone());
        state.sessions.insert(id, session.clone());
        Ok(session)
    }

    /// Persist a fallback send and return the reply.
    pub fn fallback(&self, session_id: &SessionId, text: &str) -> Result<FallbackReply, StoreError> {
        let mut state = self.lock();
        state.stats.fallback_calls += 1;
        if let Some(error) = state.fallback_faults.pop_front() {
            return Err(error);
        }

        let reply = self.exchange(&mut state, session_id, text)?;
        Ok(FallbackReply {
            content: reply.content,
            metadata: reply.metadata,
            timestamp: Some(reply.timestamp),
        })
    }

    /// Persist a real-time message and return the assistant reply to
    /// broadcast. `None` for an unknown session.
    pub fn realtime(&self, session_id: &SessionId, text: &str) -> Option<Message> {
        let mut state = self.lock();
        state.stats.realtime_messages += 1;
        match self.exchange(&mut state, session_id, text) {
            Ok(reply) => Some(reply),
            Err(error) => {
                tracing::warn!(%session_id, %error, "dropping real-time message");
                None
            },
        }
    }

    fn exchange(
        &self,
        state: &mut BackendState,
        session_id: &SessionId,
        text: &str,
    ) -> Result<Message, StoreError> {
        let session = state.sessions.get_mut(session_id).ok_or_else(|| StoreError::Rejected {
            status: 404,
            message: format!("unknown session {session_id}"),
        })?;

        let now = (self.clock)();
        let reply = Message::assistant((self.responder)(text), now, None);
        session.messages.push(Message::user(text, now));
        session.messages.push(reply.clone());
        Ok(reply)
    }

    /// Persisted history of a session.
    pub fn history(&self, session_id: &SessionId) -> Vec<Message> {
        self.lock().sessions.get(session_id).map(|s| s.messages.clone()).unwrap_or_default()
    }

    /// Number of distinct sessions.
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Call counters.
    pub fn stats(&self) -> BackendStats {
        self.lock().stats
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Request/response store for one user.
#[derive(Debug, Clone)]
pub struct SimStore {
    backend: SimBackend,
    user: String,
}

impl SimStore {
    /// The backend behind this store.
    pub fn backend(&self) -> &SimBackend {
        &self.backend
    }
}

impl SessionStore for SimStore {
    fn create_or_resume_session(
        &self,
        title: &str,
        context: &ChatContext,
    ) -> impl Future<Output = Result<ChatSession, StoreError>> + Send {
        std::future::ready(self.backend.create_or_resume(&self.user, title, context))
    }

    fn send_message_fallback(
        &self,
        session_id: &SessionId,
        text: &str,
    ) -> impl Future<Output = Result<FallbackReply, StoreError>> + Send {
        std::future::ready(self.backend.fallback(session_id, text))
    }
}
