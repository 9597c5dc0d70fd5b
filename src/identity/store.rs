//! Session store: the single holder of one client's resolved session state.
//!
//! All writes go through the store's own entry points. Resolution attempts
//! take a ticket carrying the store generation; a completion whose ticket is
//! older than the current generation is discarded, so the newest attempt wins
//! regardless of completion order. Subscribers are invoked in subscription
//! order after every committed change, outside the store lock.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::session::Session;

/// Current state of a client's session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// A resolution attempt is in flight; routing decisions should defer.
    Resolving,
    /// No session: resolution finished without a match, or the client
    /// signed out.
    Anonymous,
    SignedIn(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::SignedIn(s) => Some(s),
            _ => None,
        }
    }
}

type Subscriber = Arc<dyn Fn(&SessionState) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Handle for one resolution attempt. Completing with a stale ticket is a
/// no-op; the ticket is consumed either way.
#[must_use = "a resolution attempt must be completed through its ticket"]
#[derive(Debug)]
pub struct ResolutionTicket {
    generation: u64,
}

impl ResolutionTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

struct Inner {
    state: SessionState,
    generation: u64,
    next_sub_id: u64,
    subscribers: Vec<(u64, Subscriber)>,
}

/// Explicit, injectable session-state container. One per signed-in client;
/// shared by `Arc`.
pub struct SessionStore {
    inner: Mutex<Inner>,
}

impl SessionStore {
    /// New store in the initial-load state: `Resolving` at generation 0.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: SessionState::Resolving,
                generation: 0,
                next_sub_id: 0,
                subscribers: Vec::new(),
            }),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.inner.lock().state.clone()
    }

    pub fn is_resolving(&self) -> bool {
        matches!(self.inner.lock().state, SessionState::Resolving)
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Start a resolution attempt: bumps the generation (invalidating older
    /// tickets) and enters `Resolving`.
    pub fn begin_resolution(&self) -> ResolutionTicket {
        let (subs, state, generation) = {
            let mut g = self.inner.lock();
            g.generation += 1;
            g.state = SessionState::Resolving;
            (collect_subscribers(&g), g.state.clone(), g.generation)
        };
        debug!(target: "session", generation, "resolution started");
        notify(subs, &state);
        ResolutionTicket { generation }
    }

    /// Commit a resolution outcome. Returns false when the ticket is stale
    /// (a newer attempt began, or a direct set/clear happened meanwhile);
    /// a stale commit changes nothing and notifies nobody.
    pub fn complete(&self, ticket: ResolutionTicket, session: Option<Session>) -> bool {
        let committed = {
            let mut g = self.inner.lock();
            if g.generation != ticket.generation {
                crate::jprintln!(
                    "session.store stale commit discarded: ticket_gen={} current_gen={}",
                    ticket.generation,
                    g.generation
                );
                None
            } else {
                g.state = match session {
                    Some(s) => SessionState::SignedIn(s),
                    None => SessionState::Anonymous,
                };
                Some((collect_subscribers(&g), g.state.clone()))
            }
        };
        match committed {
            Some((subs, state)) => {
                notify(subs, &state);
                true
            }
            None => {
                debug!(target: "session", generation = ticket.generation, "stale resolution discarded");
                false
            }
        }
    }

    /// Direct sign-in (invoice login path). Bumps the generation so any
    /// in-flight resolution attempt becomes stale.
    pub fn set(&self, session: Session) {
        let (subs, state) = {
            let mut g = self.inner.lock();
            g.generation += 1;
            g.state = SessionState::SignedIn(session);
            (collect_subscribers(&g), g.state.clone())
        };
        notify(subs, &state);
    }

    /// Sign-out. Bumps the generation so any in-flight resolution attempt
    /// becomes stale.
    pub fn clear(&self) {
        let (subs, state) = {
            let mut g = self.inner.lock();
            g.generation += 1;
            g.state = SessionState::Anonymous;
            (collect_subscribers(&g), g.state.clone())
        };
        notify(subs, &state);
    }

    /// Register a callback invoked after every committed state change, in
    /// subscription order.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        let mut g = self.inner.lock();
        let id = g.next_sub_id;
        g.next_sub_id += 1;
        g.subscribers.push((id, Arc::new(callback)));
        SubscriptionId(id)
    }

    /// Remove a subscriber. Returns false if the id was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut g = self.inner.lock();
        let before = g.subscribers.len();
        g.subscribers.retain(|(sid, _)| *sid != id.0);
        g.subscribers.len() != before
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_subscribers(inner: &Inner) -> Vec<Subscriber> {
    inner.subscribers.iter().map(|(_, s)| s.clone()).collect()
}

// Callbacks run outside the lock; a subscriber added mid-notification does
// not observe the in-progress notification.
fn notify(subs: Vec<Subscriber>, state: &SessionState) {
    for s in subs {
        s(state);
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
