use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use uuid::Uuid;

use super::*;
use crate::identity::{Role, Session};

fn sample_session(name: &str) -> Session {
    Session {
        id: Uuid::new_v4(),
        email: format!("{}@juron.net.id", name),
        full_name: name.to_string(),
        role: Role::Admin,
        invoice_number: None,
    }
}

#[test]
fn starts_resolving_at_generation_zero() {
    let store = SessionStore::new();
    assert_eq!(store.snapshot(), SessionState::Resolving);
    assert!(store.is_resolving());
    assert_eq!(store.generation(), 0);
}

#[test]
fn complete_commits_matching_ticket() {
    let store = SessionStore::new();
    let ticket = store.begin_resolution();
    assert!(store.complete(ticket, Some(sample_session("agus"))));
    match store.snapshot() {
        SessionState::SignedIn(s) => assert_eq!(s.full_name, "agus"),
        other => panic!("expected signed-in state, got {:?}", other),
    }
}

#[test]
fn complete_none_commits_anonymous() {
    let store = SessionStore::new();
    let ticket = store.begin_resolution();
    assert!(store.complete(ticket, None));
    assert_eq!(store.snapshot(), SessionState::Anonymous);
    assert!(!store.is_resolving());
}

#[test]
fn stale_ticket_is_discarded() {
    let store = SessionStore::new();
    let old = store.begin_resolution();
    let new = store.begin_resolution();
    assert!(store.complete(new, Some(sample_session("budi"))));
    // The older attempt finishing late must not overwrite the newer result.
    assert!(!store.complete(old, None));
    match store.snapshot() {
        SessionState::SignedIn(s) => assert_eq!(s.full_name, "budi"),
        other => panic!("expected newer result to survive, got {:?}", other),
    }
}

#[test]
fn clear_invalidates_inflight_ticket() {
    let store = SessionStore::new();
    let ticket = store.begin_resolution();
    store.clear();
    assert!(!store.complete(ticket, Some(sample_session("citra"))));
    assert_eq!(store.snapshot(), SessionState::Anonymous);
}

#[test]
fn set_invalidates_inflight_ticket() {
    let store = SessionStore::new();
    let ticket = store.begin_resolution();
    store.set(sample_session("dewi"));
    assert!(!store.complete(ticket, None));
    match store.snapshot() {
        SessionState::SignedIn(s) => assert_eq!(s.full_name, "dewi"),
        other => panic!("direct set must survive stale completion, got {:?}", other),
    }
}

#[test]
fn subscribers_fire_in_subscription_order() {
    let store = SessionStore::new();
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let o1 = order.clone();
    let o2 = order.clone();
    store.subscribe(move |_| o1.lock().push("first"));
    store.subscribe(move |_| o2.lock().push("second"));
    store.clear();
    assert_eq!(*order.lock(), vec!["first", "second"]);
}

#[test]
fn unsubscribed_callback_never_fires_again() {
    let store = SessionStore::new();
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let id = store.subscribe(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });
    store.clear();
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(store.unsubscribe(id));
    store.set(sample_session("eka"));
    assert_eq!(count.load(Ordering::SeqCst), 1, "unsubscribed callback fired");
    assert!(!store.unsubscribe(id), "double unsubscribe should report false");
}

#[test]
fn stale_commit_notifies_nobody() {
    let store = SessionStore::new();
    let old = store.begin_resolution();
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    store.subscribe(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });
    let _ = store.begin_resolution();
    let fired_before = count.load(Ordering::SeqCst);
    assert!(!store.complete(old, Some(sample_session("fajar"))));
    assert_eq!(count.load(Ordering::SeqCst), fired_before, "stale commit must not notify");
}

#[test]
fn subscriber_sees_committed_state() {
    let store = SessionStore::new();
    let seen: Arc<Mutex<Vec<SessionState>>> = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    store.subscribe(move |state| s.lock().push(state.clone()));
    let ticket = store.begin_resolution();
    assert!(store.complete(ticket, Some(sample_session("gita"))));
    let states = seen.lock();
    assert_eq!(states.len(), 2);
    assert_eq!(states[0], SessionState::Resolving);
    assert!(matches!(&states[1], SessionState::SignedIn(sess) if sess.full_name == "gita"));
}
