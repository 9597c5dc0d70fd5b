use std::time::Duration;

use chrono::NaiveDate;
use uuid::Uuid;

use super::*;
use crate::backend::types::{NewCustomer, StaffRole};
use crate::backend::MemoryBackend;
use crate::identity::{Role, SessionState, SessionStore};

fn identity(email: &str) -> Identity {
    Identity { id: Uuid::new_v4(), email: email.to_string() }
}

fn new_customer(invoice: &str, email: &str) -> NewCustomer {
    NewCustomer {
        invoice_number: invoice.to_string(),
        name: "Test Pelanggan".to_string(),
        email: Some(email.to_string()),
        phone: "+6281200001111".to_string(),
        package_id: None,
        monthly_fee: 150_000,
        due_date: 5,
        latitude: None,
        longitude: None,
        address: "Jl. Test No. 1".to_string(),
        start_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        notes: None,
    }
}

#[tokio::test]
async fn staff_email_resolves_to_staff_role() {
    let backend = MemoryBackend::new();
    backend.seed_staff("budi@juron.net.id", "Budi Santoso", StaffRole::Admin);
    let store = SessionStore::new();

    let outcome = resolve_identity(&backend, &store, &identity("budi@juron.net.id")).await;

    assert_eq!(outcome, ResolutionOutcome::Staff);
    match store.snapshot() {
        SessionState::SignedIn(s) => {
            assert_eq!(s.role, Role::Admin);
            assert_eq!(s.full_name, "Budi Santoso");
            assert!(s.invoice_number.is_none());
        }
        other => panic!("expected staff session, got {:?}", other),
    }
}

#[tokio::test]
async fn customer_email_resolves_with_invoice() {
    let backend = MemoryBackend::new();
    backend.seed_customer(&new_customer("JRN-250201", "andi@example.com")).unwrap();
    let store = SessionStore::new();

    let outcome = resolve_identity(&backend, &store, &identity("andi@example.com")).await;

    assert_eq!(outcome, ResolutionOutcome::Customer);
    match store.snapshot() {
        SessionState::SignedIn(s) => {
            assert_eq!(s.role, Role::Customer);
            assert_eq!(s.invoice_number.as_deref(), Some("JRN-250201"));
        }
        other => panic!("expected customer session, got {:?}", other),
    }
}

#[tokio::test]
async fn unknown_email_commits_anonymous() {
    let backend = MemoryBackend::new();
    let store = SessionStore::new();

    let outcome = resolve_identity(&backend, &store, &identity("nobody@example.com")).await;

    assert_eq!(outcome, ResolutionOutcome::NoMatch);
    assert_eq!(store.snapshot(), SessionState::Anonymous);
}

#[tokio::test]
async fn staff_record_wins_over_customer_record() {
    let backend = MemoryBackend::new();
    backend.seed_staff("both@juron.net.id", "Siti Rahayu", StaffRole::SuperAdmin);
    backend.seed_customer(&new_customer("JRN-250202", "both@juron.net.id")).unwrap();
    let store = SessionStore::new();

    let outcome = resolve_identity(&backend, &store, &identity("both@juron.net.id")).await;

    assert_eq!(outcome, ResolutionOutcome::Staff);
    match store.snapshot() {
        SessionState::SignedIn(s) => assert_eq!(s.role, Role::SuperAdmin),
        other => panic!("expected the staff role to win, got {:?}", other),
    }
}

#[tokio::test]
async fn staff_lookup_failure_falls_through_to_customer() {
    let backend = MemoryBackend::new();
    backend.seed_customer(&new_customer("JRN-250203", "citra@example.com")).unwrap();
    backend.fail_staff_lookups(true);
    let store = SessionStore::new();

    let outcome = resolve_identity(&backend, &store, &identity("citra@example.com")).await;

    assert_eq!(outcome, ResolutionOutcome::Customer);
    assert!(matches!(store.snapshot(), SessionState::SignedIn(s) if s.role == Role::Customer));
}

#[tokio::test]
async fn lookup_failure_without_match_signs_out() {
    let backend = MemoryBackend::new();
    backend.seed_customer(&new_customer("JRN-250204", "dewi@example.com")).unwrap();
    backend.fail_customer_lookups(true);
    let store = SessionStore::new();

    // The only record that could match is unreachable; access must not be
    // granted on a failed lookup.
    let outcome = resolve_identity(&backend, &store, &identity("dewi@example.com")).await;

    assert_eq!(outcome, ResolutionOutcome::Failed);
    assert_eq!(store.snapshot(), SessionState::Anonymous);
}

#[tokio::test]
async fn late_resolution_loses_to_newer_attempt() {
    let backend = MemoryBackend::new();
    backend.seed_staff("slow@juron.net.id", "Eka Lambat", StaffRole::Admin);
    backend.seed_staff("fast@juron.net.id", "Fajar Cepat", StaffRole::Technician);
    backend.set_lookup_delay("slow@juron.net.id", Duration::from_millis(100));
    let store = SessionStore::new();

    // The slow attempt starts first, the fast one supersedes it while the
    // slow lookup is still sleeping.
    let (slow, fast) = tokio::join!(
        resolve_identity(&backend, &store, &identity("slow@juron.net.id")),
        resolve_identity(&backend, &store, &identity("fast@juron.net.id")),
    );

    assert_eq!(slow, ResolutionOutcome::Staff);
    assert_eq!(fast, ResolutionOutcome::Staff);
    match store.snapshot() {
        SessionState::SignedIn(s) => {
            assert_eq!(s.full_name, "Fajar Cepat", "stale result overwrote the newer one");
        }
        other => panic!("expected a signed-in session, got {:?}", other),
    }
}
