//! Session resolution: backend identity to application role.
//!
//! Lookup order is fixed: the staff collection strictly before the customer
//! collection, so an email present in both resolves to the staff role. A
//! lookup failure is logged and treated like "no match" for that step; an
//! identity that cannot be resolved never receives access.

use tracing::{debug, warn};

use crate::backend::DataBackend;

use super::session::{Identity, Session};
use super::store::SessionStore;

/// What a resolution attempt determined. `NoMatch` and `Failed` both commit
/// an anonymous state; they are distinguished for observability only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Staff,
    Customer,
    NoMatch,
    Failed,
}

/// Resolve `identity` into `store` under a fresh resolution ticket.
///
/// Exactly one commit is attempted per call; if a newer attempt started (or a
/// direct set/clear happened) while this one was in flight, the commit is
/// discarded and the store keeps the newer result.
pub async fn resolve_identity<B>(backend: &B, store: &SessionStore, identity: &Identity) -> ResolutionOutcome
where
    B: DataBackend + ?Sized,
{
    let ticket = store.begin_resolution();
    let mut lookup_failed = false;

    match backend.staff_by_email(&identity.email).await {
        Ok(Some(staff)) => {
            let session = Session::from_staff(&staff);
            if store.complete(ticket, Some(session)) {
                debug!(target: "session", email = %identity.email, role = staff.role.as_str(), "resolved as staff");
            }
            return ResolutionOutcome::Staff;
        }
        Ok(None) => {}
        Err(e) => {
            warn!(target: "session", email = %identity.email, "staff lookup failed, falling through: {}", e);
            lookup_failed = true;
        }
    }

    match backend.customer_by_email(&identity.email).await {
        Ok(Some(customer)) => {
            let session = Session::from_customer(&customer);
            if store.complete(ticket, Some(session)) {
                debug!(target: "session", email = %identity.email, invoice = %customer.invoice_number, "resolved as customer");
            }
            return ResolutionOutcome::Customer;
        }
        Ok(None) => {}
        Err(e) => {
            warn!(target: "session", email = %identity.email, "customer lookup failed: {}", e);
            lookup_failed = true;
        }
    }

    let _ = store.complete(ticket, None);
    if lookup_failed {
        warn!(target: "session", email = %identity.email, "resolution failed, session cleared");
        ResolutionOutcome::Failed
    } else {
        debug!(target: "session", email = %identity.email, "no matching account");
        ResolutionOutcome::NoMatch
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod resolver_tests;
