//! Role gate: pure routing decisions over (session state, requested path).
//!
//! No I/O happens here; the HTTP layer consumes the decision. `Defer` means a
//! resolution is still in flight and the caller must not flash-redirect.

use super::session::Role;
use super::store::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Render,
    Redirect(&'static str),
    Defer,
}

/// Recognized admin sections. Any other admin-prefixed path redirects an
/// entitled user to the dashboard.
const ADMIN_SECTIONS: [&str; 5] = [
    "/admin/dashboard",
    "/admin/customers",
    "/admin/financial",
    "/admin/payments",
    "/admin/maps",
];

pub fn decide(state: &SessionState, path: &str) -> GateDecision {
    let path = normalize_path(path);

    // Public paths come ahead of the protected prefixes.
    if path == "/" || path == "/customer/login" || path == "/admin/login" {
        return GateDecision::Render;
    }

    if path == "/admin" || path.starts_with("/admin/") {
        return match state {
            SessionState::Resolving => GateDecision::Defer,
            SessionState::SignedIn(s) if s.role.is_elevated_staff() => {
                if ADMIN_SECTIONS.contains(&path) {
                    GateDecision::Render
                } else {
                    GateDecision::Redirect("/admin/dashboard")
                }
            }
            _ => GateDecision::Redirect("/admin/login"),
        };
    }

    if path == "/customer/portal" {
        return match state {
            SessionState::Resolving => GateDecision::Defer,
            SessionState::SignedIn(s) if s.role == Role::Customer => GateDecision::Render,
            _ => GateDecision::Redirect("/customer/login"),
        };
    }

    // Unrecognized paths fall back to the landing page regardless of state.
    GateDecision::Redirect("/")
}

// Trailing slashes are not significant except on the root itself.
fn normalize_path(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod gate_tests;
