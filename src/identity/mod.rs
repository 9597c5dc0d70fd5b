//! Central identity, session-state, and route-gating for the portal.
//! Keep the public surface thin and split implementation across sub-modules.

mod session;
mod store;
mod resolver;
mod gate;

pub use session::{Identity, Role, Session};
pub use store::{ResolutionTicket, SessionState, SessionStore, SubscriptionId};
pub use resolver::{resolve_identity, ResolutionOutcome};
pub use gate::{decide, GateDecision};
