//! juronet backend client
//! ----------------------
//! The hosted backend (auth + database) is consumed as an opaque network API.
//! This module defines the trait seams the rest of the portal talks through:
//!
//! - `AuthBackend`: access-token introspection, provider authorize URLs,
//!   sign-out, and a per-token auth-change watch stream.
//! - `DataBackend`: exact-field-equality lookups and mutations over the named
//!   collections (users, customers, payments, tickets, expenses, income,
//!   packages, settings).
//!
//! Two implementations exist: `rest::RestBackend` speaking the hosted HTTP
//! API, and `memory::MemoryBackend` for tests and demo mode.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::identity::Identity;

pub mod types;
pub mod rest;
pub mod memory;

pub use memory::MemoryBackend;
pub use rest::RestBackend;
pub use types::*;

/// Errors surfaced by backend implementations. `Conflict` is split out so
/// invoice-number generation can retry on uniqueness violations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend transport error: {0}")]
    Transport(String),
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("backend response decode error: {0}")]
    Decode(String),
    #[error("backend conflict: {0}")]
    Conflict(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Transport(err.to_string())
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

// Single-row lookups resolve only when exactly one row matches, the same
// contract the hosted API's single-object selects enforce.
pub(crate) fn single_row<T>(mut matches: Vec<T>) -> Option<T> {
    if matches.len() == 1 {
        matches.pop()
    } else {
        None
    }
}

/// Auth-change events for one watched access token.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    /// The token now maps to this identity (refresh, provider-side change).
    IdentityChanged(Identity),
    /// The token was revoked or expired.
    SignedOut,
}

/// Live subscription to auth changes for one access token. Dropping the watch
/// ends the subscription and stops its feeder task.
pub struct AuthWatch {
    rx: tokio::sync::mpsc::Receiver<AuthEvent>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl AuthWatch {
    pub fn new(rx: tokio::sync::mpsc::Receiver<AuthEvent>, task: Option<tokio::task::JoinHandle<()>>) -> Self {
        Self { rx, task }
    }

    /// Next event, or `None` once the feeder has stopped.
    pub async fn next_event(&mut self) -> Option<AuthEvent> {
        self.rx.recv().await
    }
}

impl Drop for AuthWatch {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Resolve an access token to the identity it was issued for.
    /// `Ok(None)` means the token is not (or no longer) valid.
    async fn identity_for_token(&self, access_token: &str) -> BackendResult<Option<Identity>>;

    /// Provider authorize URL for browser-redirect sign-in.
    fn authorize_url(&self, provider: &str, redirect_to: &str) -> String;

    async fn sign_out(&self, access_token: &str) -> BackendResult<()>;

    /// Subscribe to auth changes for this token.
    async fn watch(&self, access_token: &str) -> AuthWatch;
}

#[async_trait]
pub trait DataBackend: Send + Sync {
    // users
    async fn staff_by_email(&self, email: &str) -> BackendResult<Option<StaffRecord>>;

    // customers
    async fn customer_by_email(&self, email: &str) -> BackendResult<Option<CustomerRecord>>;
    async fn customer_by_id(&self, id: Uuid) -> BackendResult<Option<CustomerRecord>>;
    async fn customer_by_invoice_and_phone(&self, invoice_number: &str, phone: &str) -> BackendResult<Option<CustomerRecord>>;
    async fn customers(&self) -> BackendResult<Vec<CustomerRecord>>;
    async fn insert_customer(&self, new: &NewCustomer) -> BackendResult<CustomerRecord>;
    /// `Ok(None)` when no customer has this id.
    async fn update_customer(&self, id: Uuid, update: &CustomerUpdate) -> BackendResult<Option<CustomerRecord>>;

    // payments
    async fn payments_by_status(&self, status: PaymentStatus) -> BackendResult<Vec<PaymentRecord>>;
    async fn payments_by_customer(&self, customer_id: Uuid) -> BackendResult<Vec<PaymentRecord>>;
    async fn payments_by_month(&self, month: &str) -> BackendResult<Vec<PaymentRecord>>;
    async fn insert_payment(&self, new: &NewPayment) -> BackendResult<PaymentRecord>;
    async fn set_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        verified_by: Option<Uuid>,
        notes: Option<String>,
    ) -> BackendResult<Option<PaymentRecord>>;

    // tickets
    async fn tickets(&self) -> BackendResult<Vec<TicketRecord>>;
    async fn tickets_by_customer(&self, customer_id: Uuid) -> BackendResult<Vec<TicketRecord>>;
    async fn tickets_by_status(&self, status: TicketStatus) -> BackendResult<Vec<TicketRecord>>;
    async fn insert_ticket(&self, new: &NewTicket) -> BackendResult<TicketRecord>;
    async fn reply_ticket(&self, id: Uuid, reply: &str, status: TicketStatus) -> BackendResult<Option<TicketRecord>>;

    // financial
    async fn expenses_by_month(&self, month: &str) -> BackendResult<Vec<ExpenseRecord>>;
    async fn insert_expense(&self, new: &NewExpense) -> BackendResult<ExpenseRecord>;
    async fn income_by_month(&self, month: &str) -> BackendResult<Vec<IncomeRecord>>;
    async fn insert_income(&self, new: &NewIncome) -> BackendResult<IncomeRecord>;

    // packages and settings
    async fn package_by_id(&self, id: Uuid) -> BackendResult<Option<PackageRecord>>;
    async fn packages(&self) -> BackendResult<Vec<PackageRecord>>;
    async fn setting_by_key(&self, key: &str) -> BackendResult<Option<SettingRecord>>;
}

/// Umbrella trait so handlers can hold one object for both concerns.
pub trait PortalBackend: AuthBackend + DataBackend {}
impl<T: AuthBackend + DataBackend> PortalBackend for T {}

pub type SharedBackend = Arc<dyn PortalBackend>;
