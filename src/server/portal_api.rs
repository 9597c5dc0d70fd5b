//! Customer portal API handlers
//! ----------------------------
//! Endpoints behind the customer role gate. Every query is scoped to the
//! signed-in customer's own id; there is no cross-customer access from this
//! surface. Status shown to the customer is derived from payment history at
//! request time.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::backend::{
    CustomerRecord, CustomerStatus, NewPayment, NewTicket, PaymentRecord, TicketPriority,
    TicketRecord, TicketStatus,
};
use crate::error::AppError;
use crate::format::{
    calculate_customer_status, format_currency, status_category, validate_payment_month,
    StatusCategory,
};

use super::{error_response, page_session, validate_csrf, AppState};

const PORTAL_PAGE: &str = "/customer/portal";

/// How many payments the portal landing page lists.
const RECENT_PAYMENTS: usize = 5;

fn csrf_rejection() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({"status":"forbidden","error":"invalid csrf"})),
    )
        .into_response()
}

fn parse_priority(raw: &str) -> Option<TicketPriority> {
    match raw {
        "low" => Some(TicketPriority::Low),
        "medium" => Some(TicketPriority::Medium),
        "high" => Some(TicketPriority::High),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
struct AccountView {
    #[serde(flatten)]
    record: CustomerRecord,
    derived_status: CustomerStatus,
    status_category: StatusCategory,
    monthly_fee_display: String,
}

impl AccountView {
    fn build(record: CustomerRecord) -> Self {
        let today = Local::now().date_naive();
        let derived = calculate_customer_status(record.last_payment_date, record.due_date, today);
        Self {
            derived_status: derived,
            status_category: status_category(derived.as_str()),
            monthly_fee_display: format_currency(record.monthly_fee),
            record,
        }
    }
}

#[derive(Debug, Serialize)]
struct PaymentView {
    #[serde(flatten)]
    record: PaymentRecord,
    amount_display: String,
    status_category: StatusCategory,
}

impl PaymentView {
    fn build(record: PaymentRecord) -> Self {
        Self {
            amount_display: format_currency(record.amount),
            status_category: status_category(record.status.as_str()),
            record,
        }
    }
}

#[derive(Debug, Serialize)]
struct TicketView {
    #[serde(flatten)]
    record: TicketRecord,
    status_category: StatusCategory,
}

impl TicketView {
    fn build(record: TicketRecord) -> Self {
        Self {
            status_category: status_category(record.status.as_str()),
            record,
        }
    }
}

/// The session references a customer row that has since disappeared.
fn account_gone() -> Response {
    error_response(AppError::NotFound {
        code: "account_gone".into(),
        message: "customer account no longer exists".into(),
    })
}

/// GET /customer/portal: the signed-in customer's own account, package,
/// recent payments, and open tickets.
pub async fn portal_home(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = match page_session(&state, &headers, PORTAL_PAGE).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };
    let customer = match state.backend.customer_by_id(session.id).await {
        Ok(Some(record)) => record,
        Ok(None) => return account_gone(),
        Err(e) => {
            error!("portal account lookup failed: {e}");
            return error_response(e.into());
        }
    };
    let package = match customer.package_id {
        Some(package_id) => match state.backend.package_by_id(package_id).await {
            Ok(found) => found,
            Err(e) => {
                error!("portal package lookup failed: {e}");
                return error_response(e.into());
            }
        },
        None => None,
    };
    let payments = match state.backend.payments_by_customer(session.id).await {
        Ok(rows) => rows,
        Err(e) => {
            error!("portal payment lookup failed: {e}");
            return error_response(e.into());
        }
    };
    let tickets = match state.backend.tickets_by_customer(session.id).await {
        Ok(rows) => rows,
        Err(e) => {
            error!("portal ticket lookup failed: {e}");
            return error_response(e.into());
        }
    };
    let recent: Vec<PaymentView> =
        payments.into_iter().take(RECENT_PAYMENTS).map(PaymentView::build).collect();
    let open: Vec<TicketView> = tickets
        .into_iter()
        .filter(|t| matches!(t.status, TicketStatus::Open | TicketStatus::InProgress))
        .map(TicketView::build)
        .collect();
    (
        StatusCode::OK,
        Json(json!({"status":"ok","portal":{
            "account": AccountView::build(customer),
            "package": package,
            "recent_payments": recent,
            "open_tickets": open,
        }})),
    )
        .into_response()
}

/// GET /customer/payments: the customer's full payment history, newest
/// first.
pub async fn list_payments(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = match page_session(&state, &headers, PORTAL_PAGE).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };
    let payments = match state.backend.payments_by_customer(session.id).await {
        Ok(rows) => rows,
        Err(e) => {
            error!("payment history lookup failed: {e}");
            return error_response(e.into());
        }
    };
    let views: Vec<PaymentView> = payments.into_iter().map(PaymentView::build).collect();
    (StatusCode::OK, Json(json!({"status":"ok","payments": views}))).into_response()
}

#[derive(Debug, Deserialize)]
pub struct SubmitPaymentPayload {
    amount: i64,
    payment_month: String,
    payment_method: String,
    #[serde(default)]
    proof_url: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

/// POST /customer/payments: report a payment for one billing month. The
/// record enters the pending queue until an admin verifies it.
pub async fn submit_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SubmitPaymentPayload>,
) -> Response {
    let session = match page_session(&state, &headers, PORTAL_PAGE).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };
    if !validate_csrf(&state, &headers).await {
        return csrf_rejection();
    }
    if payload.amount <= 0 {
        return error_response(AppError::UserInput {
            code: "invalid_amount".into(),
            message: "Amount must be positive".into(),
        });
    }
    if !validate_payment_month(&payload.payment_month) {
        return error_response(AppError::UserInput {
            code: "invalid_month".into(),
            message: "Invalid month format. Use YYYY-MM".into(),
        });
    }
    if payload.payment_method.trim().is_empty() {
        return error_response(AppError::UserInput {
            code: "missing_payment_method".into(),
            message: "Payment method is required".into(),
        });
    }
    let customer = match state.backend.customer_by_id(session.id).await {
        Ok(Some(record)) => record,
        Ok(None) => return account_gone(),
        Err(e) => {
            error!("portal account lookup failed: {e}");
            return error_response(e.into());
        }
    };
    let new = NewPayment {
        customer_id: customer.id,
        invoice_number: customer.invoice_number,
        amount: payload.amount,
        payment_date: Local::now().date_naive(),
        payment_month: payload.payment_month,
        payment_method: payload.payment_method.trim().to_string(),
        proof_url: payload.proof_url,
        notes: payload.notes,
    };
    match state.backend.insert_payment(&new).await {
        Ok(record) => {
            (StatusCode::OK, Json(json!({"status":"ok","payment": PaymentView::build(record)})))
                .into_response()
        }
        Err(e) => {
            error!("payment submission failed: {e}");
            error_response(e.into())
        }
    }
}

/// GET /customer/tickets: the customer's own tickets, newest first.
pub async fn list_tickets(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = match page_session(&state, &headers, PORTAL_PAGE).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };
    let tickets = match state.backend.tickets_by_customer(session.id).await {
        Ok(rows) => rows,
        Err(e) => {
            error!("ticket history lookup failed: {e}");
            return error_response(e.into());
        }
    };
    let views: Vec<TicketView> = tickets.into_iter().map(TicketView::build).collect();
    (StatusCode::OK, Json(json!({"status":"ok","tickets": views}))).into_response()
}

#[derive(Debug, Deserialize)]
pub struct NewTicketPayload {
    category: String,
    subject: String,
    message: String,
    #[serde(default)]
    priority: Option<String>,
}

/// POST /customer/tickets: open a support ticket. Priority defaults to
/// medium.
pub async fn create_ticket(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<NewTicketPayload>,
) -> Response {
    let session = match page_session(&state, &headers, PORTAL_PAGE).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };
    if !validate_csrf(&state, &headers).await {
        return csrf_rejection();
    }
    if payload.category.trim().is_empty() {
        return error_response(AppError::UserInput {
            code: "missing_category".into(),
            message: "Category is required".into(),
        });
    }
    if payload.subject.trim().is_empty() {
        return error_response(AppError::UserInput {
            code: "missing_subject".into(),
            message: "Subject is required".into(),
        });
    }
    if payload.message.trim().is_empty() {
        return error_response(AppError::UserInput {
            code: "missing_message".into(),
            message: "Message is required".into(),
        });
    }
    let priority = match payload.priority.as_deref() {
        Some(raw) => {
            let Some(priority) = parse_priority(raw) else {
                return error_response(AppError::UserInput {
                    code: "invalid_priority".into(),
                    message: format!("unknown ticket priority '{}'", raw),
                });
            };
            priority
        }
        None => TicketPriority::Medium,
    };
    let new = NewTicket {
        customer_id: session.id,
        category: payload.category.trim().to_string(),
        subject: payload.subject.trim().to_string(),
        message: payload.message.trim().to_string(),
        priority,
    };
    match state.backend.insert_ticket(&new).await {
        Ok(record) => {
            (StatusCode::OK, Json(json!({"status":"ok","ticket": TicketView::build(record)})))
                .into_response()
        }
        Err(e) => {
            error!("ticket creation failed: {e}");
            error_response(e.into())
        }
    }
}
