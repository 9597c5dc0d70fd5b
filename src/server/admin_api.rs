//! Admin API handlers
//! ------------------
//! Staff-facing endpoints behind the admin role gate: dashboard KPIs,
//! customer management, financial entries, payment verification, ticket
//! replies, and the coverage map. Customer status in every response is
//! derived from payment history at request time, never read from the stored
//! column. Mutating endpoints also require the session's CSRF token.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::backend::{
    BackendError, CustomerRecord, CustomerStatus, CustomerUpdate, ExpenseRecord, IncomeRecord,
    NewCustomer, NewExpense, NewIncome, PaymentRecord, PaymentStatus, TicketRecord, TicketStatus,
};
use crate::error::AppError;
use crate::format::{
    calculate_customer_status, format_currency, format_phone_number, generate_invoice_number,
    maps_url, month_of, status_category, validate_payment_month, StatusCategory,
};

use super::{error_response, page_session, validate_csrf, AppState};

/// Conflicting generated invoice numbers are retried this many times before
/// the insert error surfaces.
const INVOICE_RETRIES: usize = 5;

fn csrf_rejection() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({"status":"forbidden","error":"invalid csrf"})),
    )
        .into_response()
}

fn parse_payment_status(raw: &str) -> Option<PaymentStatus> {
    match raw {
        "pending" => Some(PaymentStatus::Pending),
        "verified" => Some(PaymentStatus::Verified),
        "rejected" => Some(PaymentStatus::Rejected),
        _ => None,
    }
}

fn parse_ticket_status(raw: &str) -> Option<TicketStatus> {
    match raw {
        "open" => Some(TicketStatus::Open),
        "in_progress" => Some(TicketStatus::InProgress),
        "resolved" => Some(TicketStatus::Resolved),
        "closed" => Some(TicketStatus::Closed),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
struct CustomerView {
    #[serde(flatten)]
    record: CustomerRecord,
    derived_status: CustomerStatus,
    status_category: StatusCategory,
    monthly_fee_display: String,
}

impl CustomerView {
    fn build(record: CustomerRecord, today: NaiveDate) -> Self {
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
    customer_name: Option<String>,
    amount_display: String,
    status_category: StatusCategory,
}

impl PaymentView {
    fn build(record: PaymentRecord, names: &HashMap<Uuid, String>) -> Self {
        Self {
            customer_name: names.get(&record.customer_id).cloned(),
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
    customer_name: Option<String>,
    status_category: StatusCategory,
}

impl TicketView {
    fn build(record: TicketRecord, names: &HashMap<Uuid, String>) -> Self {
        Self {
            customer_name: names.get(&record.customer_id).cloned(),
            status_category: status_category(record.status.as_str()),
            record,
        }
    }
}

#[derive(Debug, Serialize)]
struct BookEntryView<T: Serialize> {
    #[serde(flatten)]
    record: T,
    amount_display: String,
}

#[derive(Debug, Serialize)]
struct MapPointView {
    id: Uuid,
    name: String,
    invoice_number: String,
    latitude: f64,
    longitude: f64,
    address: String,
    derived_status: CustomerStatus,
    status_category: StatusCategory,
    maps_url: String,
}

async fn customer_names(state: &AppState) -> Result<HashMap<Uuid, String>, Response> {
    match state.backend.customers().await {
        Ok(rows) => Ok(rows.into_iter().map(|c| (c.id, c.name)).collect()),
        Err(e) => {
            error!("customer list lookup failed: {e}");
            Err(error_response(e.into()))
        }
    }
}

/// GET /admin/dashboard: headline numbers for the admin landing page.
pub async fn dashboard(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = page_session(&state, &headers, "/admin/dashboard").await {
        return resp;
    }
    let customers = match state.backend.customers().await {
        Ok(rows) => rows,
        Err(e) => {
            error!("dashboard customer lookup failed: {e}");
            return error_response(e.into());
        }
    };
    let today = Local::now().date_naive();
    let month = month_of(today);
    let total_customers = customers.len();
    let mut active_customers = 0usize;
    let mut overdue_customers = 0usize;
    for customer in &customers {
        match calculate_customer_status(customer.last_payment_date, customer.due_date, today) {
            CustomerStatus::Active => active_customers += 1,
            CustomerStatus::Overdue => overdue_customers += 1,
            CustomerStatus::Inactive => {}
        }
    }
    let monthly_revenue: i64 = match state.backend.payments_by_month(&month).await {
        Ok(rows) => rows
            .iter()
            .filter(|p| p.status == PaymentStatus::Verified)
            .map(|p| p.amount)
            .sum(),
        Err(e) => {
            error!("dashboard payment lookup failed: {e}");
            return error_response(e.into());
        }
    };
    let pending_payments = match state.backend.payments_by_status(PaymentStatus::Pending).await {
        Ok(rows) => rows.len(),
        Err(e) => {
            error!("dashboard pending payment lookup failed: {e}");
            return error_response(e.into());
        }
    };
    let open_tickets = match state.backend.tickets_by_status(TicketStatus::Open).await {
        Ok(rows) => rows.len(),
        Err(e) => {
            error!("dashboard ticket lookup failed: {e}");
            return error_response(e.into());
        }
    };
    (
        StatusCode::OK,
        Json(json!({"status":"ok","dashboard":{
            "month": month,
            "total_customers": total_customers,
            "active_customers": active_customers,
            "overdue_customers": overdue_customers,
            "monthly_revenue": monthly_revenue,
            "monthly_revenue_display": format_currency(monthly_revenue),
            "pending_payments": pending_payments,
            "open_tickets": open_tickets,
        }})),
    )
        .into_response()
}

/// GET /admin/customers: all customers, newest first, with derived status.
pub async fn list_customers(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = page_session(&state, &headers, "/admin/customers").await {
        return resp;
    }
    let customers = match state.backend.customers().await {
        Ok(rows) => rows,
        Err(e) => {
            error!("customer list lookup failed: {e}");
            return error_response(e.into());
        }
    };
    let today = Local::now().date_naive();
    let views: Vec<CustomerView> =
        customers.into_iter().map(|c| CustomerView::build(c, today)).collect();
    (StatusCode::OK, Json(json!({"status":"ok","customers": views}))).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CreateCustomerPayload {
    name: String,
    #[serde(default)]
    email: Option<String>,
    phone: String,
    #[serde(default)]
    package_id: Option<Uuid>,
    monthly_fee: i64,
    due_date: u32,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    address: String,
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    notes: Option<String>,
}

/// POST /admin/customers: register a customer. The invoice number is
/// generated server-side and regenerated on a uniqueness conflict.
pub async fn create_customer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateCustomerPayload>,
) -> Response {
    if let Err(resp) = page_session(&state, &headers, "/admin/customers").await {
        return resp;
    }
    if !validate_csrf(&state, &headers).await {
        return csrf_rejection();
    }
    if payload.name.trim().is_empty() {
        return error_response(AppError::UserInput {
            code: "missing_name".into(),
            message: "Customer name is required".into(),
        });
    }
    if payload.phone.trim().is_empty() {
        return error_response(AppError::UserInput {
            code: "missing_phone".into(),
            message: "Phone number is required".into(),
        });
    }
    if payload.address.trim().is_empty() {
        return error_response(AppError::UserInput {
            code: "missing_address".into(),
            message: "Address is required".into(),
        });
    }
    if payload.monthly_fee <= 0 {
        return error_response(AppError::UserInput {
            code: "invalid_monthly_fee".into(),
            message: "Monthly fee must be positive".into(),
        });
    }
    if !(1..=31).contains(&payload.due_date) {
        return error_response(AppError::UserInput {
            code: "invalid_due_date".into(),
            message: "Due date must be between 1 and 31".into(),
        });
    }

    let today = Local::now().date_naive();
    let mut new = NewCustomer {
        invoice_number: generate_invoice_number(),
        name: payload.name.trim().to_string(),
        email: payload.email,
        phone: format_phone_number(&payload.phone),
        package_id: payload.package_id,
        monthly_fee: payload.monthly_fee,
        due_date: payload.due_date,
        latitude: payload.latitude,
        longitude: payload.longitude,
        address: payload.address.trim().to_string(),
        start_date: payload.start_date.unwrap_or(today),
        notes: payload.notes,
    };
    let mut attempt = 0;
    let created = loop {
        match state.backend.insert_customer(&new).await {
            Ok(record) => break record,
            Err(BackendError::Conflict(_)) if attempt < INVOICE_RETRIES => {
                attempt += 1;
                new.invoice_number = generate_invoice_number();
            }
            Err(e) => {
                error!("customer insert failed: {e}");
                return error_response(e.into());
            }
        }
    };
    (
        StatusCode::OK,
        Json(json!({"status":"ok","customer": CustomerView::build(created, today)})),
    )
        .into_response()
}

/// GET /admin/customers/{id}: one customer with package, payments, tickets.
pub async fn customer_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response {
    if let Err(resp) = page_session(&state, &headers, "/admin/customers").await {
        return resp;
    }
    let customer = match state.backend.customer_by_id(id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            return error_response(AppError::NotFound {
                code: "not_found".into(),
                message: format!("no customer with id {}", id),
            });
        }
        Err(e) => {
            error!("customer lookup failed: {e}");
            return error_response(e.into());
        }
    };
    let package = match customer.package_id {
        Some(package_id) => match state.backend.package_by_id(package_id).await {
            Ok(found) => found,
            Err(e) => {
                error!("package lookup failed: {e}");
                return error_response(e.into());
            }
        },
        None => None,
    };
    let payments = match state.backend.payments_by_customer(id).await {
        Ok(rows) => rows,
        Err(e) => {
            error!("payment history lookup failed: {e}");
            return error_response(e.into());
        }
    };
    let tickets = match state.backend.tickets_by_customer(id).await {
        Ok(rows) => rows,
        Err(e) => {
            error!("ticket history lookup failed: {e}");
            return error_response(e.into());
        }
    };
    let today = Local::now().date_naive();
    let name = customer.name.clone();
    let mut names = HashMap::new();
    names.insert(customer.id, name);
    let payment_views: Vec<PaymentView> =
        payments.into_iter().map(|p| PaymentView::build(p, &names)).collect();
    let ticket_views: Vec<TicketView> =
        tickets.into_iter().map(|t| TicketView::build(t, &names)).collect();
    (
        StatusCode::OK,
        Json(json!({"status":"ok",
            "customer": CustomerView::build(customer, today),
            "package": package,
            "payments": payment_views,
            "tickets": ticket_views,
        })),
    )
        .into_response()
}

/// PUT /admin/customers/{id}: field-wise update; omitted fields keep their
/// stored value.
pub async fn update_customer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(mut update): Json<CustomerUpdate>,
) -> Response {
    if let Err(resp) = page_session(&state, &headers, "/admin/customers").await {
        return resp;
    }
    if !validate_csrf(&state, &headers).await {
        return csrf_rejection();
    }
    if let Some(due_date) = update.due_date {
        if !(1..=31).contains(&due_date) {
            return error_response(AppError::UserInput {
                code: "invalid_due_date".into(),
                message: "Due date must be between 1 and 31".into(),
            });
        }
    }
    if let Some(fee) = update.monthly_fee {
        if fee <= 0 {
            return error_response(AppError::UserInput {
                code: "invalid_monthly_fee".into(),
                message: "Monthly fee must be positive".into(),
            });
        }
    }
    if let Some(phone) = &update.phone {
        update.phone = Some(format_phone_number(phone));
    }
    let updated = match state.backend.update_customer(id, &update).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            return error_response(AppError::NotFound {
                code: "not_found".into(),
                message: format!("no customer with id {}", id),
            });
        }
        Err(e) => {
            error!("customer update failed: {e}");
            return error_response(e.into());
        }
    };
    let today = Local::now().date_naive();
    (
        StatusCode::OK,
        Json(json!({"status":"ok","customer": CustomerView::build(updated, today)})),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    month: Option<String>,
}

/// GET /admin/financial?month=YYYY-MM: income and expense books for one
/// month plus totals. Defaults to the current month.
pub async fn financial_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<MonthQuery>,
) -> Response {
    if let Err(resp) = page_session(&state, &headers, "/admin/financial").await {
        return resp;
    }
    let month = query.month.unwrap_or_else(|| month_of(Local::now().date_naive()));
    if !validate_payment_month(&month) {
        return error_response(AppError::UserInput {
            code: "invalid_month".into(),
            message: "Invalid month format. Use YYYY-MM".into(),
        });
    }
    let income = match state.backend.income_by_month(&month).await {
        Ok(rows) => rows,
        Err(e) => {
            error!("income lookup failed: {e}");
            return error_response(e.into());
        }
    };
    let expenses = match state.backend.expenses_by_month(&month).await {
        Ok(rows) => rows,
        Err(e) => {
            error!("expense lookup failed: {e}");
            return error_response(e.into());
        }
    };
    let total_income: i64 = income.iter().map(|r| r.amount).sum();
    let total_expenses: i64 = expenses.iter().map(|r| r.amount).sum();
    let net = total_income - total_expenses;
    let income_views: Vec<BookEntryView<IncomeRecord>> = income
        .into_iter()
        .map(|r| BookEntryView { amount_display: format_currency(r.amount), record: r })
        .collect();
    let expense_views: Vec<BookEntryView<ExpenseRecord>> = expenses
        .into_iter()
        .map(|r| BookEntryView { amount_display: format_currency(r.amount), record: r })
        .collect();
    (
        StatusCode::OK,
        Json(json!({"status":"ok","summary":{
            "month": month,
            "income": income_views,
            "expenses": expense_views,
            "total_income": total_income,
            "total_income_display": format_currency(total_income),
            "total_expenses": total_expenses,
            "total_expenses_display": format_currency(total_expenses),
            "net": net,
            "net_display": format_currency(net),
        }})),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct BookEntryPayload {
    #[serde(default)]
    date: Option<NaiveDate>,
    category: String,
    description: String,
    amount: i64,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    vendor: Option<String>,
    payment_method: String,
    #[serde(default)]
    reference_number: Option<String>,
    #[serde(default)]
    receipt_url: Option<String>,
}

fn validate_book_entry(payload: &BookEntryPayload) -> Option<AppError> {
    if payload.category.trim().is_empty() {
        return Some(AppError::UserInput {
            code: "missing_category".into(),
            message: "Category is required".into(),
        });
    }
    if payload.description.trim().is_empty() {
        return Some(AppError::UserInput {
            code: "missing_description".into(),
            message: "Description is required".into(),
        });
    }
    if payload.amount <= 0 {
        return Some(AppError::UserInput {
            code: "invalid_amount".into(),
            message: "Amount must be positive".into(),
        });
    }
    None
}

/// POST /admin/financial/income: record a manual income entry.
pub async fn record_income(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<BookEntryPayload>,
) -> Response {
    let session = match page_session(&state, &headers, "/admin/financial").await {
        Ok(session) => session,
        Err(resp) => return resp,
    };
    if !validate_csrf(&state, &headers).await {
        return csrf_rejection();
    }
    if let Some(err) = validate_book_entry(&payload) {
        return error_response(err);
    }
    let new = NewIncome {
        date: payload.date.unwrap_or_else(|| Local::now().date_naive()),
        category: payload.category.trim().to_string(),
        description: payload.description.trim().to_string(),
        amount: payload.amount,
        source: payload.source,
        payment_method: payload.payment_method,
        reference_number: payload.reference_number,
        created_by: session.id,
    };
    match state.backend.insert_income(&new).await {
        Ok(record) => (
            StatusCode::OK,
            Json(json!({"status":"ok","income": BookEntryView {
                amount_display: format_currency(record.amount),
                record,
            }})),
        )
            .into_response(),
        Err(e) => {
            error!("income insert failed: {e}");
            error_response(e.into())
        }
    }
}

/// POST /admin/financial/expenses: record an expense entry.
pub async fn record_expense(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<BookEntryPayload>,
) -> Response {
    let session = match page_session(&state, &headers, "/admin/financial").await {
        Ok(session) => session,
        Err(resp) => return resp,
    };
    if !validate_csrf(&state, &headers).await {
        return csrf_rejection();
    }
    if let Some(err) = validate_book_entry(&payload) {
        return error_response(err);
    }
    let new = NewExpense {
        date: payload.date.unwrap_or_else(|| Local::now().date_naive()),
        category: payload.category.trim().to_string(),
        description: payload.description.trim().to_string(),
        amount: payload.amount,
        vendor: payload.vendor,
        payment_method: payload.payment_method,
        reference_number: payload.reference_number,
        receipt_url: payload.receipt_url,
        created_by: session.id,
    };
    match state.backend.insert_expense(&new).await {
        Ok(record) => (
            StatusCode::OK,
            Json(json!({"status":"ok","expense": BookEntryView {
                amount_display: format_currency(record.amount),
                record,
            }})),
        )
            .into_response(),
        Err(e) => {
            error!("expense insert failed: {e}");
            error_response(e.into())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PaymentListQuery {
    status: Option<String>,
}

/// GET /admin/payments?status=pending: payments in one verification state,
/// newest first. Defaults to the pending queue.
pub async fn list_payments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PaymentListQuery>,
) -> Response {
    if let Err(resp) = page_session(&state, &headers, "/admin/payments").await {
        return resp;
    }
    let raw = query.status.unwrap_or_else(|| "pending".to_string());
    let Some(status) = parse_payment_status(&raw) else {
        return error_response(AppError::UserInput {
            code: "invalid_status".into(),
            message: format!("unknown payment status '{}'", raw),
        });
    };
    let payments = match state.backend.payments_by_status(status).await {
        Ok(rows) => rows,
        Err(e) => {
            error!("payment list lookup failed: {e}");
            return error_response(e.into());
        }
    };
    let names = match customer_names(&state).await {
        Ok(names) => names,
        Err(resp) => return resp,
    };
    let views: Vec<PaymentView> =
        payments.into_iter().map(|p| PaymentView::build(p, &names)).collect();
    (StatusCode::OK, Json(json!({"status":"ok","payments": views}))).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ReviewPayload {
    #[serde(default)]
    notes: Option<String>,
}

/// POST /admin/payments/{id}/verify: mark a payment verified and advance the
/// customer's billing state to the payment's date.
pub async fn verify_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewPayload>,
) -> Response {
    let session = match page_session(&state, &headers, "/admin/payments").await {
        Ok(session) => session,
        Err(resp) => return resp,
    };
    if !validate_csrf(&state, &headers).await {
        return csrf_rejection();
    }
    let payment = match state
        .backend
        .set_payment_status(id, PaymentStatus::Verified, Some(session.id), payload.notes)
        .await
    {
        Ok(Some(record)) => record,
        Ok(None) => {
            return error_response(AppError::NotFound {
                code: "not_found".into(),
                message: format!("no payment with id {}", id),
            });
        }
        Err(e) => {
            error!("payment verification failed: {e}");
            return error_response(e.into());
        }
    };
    let update = CustomerUpdate {
        status: Some(CustomerStatus::Active),
        last_payment_date: Some(payment.payment_date),
        ..CustomerUpdate::default()
    };
    match state.backend.update_customer(payment.customer_id, &update).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            // Payment verified but its customer is gone; report the payment
            // anyway and leave the orphan visible in the log.
            error!(customer_id = %payment.customer_id, "verified payment has no customer row");
        }
        Err(e) => {
            error!("customer billing update failed: {e}");
            return error_response(e.into());
        }
    }
    let names = match customer_names(&state).await {
        Ok(names) => names,
        Err(resp) => return resp,
    };
    (
        StatusCode::OK,
        Json(json!({"status":"ok","payment": PaymentView::build(payment, &names)})),
    )
        .into_response()
}

/// POST /admin/payments/{id}/reject: reject a payment, recording who and why.
/// The customer's billing state is untouched.
pub async fn reject_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewPayload>,
) -> Response {
    let session = match page_session(&state, &headers, "/admin/payments").await {
        Ok(session) => session,
        Err(resp) => return resp,
    };
    if !validate_csrf(&state, &headers).await {
        return csrf_rejection();
    }
    let payment = match state
        .backend
        .set_payment_status(id, PaymentStatus::Rejected, Some(session.id), payload.notes)
        .await
    {
        Ok(Some(record)) => record,
        Ok(None) => {
            return error_response(AppError::NotFound {
                code: "not_found".into(),
                message: format!("no payment with id {}", id),
            });
        }
        Err(e) => {
            error!("payment rejection failed: {e}");
            return error_response(e.into());
        }
    };
    let names = match customer_names(&state).await {
        Ok(names) => names,
        Err(resp) => return resp,
    };
    (
        StatusCode::OK,
        Json(json!({"status":"ok","payment": PaymentView::build(payment, &names)})),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct TicketListQuery {
    status: Option<String>,
}

/// GET /admin/tickets?status=open: support tickets, optionally filtered by
/// state, newest first.
pub async fn list_tickets(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TicketListQuery>,
) -> Response {
    if let Err(resp) = page_session(&state, &headers, "/admin/dashboard").await {
        return resp;
    }
    let tickets = match query.status {
        Some(raw) => {
            let Some(status) = parse_ticket_status(&raw) else {
                return error_response(AppError::UserInput {
                    code: "invalid_status".into(),
                    message: format!("unknown ticket status '{}'", raw),
                });
            };
            state.backend.tickets_by_status(status).await
        }
        None => state.backend.tickets().await,
    };
    let tickets = match tickets {
        Ok(rows) => rows,
        Err(e) => {
            error!("ticket list lookup failed: {e}");
            return error_response(e.into());
        }
    };
    let names = match customer_names(&state).await {
        Ok(names) => names,
        Err(resp) => return resp,
    };
    let views: Vec<TicketView> =
        tickets.into_iter().map(|t| TicketView::build(t, &names)).collect();
    (StatusCode::OK, Json(json!({"status":"ok","tickets": views}))).into_response()
}

#[derive(Debug, Deserialize)]
pub struct TicketReplyPayload {
    reply: String,
    #[serde(default)]
    status: Option<String>,
}

/// POST /admin/tickets/{id}/reply: attach the admin reply and move the
/// ticket's state, resolved unless the payload says otherwise.
pub async fn reply_to_ticket(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<TicketReplyPayload>,
) -> Response {
    if let Err(resp) = page_session(&state, &headers, "/admin/dashboard").await {
        return resp;
    }
    if !validate_csrf(&state, &headers).await {
        return csrf_rejection();
    }
    if payload.reply.trim().is_empty() {
        return error_response(AppError::UserInput {
            code: "empty_reply".into(),
            message: "Reply message is required".into(),
        });
    }
    let status = match payload.status.as_deref() {
        Some(raw) => {
            let Some(status) = parse_ticket_status(raw) else {
                return error_response(AppError::UserInput {
                    code: "invalid_status".into(),
                    message: format!("unknown ticket status '{}'", raw),
                });
            };
            status
        }
        None => TicketStatus::Resolved,
    };
    let ticket = match state.backend.reply_ticket(id, payload.reply.trim(), status).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            return error_response(AppError::NotFound {
                code: "not_found".into(),
                message: format!("no ticket with id {}", id),
            });
        }
        Err(e) => {
            error!("ticket reply failed: {e}");
            return error_response(e.into());
        }
    };
    let names = match customer_names(&state).await {
        Ok(names) => names,
        Err(resp) => return resp,
    };
    (
        StatusCode::OK,
        Json(json!({"status":"ok","ticket": TicketView::build(ticket, &names)})),
    )
        .into_response()
}

/// GET /admin/maps: every customer with coordinates, as map points with a
/// maps link per point.
pub async fn customer_map(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = page_session(&state, &headers, "/admin/maps").await {
        return resp;
    }
    let customers = match state.backend.customers().await {
        Ok(rows) => rows,
        Err(e) => {
            error!("customer list lookup failed: {e}");
            return error_response(e.into());
        }
    };
    let today = Local::now().date_naive();
    let points: Vec<MapPointView> = customers
        .into_iter()
        .filter_map(|c| {
            let (latitude, longitude) = match (c.latitude, c.longitude) {
                (Some(lat), Some(lng)) => (lat, lng),
                _ => return None,
            };
            let derived = calculate_customer_status(c.last_payment_date, c.due_date, today);
            Some(MapPointView {
                id: c.id,
                name: c.name,
                invoice_number: c.invoice_number,
                latitude,
                longitude,
                address: c.address,
                derived_status: derived,
                status_category: status_category(derived.as_str()),
                maps_url: maps_url(latitude, longitude),
            })
        })
        .collect();
    let total = points.len();
    (
        StatusCode::OK,
        Json(json!({"status":"ok","points": points, "total": total})),
    )
        .into_response()
}
