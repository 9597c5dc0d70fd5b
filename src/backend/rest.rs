//! Hosted REST backend
//! -------------------
//! Client for the hosted auth-and-database API. Collections are reached at
//! `{base}/rest/v1/{collection}` with equality filters in the query string,
//! auth endpoints at `{base}/auth/v1/*`. Every request carries the project
//! key; writes ask for `return=representation` so mutations come back as the
//! stored row.
//!
//! Auth change watching is a polling loop over token introspection. The
//! hosted push channel is deliberately not used; at portal scale a poll every
//! few seconds is indistinguishable and much simpler to reason about.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::backend::types::*;
use crate::backend::{
    single_row, AuthBackend, AuthEvent, AuthWatch, BackendError, BackendResult, DataBackend,
};
use crate::identity::Identity;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct RestBackend {
    base: String,
    key: String,
    client: reqwest::Client,
    poll_interval: Duration,
}

impl RestBackend {
    pub fn new(base: impl Into<String>, key: impl Into<String>) -> BackendResult<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base: base.into().trim_end_matches('/').to_string(),
            key: key.into(),
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn rest_url(&self, collection: &str) -> String {
        format!("{}/rest/v1/{}", self.base, collection)
    }

    fn request(&self, method: Method, url: String) -> reqwest::RequestBuilder {
        self.client.request(method, url).header("apikey", &self.key).bearer_auth(&self.key)
    }

    async fn rows<T: DeserializeOwned>(
        &self,
        collection: &str,
        filters: &[(&str, String)],
        order: Option<&str>,
    ) -> BackendResult<Vec<T>> {
        let mut req =
            self.request(Method::GET, self.rest_url(collection)).query(&[("select", "*")]);
        for (field, filter) in filters {
            req = req.query(&[(*field, filter.as_str())]);
        }
        if let Some(order) = order {
            req = req.query(&[("order", order)]);
        }
        self.decode(req.send().await?).await
    }

    async fn row<T: DeserializeOwned>(
        &self,
        collection: &str,
        filters: &[(&str, String)],
    ) -> BackendResult<Option<T>> {
        Ok(single_row(self.rows(collection, filters, None).await?))
    }

    async fn insert<T: DeserializeOwned, B: Serialize>(
        &self,
        collection: &str,
        body: &B,
    ) -> BackendResult<T> {
        let resp = self
            .request(Method::POST, self.rest_url(collection))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let rows: Vec<T> = self.decode(resp).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode(format!("{} insert returned no rows", collection)))
    }

    async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        collection: &str,
        id: Uuid,
        body: &B,
    ) -> BackendResult<Option<T>> {
        let resp = self
            .request(Method::PATCH, self.rest_url(collection))
            .query(&[("id", format!("eq.{}", id).as_str())])
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let rows: Vec<T> = self.decode(resp).await?;
        Ok(rows.into_iter().next())
    }

    async fn decode<T: DeserializeOwned>(&self, resp: reqwest::Response) -> BackendResult<Vec<T>> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if status == StatusCode::CONFLICT {
                return Err(BackendError::Conflict(body));
            }
            return Err(BackendError::Status { status: status.as_u16(), body });
        }
        resp.json::<Vec<T>>().await.map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[derive(Deserialize)]
struct AuthUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Serialize)]
struct PaymentStatusPatch {
    status: PaymentStatus,
    verified_by: Option<Uuid>,
    verified_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

#[derive(Serialize)]
struct TicketReplyPatch {
    admin_reply: String,
    status: TicketStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved_at: Option<DateTime<Utc>>,
}

// First day of the month and of the next month, for range filters over date
// columns.
fn month_bounds(month: &str) -> BackendResult<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d")
        .map_err(|_| BackendError::Decode(format!("malformed month label {:?}", month)))?;
    let end = if start.month() == 12 {
        NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
    };
    let end = end.ok_or_else(|| BackendError::Decode(format!("malformed month label {:?}", month)))?;
    Ok((start, end))
}

#[async_trait]
impl AuthBackend for RestBackend {
    async fn identity_for_token(&self, access_token: &str) -> BackendResult<Option<Identity>> {
        let resp = self
            .client
            .get(format!("{}/auth/v1/user", self.base))
            .header("apikey", &self.key)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status { status: status.as_u16(), body });
        }
        let user: AuthUser =
            resp.json().await.map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Some(Identity { id: user.id, email: user.email.unwrap_or_default() }))
    }

    fn authorize_url(&self, provider: &str, redirect_to: &str) -> String {
        format!(
            "{}/auth/v1/authorize?provider={}&redirect_to={}",
            self.base,
            urlencoding::encode(provider),
            urlencoding::encode(redirect_to)
        )
    }

    async fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        let resp = self
            .client
            .post(format!("{}/auth/v1/logout", self.base))
            .header("apikey", &self.key)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = resp.status();
        // A token that is already dead is a successful sign-out.
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(BackendError::Status { status: status.as_u16(), body })
    }

    async fn watch(&self, access_token: &str) -> AuthWatch {
        let this = self.clone();
        let token = access_token.to_string();
        let (tx, rx) = mpsc::channel(8);
        let interval = self.poll_interval;
        let task = tokio::spawn(async move {
            let mut last = this.identity_for_token(&token).await.unwrap_or(None);
            loop {
                tokio::time::sleep(interval).await;
                match this.identity_for_token(&token).await {
                    Ok(Some(identity)) => {
                        let changed = last
                            .as_ref()
                            .map(|l| l.id != identity.id || l.email != identity.email)
                            .unwrap_or(true);
                        if changed {
                            last = Some(identity.clone());
                            if tx.send(AuthEvent::IdentityChanged(identity)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(None) => {
                        let _ = tx.send(AuthEvent::SignedOut).await;
                        break;
                    }
                    Err(e) => {
                        // Transient transport trouble; keep polling.
                        tracing::debug!(error = %e, "auth poll failed");
                    }
                }
            }
        });
        AuthWatch::new(rx, Some(task))
    }
}

#[async_trait]
impl DataBackend for RestBackend {
    async fn staff_by_email(&self, email: &str) -> BackendResult<Option<StaffRecord>> {
        self.row("users", &[("email", format!("eq.{}", email))]).await
    }

    async fn customer_by_email(&self, email: &str) -> BackendResult<Option<CustomerRecord>> {
        self.row("customers", &[("email", format!("eq.{}", email))]).await
    }

    async fn customer_by_id(&self, id: Uuid) -> BackendResult<Option<CustomerRecord>> {
        self.row("customers", &[("id", format!("eq.{}", id))]).await
    }

    async fn customer_by_invoice_and_phone(
        &self,
        invoice_number: &str,
        phone: &str,
    ) -> BackendResult<Option<CustomerRecord>> {
        self.row(
            "customers",
            &[
                ("invoice_number", format!("eq.{}", invoice_number)),
                ("phone", format!("eq.{}", phone)),
            ],
        )
        .await
    }

    async fn customers(&self) -> BackendResult<Vec<CustomerRecord>> {
        self.rows("customers", &[], Some("created_at.desc")).await
    }

    async fn insert_customer(&self, new: &NewCustomer) -> BackendResult<CustomerRecord> {
        self.insert("customers", new).await
    }

    async fn update_customer(
        &self,
        id: Uuid,
        update: &CustomerUpdate,
    ) -> BackendResult<Option<CustomerRecord>> {
        self.patch("customers", id, update).await
    }

    async fn payments_by_status(&self, status: PaymentStatus) -> BackendResult<Vec<PaymentRecord>> {
        self.rows(
            "payments",
            &[("status", format!("eq.{}", status.as_str()))],
            Some("payment_date.desc"),
        )
        .await
    }

    async fn payments_by_customer(&self, customer_id: Uuid) -> BackendResult<Vec<PaymentRecord>> {
        self.rows(
            "payments",
            &[("customer_id", format!("eq.{}", customer_id))],
            Some("payment_date.desc"),
        )
        .await
    }

    async fn payments_by_month(&self, month: &str) -> BackendResult<Vec<PaymentRecord>> {
        self.rows(
            "payments",
            &[("payment_month", format!("eq.{}", month))],
            Some("payment_date.desc"),
        )
        .await
    }

    async fn insert_payment(&self, new: &NewPayment) -> BackendResult<PaymentRecord> {
        self.insert("payments", new).await
    }

    async fn set_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        verified_by: Option<Uuid>,
        notes: Option<String>,
    ) -> BackendResult<Option<PaymentRecord>> {
        let patch =
            PaymentStatusPatch { status, verified_by, verified_at: Utc::now(), notes };
        self.patch("payments", id, &patch).await
    }

    async fn tickets(&self) -> BackendResult<Vec<TicketRecord>> {
        self.rows("tickets", &[], Some("created_at.desc")).await
    }

    async fn tickets_by_customer(&self, customer_id: Uuid) -> BackendResult<Vec<TicketRecord>> {
        self.rows(
            "tickets",
            &[("customer_id", format!("eq.{}", customer_id))],
            Some("created_at.desc"),
        )
        .await
    }

    async fn tickets_by_status(&self, status: TicketStatus) -> BackendResult<Vec<TicketRecord>> {
        self.rows(
            "tickets",
            &[("status", format!("eq.{}", status.as_str()))],
            Some("created_at.desc"),
        )
        .await
    }

    async fn insert_ticket(&self, new: &NewTicket) -> BackendResult<TicketRecord> {
        self.insert("tickets", new).await
    }

    async fn reply_ticket(
        &self,
        id: Uuid,
        reply: &str,
        status: TicketStatus,
    ) -> BackendResult<Option<TicketRecord>> {
        let resolved_at = match status {
            TicketStatus::Resolved | TicketStatus::Closed => Some(Utc::now()),
            _ => None,
        };
        let patch = TicketReplyPatch { admin_reply: reply.to_string(), status, resolved_at };
        self.patch("tickets", id, &patch).await
    }

    async fn expenses_by_month(&self, month: &str) -> BackendResult<Vec<ExpenseRecord>> {
        let (start, end) = month_bounds(month)?;
        self.rows(
            "expenses",
            &[("date", format!("gte.{}", start)), ("date", format!("lt.{}", end))],
            Some("date.desc"),
        )
        .await
    }

    async fn insert_expense(&self, new: &NewExpense) -> BackendResult<ExpenseRecord> {
        self.insert("expenses", new).await
    }

    async fn income_by_month(&self, month: &str) -> BackendResult<Vec<IncomeRecord>> {
        let (start, end) = month_bounds(month)?;
        self.rows(
            "income",
            &[("date", format!("gte.{}", start)), ("date", format!("lt.{}", end))],
            Some("date.desc"),
        )
        .await
    }

    async fn insert_income(&self, new: &NewIncome) -> BackendResult<IncomeRecord> {
        self.insert("income", new).await
    }

    async fn package_by_id(&self, id: Uuid) -> BackendResult<Option<PackageRecord>> {
        self.row("packages", &[("id", format!("eq.{}", id))]).await
    }

    async fn packages(&self) -> BackendResult<Vec<PackageRecord>> {
        self.rows("packages", &[], Some("price.asc")).await
    }

    async fn setting_by_key(&self, key: &str) -> BackendResult<Option<SettingRecord>> {
        self.row("settings", &[("key", format!("eq.{}", key))]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_escapes_redirect() {
        let backend = RestBackend::new("https://api.juron.net.id/", "anon-key").unwrap();
        let url = backend.authorize_url("google", "https://portal.juron.net.id/admin");
        assert_eq!(
            url,
            "https://api.juron.net.id/auth/v1/authorize?provider=google&redirect_to=https%3A%2F%2Fportal.juron.net.id%2Fadmin"
        );
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let backend = RestBackend::new("https://api.juron.net.id///", "k").unwrap();
        assert_eq!(backend.rest_url("customers"), "https://api.juron.net.id/rest/v1/customers");
    }

    #[test]
    fn month_bounds_cover_the_month() {
        let (start, end) = month_bounds("2024-06").unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
    }

    #[test]
    fn month_bounds_roll_over_december() {
        let (start, end) = month_bounds("2024-12").unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn malformed_month_label_is_rejected() {
        assert!(month_bounds("junk").is_err());
        assert!(month_bounds("2024-13").is_err());
    }
}
