//! Typed records for the hosted backend's collections.
//!
//! The backend owns these tables; the portal only reads and writes them over
//! the network API. Money amounts are integer rupiah. Calendar fields are
//! `NaiveDate`; audit timestamps are UTC.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Staff roles as stored in the `users` collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    SuperAdmin,
    Admin,
    Technician,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::SuperAdmin => "super_admin",
            StaffRole::Admin => "admin",
            StaffRole::Technician => "technician",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    Active,
    Overdue,
    Inactive,
}

impl CustomerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Active => "active",
            CustomerStatus::Overdue => "overdue",
            CustomerStatus::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Verified,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Verified => "verified",
            PaymentStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
        }
    }
}

/// Row in the `users` collection (staff accounts only; customers live in
/// their own collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffRecord {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: StaffRole,
    #[serde(default)]
    pub permissions: Option<serde_json::Value>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Row in the `customers` collection. `due_date` is a day-of-month (1..=31);
/// `status` is the last persisted derivation, not necessarily current.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: Uuid,
    pub invoice_number: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub phone: String,
    #[serde(default)]
    pub package_id: Option<Uuid>,
    pub monthly_fee: i64,
    pub due_date: u32,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub address: String,
    pub status: CustomerStatus,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub last_payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row in the `payments` collection. `payment_month` is a `YYYY-MM` label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub invoice_number: String,
    pub amount: i64,
    pub payment_date: NaiveDate,
    pub payment_month: String,
    pub payment_method: String,
    #[serde(default)]
    pub proof_url: Option<String>,
    pub status: PaymentStatus,
    #[serde(default)]
    pub verified_by: Option<Uuid>,
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketRecord {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub category: String,
    pub subject: String,
    pub message: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    #[serde(default)]
    pub admin_reply: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: Uuid,
    pub date: NaiveDate,
    pub category: String,
    pub description: String,
    pub amount: i64,
    #[serde(default)]
    pub vendor: Option<String>,
    pub payment_method: String,
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub receipt_url: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeRecord {
    pub id: Uuid,
    pub date: NaiveDate,
    pub category: String,
    pub description: String,
    pub amount: i64,
    #[serde(default)]
    pub source: Option<String>,
    pub payment_method: String,
    #[serde(default)]
    pub reference_number: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Row in the `packages` collection. Speeds and quota are display strings
/// ("50 Mbps", "unlimited") owned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRecord {
    pub id: Uuid,
    pub name: String,
    pub download_speed: String,
    pub upload_speed: String,
    pub price: i64,
    #[serde(default)]
    pub quota: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingRecord {
    pub id: Uuid,
    pub key: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for `customers`. The backend fills id and audit timestamps;
/// `invoice_number` is assigned by the caller (generation retries on conflict).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomer {
    pub invoice_number: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub phone: String,
    #[serde(default)]
    pub package_id: Option<Uuid>,
    pub monthly_fee: i64,
    pub due_date: u32,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub address: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Field-wise update for `customers`; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_fee: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CustomerStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_payment_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub customer_id: Uuid,
    pub invoice_number: String,
    pub amount: i64,
    pub payment_date: NaiveDate,
    pub payment_month: String,
    pub payment_method: String,
    #[serde(default)]
    pub proof_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTicket {
    pub customer_id: Uuid,
    pub category: String,
    pub subject: String,
    pub message: String,
    pub priority: TicketPriority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    pub date: NaiveDate,
    pub category: String,
    pub description: String,
    pub amount: i64,
    #[serde(default)]
    pub vendor: Option<String>,
    pub payment_method: String,
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub receipt_url: Option<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIncome {
    pub date: NaiveDate,
    pub category: String,
    pub description: String,
    pub amount: i64,
    #[serde(default)]
    pub source: Option<String>,
    pub payment_method: String,
    #[serde(default)]
    pub reference_number: Option<String>,
    pub created_by: Uuid,
}
