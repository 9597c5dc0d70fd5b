//! Formatting and validation utilities
//! -----------------------------------
//! Pure helpers shared by the API handlers and the CLI: Indonesian-locale
//! currency and date rendering, phone normalization to +62, invoice-number
//! generation and validation, customer status derivation, and the status to
//! visual-category mapping used by API clients.
//!
//! Clock-dependent helpers take the date as a parameter; thin `Local`-clock
//! wrappers sit next to them.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::backend::types::CustomerStatus;

const MONTH_NAMES: [&str; 12] = [
    "Januari", "Februari", "Maret", "April", "Mei", "Juni",
    "Juli", "Agustus", "September", "Oktober", "November", "Desember",
];

static INVOICE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^JRN-\d{6}$").unwrap());
static PAYMENT_MONTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").unwrap());

/// Integer rupiah with dot thousand grouping: `Rp 150.000`.
pub fn format_currency(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-Rp {}", grouped)
    } else {
        format!("Rp {}", grouped)
    }
}

/// Long-form date with Indonesian month names: `17 Agustus 2024`.
pub fn format_date(date: NaiveDate) -> String {
    format!("{} {} {}", date.day(), MONTH_NAMES[date.month0() as usize], date.year())
}

/// Date plus the Indonesian two-digit clock: `17 Agustus 2024, 14.30`.
pub fn format_date_time(dt: NaiveDateTime) -> String {
    format!("{}, {:02}.{:02}", format_date(dt.date()), dt.hour(), dt.minute())
}

/// Normalize a phone number to `+62` form: non-digits are stripped, a leading
/// `0` becomes `62`, and a bare national number gets `62` prepended.
pub fn format_phone_number(raw: &str) -> String {
    let mut cleaned: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if let Some(rest) = cleaned.strip_prefix('0') {
        cleaned = format!("62{}", rest);
    } else if !cleaned.starts_with("62") {
        cleaned = format!("62{}", cleaned);
    }
    format!("+{}", cleaned)
}

/// New invoice number from the current local date: `JRN-YYMM` plus a random
/// two-digit suffix. Uniqueness is enforced by the backend, not here; callers
/// retry on conflict.
pub fn generate_invoice_number() -> String {
    invoice_number_with(Local::now().date_naive(), random_suffix())
}

fn random_suffix() -> u8 {
    let mut buf = [0u8; 1];
    let _ = getrandom::getrandom(&mut buf);
    buf[0] % 100
}

fn invoice_number_with(date: NaiveDate, serial: u8) -> String {
    format!("JRN-{:02}{:02}{:02}", date.year() % 100, date.month(), serial)
}

/// Exactly `JRN-` followed by six digits.
pub fn validate_invoice_number(invoice: &str) -> bool {
    INVOICE_RE.is_match(invoice)
}

/// `YYYY-MM` payment-month label.
pub fn validate_payment_month(month: &str) -> bool {
    PAYMENT_MONTH_RE.is_match(month)
}

pub fn month_of(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Derive a customer's current status from their last payment and billing
/// due day:
/// - no payment on record is `inactive`;
/// - a payment on or after this month's due date is `active`;
/// - a payment up to 30 days behind this month's due date is `overdue`
///   (typically last month's bill, this month's still unpaid);
/// - older than that is `inactive`.
pub fn calculate_customer_status(
    last_payment: Option<NaiveDate>,
    due_day: u32,
    today: NaiveDate,
) -> CustomerStatus {
    let Some(last_payment) = last_payment else {
        return CustomerStatus::Inactive;
    };
    let due = due_date_in_month(today.year(), today.month(), due_day);
    if last_payment >= due {
        return CustomerStatus::Active;
    }
    let days_behind = (due - last_payment).num_days();
    if days_behind <= 30 {
        CustomerStatus::Overdue
    } else {
        CustomerStatus::Inactive
    }
}

/// `calculate_customer_status` against the local calendar.
pub fn current_customer_status(last_payment: Option<NaiveDate>, due_day: u32) -> CustomerStatus {
    calculate_customer_status(last_payment, due_day, Local::now().date_naive())
}

// A due day beyond the month's length clamps to the month's last day
// (a due day of 31 falls on 30 April).
fn due_date_in_month(year: i32, month: u32, due_day: u32) -> NaiveDate {
    let day = due_day.clamp(1, 31);
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| last_day_of_month(year, month))
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 28).unwrap())
}

/// Visual category for a record status. API clients render the class string;
/// the category itself is what tests and non-web clients consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCategory {
    Success,
    Warning,
    Danger,
    Info,
    Neutral,
}

impl StatusCategory {
    pub fn css_class(&self) -> &'static str {
        match self {
            StatusCategory::Success => "text-green-600 bg-green-50",
            StatusCategory::Warning => "text-yellow-600 bg-yellow-50",
            StatusCategory::Danger => "text-red-600 bg-red-50",
            StatusCategory::Info => "text-blue-600 bg-blue-50",
            StatusCategory::Neutral => "text-gray-600 bg-gray-50",
        }
    }
}

/// Map a status string from any collection (customer, payment, ticket) to
/// its visual category. Unknown statuses are neutral.
pub fn status_category(status: &str) -> StatusCategory {
    match status {
        "active" | "verified" | "resolved" => StatusCategory::Success,
        "overdue" | "pending" | "in_progress" => StatusCategory::Warning,
        "inactive" | "rejected" => StatusCategory::Danger,
        "open" => StatusCategory::Info,
        "closed" => StatusCategory::Neutral,
        _ => StatusCategory::Neutral,
    }
}

/// External map link for a coordinate pair.
pub fn maps_url(lat: f64, lng: f64) -> String {
    format!("https://www.google.com/maps?q={},{}", lat, lng)
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod format_tests;
