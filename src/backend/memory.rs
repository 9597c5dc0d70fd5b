//! In-memory backend
//! -----------------
//! Table-per-collection backend used by demo mode and the test suite. Data
//! lives in `RwLock`ed vectors, auth tokens in a map, and auth changes fan out
//! over a broadcast bus so `watch` behaves like the hosted API's change feed.
//!
//! Test-only affordances (lookup failure injection, per-email lookup delays)
//! are plain methods so integration tests can drive them through the public
//! surface.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, Local, Utc};
use parking_lot::RwLock;
use serde_json::json;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::backend::types::*;
use crate::backend::{single_row, AuthBackend, AuthEvent, AuthWatch, BackendError, BackendResult, DataBackend};
use crate::format::{current_customer_status, month_of};
use crate::identity::Identity;

pub struct MemoryBackend {
    staff: RwLock<Vec<StaffRecord>>,
    customers: RwLock<Vec<CustomerRecord>>,
    payments: RwLock<Vec<PaymentRecord>>,
    tickets: RwLock<Vec<TicketRecord>>,
    expenses: RwLock<Vec<ExpenseRecord>>,
    income: RwLock<Vec<IncomeRecord>>,
    packages: RwLock<Vec<PackageRecord>>,
    settings: RwLock<Vec<SettingRecord>>,
    tokens: RwLock<HashMap<String, Identity>>,
    auth_bus: broadcast::Sender<(String, AuthEvent)>,
    fail_staff_lookup: AtomicBool,
    fail_customer_lookup: AtomicBool,
    lookup_delays: RwLock<HashMap<String, Duration>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (auth_bus, _) = broadcast::channel(64);
        Self {
            staff: RwLock::new(Vec::new()),
            customers: RwLock::new(Vec::new()),
            payments: RwLock::new(Vec::new()),
            tickets: RwLock::new(Vec::new()),
            expenses: RwLock::new(Vec::new()),
            income: RwLock::new(Vec::new()),
            packages: RwLock::new(Vec::new()),
            settings: RwLock::new(Vec::new()),
            tokens: RwLock::new(HashMap::new()),
            auth_bus,
            fail_staff_lookup: AtomicBool::new(false),
            fail_customer_lookup: AtomicBool::new(false),
            lookup_delays: RwLock::new(HashMap::new()),
        }
    }

    // ---- auth helpers ------------------------------------------------------

    /// Mint an access token bound to this identity.
    pub fn issue_token(&self, identity: Identity) -> String {
        let token = format!("tok-{}", Uuid::new_v4());
        self.tokens.write().insert(token.clone(), identity);
        token
    }

    /// Rebind an existing token to a new identity and announce the change.
    pub fn rebind_token(&self, token: &str, identity: Identity) {
        self.tokens.write().insert(token.to_string(), identity.clone());
        let _ = self.auth_bus.send((token.to_string(), AuthEvent::IdentityChanged(identity)));
    }

    /// Drop a token and announce the sign-out.
    pub fn revoke_token(&self, token: &str) {
        self.tokens.write().remove(token);
        let _ = self.auth_bus.send((token.to_string(), AuthEvent::SignedOut));
    }

    // ---- test controls -----------------------------------------------------

    pub fn fail_staff_lookups(&self, fail: bool) {
        self.fail_staff_lookup.store(fail, Ordering::SeqCst);
    }

    pub fn fail_customer_lookups(&self, fail: bool) {
        self.fail_customer_lookup.store(fail, Ordering::SeqCst);
    }

    /// Delay lookups for one email, so tests can order concurrent resolutions.
    pub fn set_lookup_delay(&self, email: &str, delay: Duration) {
        self.lookup_delays.write().insert(email.to_string(), delay);
    }

    async fn apply_lookup_delay(&self, email: &str) {
        let delay = self.lookup_delays.read().get(email).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    // ---- seeding -----------------------------------------------------------

    pub fn seed_staff(&self, email: &str, full_name: &str, role: StaffRole) -> StaffRecord {
        let record = StaffRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            full_name: full_name.to_string(),
            role,
            permissions: None,
            is_active: true,
            created_at: Utc::now(),
        };
        self.staff.write().push(record.clone());
        record
    }

    pub fn seed_customer(&self, new: &NewCustomer) -> BackendResult<CustomerRecord> {
        self.insert_customer_sync(new)
    }

    pub fn seed_package(&self, name: &str, download: &str, upload: &str, price: i64) -> PackageRecord {
        let record = PackageRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            download_speed: download.to_string(),
            upload_speed: upload.to_string(),
            price,
            quota: None,
            description: None,
            is_active: true,
            created_at: Utc::now(),
        };
        self.packages.write().push(record.clone());
        record
    }

    pub fn seed_setting(&self, key: &str, value: serde_json::Value) -> SettingRecord {
        let record = SettingRecord {
            id: Uuid::new_v4(),
            key: key.to_string(),
            value,
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.settings.write().push(record.clone());
        record
    }

    /// A small populated dataset for demo mode: three staff accounts, three
    /// service packages, customers across every derived status, and enough
    /// payments, tickets, and book entries for every screen to show data.
    pub fn with_demo_data() -> BackendResult<Self> {
        let backend = Self::new();
        let today = Local::now().date_naive();
        let now = Utc::now();

        backend.seed_staff("owner@juron.net.id", "Siti Rahayu", StaffRole::SuperAdmin);
        let admin = backend.seed_staff("admin@juron.net.id", "Budi Santoso", StaffRole::Admin);
        backend.seed_staff("teknisi@juron.net.id", "Agus Wijaya", StaffRole::Technician);

        let rumah20 = backend.seed_package("Rumah 20", "20 Mbps", "10 Mbps", 150_000);
        let rumah50 = backend.seed_package("Rumah 50", "50 Mbps", "25 Mbps", 250_000);
        backend.seed_package("Bisnis 100", "100 Mbps", "50 Mbps", 450_000);

        backend.seed_setting(
            "company_profile",
            json!({"name": "Juron.Net", "phone": "+62811223344", "address": "Jl. Merdeka No. 1"}),
        );

        // Due day 1 with a payment today derives active on any calendar day.
        let andi = backend
            .seed_customer(&NewCustomer {
                invoice_number: "JRN-240101".to_string(),
                name: "Andi Pratama".to_string(),
                email: Some("andi@example.com".to_string()),
                phone: "+6281234567001".to_string(),
                package_id: Some(rumah20.id),
                monthly_fee: 150_000,
                due_date: 1,
                latitude: Some(-6.2001),
                longitude: Some(106.8166),
                address: "Jl. Sudirman No. 12, Jakarta".to_string(),
                start_date: today - chrono::Days::new(200),
                notes: None,
            })?;
        backend.record_payment_paid(&andi, today, &admin);

        // Last payment just short of this month's due date derives overdue
        // on any calendar day.
        let dewi = backend
            .seed_customer(&NewCustomer {
                invoice_number: "JRN-240102".to_string(),
                name: "Dewi Lestari".to_string(),
                email: Some("dewi@example.com".to_string()),
                phone: "+6281234567002".to_string(),
                package_id: Some(rumah50.id),
                monthly_fee: 250_000,
                due_date: 28,
                latitude: Some(-6.1745),
                longitude: Some(106.8227),
                address: "Jl. Gajah Mada No. 88, Jakarta".to_string(),
                start_date: today - chrono::Days::new(400),
                notes: Some("langganan lama".to_string()),
            })?;
        let dewi_due = today.with_day(28).unwrap_or(today);
        backend.record_payment_paid(&dewi, dewi_due.min(today) - chrono::Days::new(1), &admin);

        // Never paid, no coordinates.
        backend
            .seed_customer(&NewCustomer {
                invoice_number: "JRN-240203".to_string(),
                name: "Rudi Hartono".to_string(),
                email: Some("rudi@example.com".to_string()),
                phone: "+6281234567003".to_string(),
                package_id: Some(rumah20.id),
                monthly_fee: 150_000,
                due_date: 15,
                latitude: None,
                longitude: None,
                address: "Jl. Diponegoro No. 5, Bekasi".to_string(),
                start_date: today - chrono::Days::new(30),
                notes: None,
            })?;

        let maya = backend
            .seed_customer(&NewCustomer {
                invoice_number: "JRN-240204".to_string(),
                name: "Maya Sari".to_string(),
                email: Some("maya@example.com".to_string()),
                phone: "+6281234567004".to_string(),
                package_id: Some(rumah50.id),
                monthly_fee: 250_000,
                due_date: 1,
                latitude: Some(-7.2575),
                longitude: Some(112.7521),
                address: "Jl. Pemuda No. 31, Surabaya".to_string(),
                start_date: today - chrono::Days::new(90),
                notes: None,
            })?;

        // A submitted proof waiting for verification.
        backend.payments.write().push(PaymentRecord {
            id: Uuid::new_v4(),
            customer_id: maya.id,
            invoice_number: maya.invoice_number.clone(),
            amount: maya.monthly_fee,
            payment_date: today,
            payment_month: month_of(today),
            payment_method: "transfer".to_string(),
            proof_url: Some("https://files.juron.net.id/proof/maya-transfer.jpg".to_string()),
            status: PaymentStatus::Pending,
            verified_by: None,
            verified_at: None,
            notes: None,
            created_at: now,
        });

        backend.tickets.write().push(TicketRecord {
            id: Uuid::new_v4(),
            customer_id: dewi.id,
            category: "koneksi".to_string(),
            subject: "Internet lambat sejak kemarin".to_string(),
            message: "Kecepatan turun jauh di bawah paket, mohon dicek.".to_string(),
            status: TicketStatus::Open,
            priority: TicketPriority::High,
            admin_reply: None,
            created_at: now,
            resolved_at: None,
        });
        backend.tickets.write().push(TicketRecord {
            id: Uuid::new_v4(),
            customer_id: andi.id,
            category: "perangkat".to_string(),
            subject: "Router sering restart".to_string(),
            message: "Router restart sendiri beberapa kali sehari.".to_string(),
            status: TicketStatus::Resolved,
            priority: TicketPriority::Medium,
            admin_reply: Some("Router sudah diganti, mohon dipantau.".to_string()),
            created_at: now,
            resolved_at: Some(now),
        });

        backend.expenses.write().push(ExpenseRecord {
            id: Uuid::new_v4(),
            date: today - chrono::Days::new(3),
            category: "peralatan".to_string(),
            description: "Kabel fiber 100m".to_string(),
            amount: 850_000,
            vendor: Some("Toko Jaya Teknik".to_string()),
            payment_method: "cash".to_string(),
            reference_number: Some("EXP-0042".to_string()),
            receipt_url: None,
            created_by: admin.id,
            created_at: now,
        });
        backend.income.write().push(IncomeRecord {
            id: Uuid::new_v4(),
            date: today - chrono::Days::new(5),
            category: "pemasangan".to_string(),
            description: "Biaya pemasangan baru".to_string(),
            amount: 300_000,
            source: Some("Maya Sari".to_string()),
            payment_method: "transfer".to_string(),
            reference_number: None,
            created_by: admin.id,
            created_at: now,
        });

        Ok(backend)
    }

    // Verified payment plus the customer's advanced last-payment date, the
    // same shape the verify endpoint leaves behind.
    fn record_payment_paid(&self, customer: &CustomerRecord, date: chrono::NaiveDate, verifier: &StaffRecord) {
        self.payments.write().push(PaymentRecord {
            id: Uuid::new_v4(),
            customer_id: customer.id,
            invoice_number: customer.invoice_number.clone(),
            amount: customer.monthly_fee,
            payment_date: date,
            payment_month: month_of(date),
            payment_method: "transfer".to_string(),
            proof_url: None,
            status: PaymentStatus::Verified,
            verified_by: Some(verifier.id),
            verified_at: Some(Utc::now()),
            notes: None,
            created_at: Utc::now(),
        });
        let mut customers = self.customers.write();
        if let Some(row) = customers.iter_mut().find(|c| c.id == customer.id) {
            row.last_payment_date = Some(date);
            row.status = current_customer_status(Some(date), row.due_date);
        }
    }

    fn insert_customer_sync(&self, new: &NewCustomer) -> BackendResult<CustomerRecord> {
        let mut customers = self.customers.write();
        if customers.iter().any(|c| c.invoice_number == new.invoice_number) {
            return Err(BackendError::Conflict(format!(
                "duplicate key value violates unique constraint on invoice_number ({})",
                new.invoice_number
            )));
        }
        let now = Utc::now();
        let record = CustomerRecord {
            id: Uuid::new_v4(),
            invoice_number: new.invoice_number.clone(),
            name: new.name.clone(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            package_id: new.package_id,
            monthly_fee: new.monthly_fee,
            due_date: new.due_date,
            latitude: new.latitude,
            longitude: new.longitude,
            address: new.address.clone(),
            status: CustomerStatus::Active,
            start_date: new.start_date,
            last_payment_date: None,
            notes: new.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        customers.push(record.clone());
        Ok(record)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn newest_payments_first(mut payments: Vec<PaymentRecord>) -> Vec<PaymentRecord> {
    payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
    payments
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    async fn identity_for_token(&self, access_token: &str) -> BackendResult<Option<Identity>> {
        Ok(self.tokens.read().get(access_token).cloned())
    }

    fn authorize_url(&self, provider: &str, redirect_to: &str) -> String {
        format!(
            "memory://authorize?provider={}&redirect_to={}",
            urlencoding::encode(provider),
            urlencoding::encode(redirect_to)
        )
    }

    async fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        self.revoke_token(access_token);
        Ok(())
    }

    async fn watch(&self, access_token: &str) -> AuthWatch {
        let mut bus = self.auth_bus.subscribe();
        let token = access_token.to_string();
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(async move {
            loop {
                match bus.recv().await {
                    Ok((event_token, event)) => {
                        if event_token == token && tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        AuthWatch::new(rx, Some(task))
    }
}

#[async_trait]
impl DataBackend for MemoryBackend {
    async fn staff_by_email(&self, email: &str) -> BackendResult<Option<StaffRecord>> {
        self.apply_lookup_delay(email).await;
        if self.fail_staff_lookup.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("injected staff lookup failure".to_string()));
        }
        let matches: Vec<StaffRecord> =
            self.staff.read().iter().filter(|s| s.email == email).cloned().collect();
        Ok(single_row(matches))
    }

    async fn customer_by_email(&self, email: &str) -> BackendResult<Option<CustomerRecord>> {
        self.apply_lookup_delay(email).await;
        if self.fail_customer_lookup.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("injected customer lookup failure".to_string()));
        }
        let matches: Vec<CustomerRecord> = self
            .customers
            .read()
            .iter()
            .filter(|c| c.email.as_deref() == Some(email))
            .cloned()
            .collect();
        Ok(single_row(matches))
    }

    async fn customer_by_id(&self, id: Uuid) -> BackendResult<Option<CustomerRecord>> {
        Ok(self.customers.read().iter().find(|c| c.id == id).cloned())
    }

    async fn customer_by_invoice_and_phone(
        &self,
        invoice_number: &str,
        phone: &str,
    ) -> BackendResult<Option<CustomerRecord>> {
        if self.fail_customer_lookup.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("injected customer lookup failure".to_string()));
        }
        let matches: Vec<CustomerRecord> = self
            .customers
            .read()
            .iter()
            .filter(|c| c.invoice_number == invoice_number && c.phone == phone)
            .cloned()
            .collect();
        Ok(single_row(matches))
    }

    async fn customers(&self) -> BackendResult<Vec<CustomerRecord>> {
        let mut customers = self.customers.read().clone();
        customers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(customers)
    }

    async fn insert_customer(&self, new: &NewCustomer) -> BackendResult<CustomerRecord> {
        self.insert_customer_sync(new)
    }

    async fn update_customer(
        &self,
        id: Uuid,
        update: &CustomerUpdate,
    ) -> BackendResult<Option<CustomerRecord>> {
        let mut customers = self.customers.write();
        let Some(row) = customers.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(name) = &update.name {
            row.name = name.clone();
        }
        if let Some(email) = &update.email {
            row.email = Some(email.clone());
        }
        if let Some(phone) = &update.phone {
            row.phone = phone.clone();
        }
        if let Some(package_id) = update.package_id {
            row.package_id = Some(package_id);
        }
        if let Some(monthly_fee) = update.monthly_fee {
            row.monthly_fee = monthly_fee;
        }
        if let Some(due_date) = update.due_date {
            row.due_date = due_date;
        }
        if let Some(latitude) = update.latitude {
            row.latitude = Some(latitude);
        }
        if let Some(longitude) = update.longitude {
            row.longitude = Some(longitude);
        }
        if let Some(address) = &update.address {
            row.address = address.clone();
        }
        if let Some(status) = update.status {
            row.status = status;
        }
        if let Some(last_payment_date) = update.last_payment_date {
            row.last_payment_date = Some(last_payment_date);
        }
        if let Some(notes) = &update.notes {
            row.notes = Some(notes.clone());
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn payments_by_status(&self, status: PaymentStatus) -> BackendResult<Vec<PaymentRecord>> {
        let payments: Vec<PaymentRecord> =
            self.payments.read().iter().filter(|p| p.status == status).cloned().collect();
        Ok(newest_payments_first(payments))
    }

    async fn payments_by_customer(&self, customer_id: Uuid) -> BackendResult<Vec<PaymentRecord>> {
        let payments: Vec<PaymentRecord> = self
            .payments
            .read()
            .iter()
            .filter(|p| p.customer_id == customer_id)
            .cloned()
            .collect();
        Ok(newest_payments_first(payments))
    }

    async fn payments_by_month(&self, month: &str) -> BackendResult<Vec<PaymentRecord>> {
        let payments: Vec<PaymentRecord> =
            self.payments.read().iter().filter(|p| p.payment_month == month).cloned().collect();
        Ok(newest_payments_first(payments))
    }

    async fn insert_payment(&self, new: &NewPayment) -> BackendResult<PaymentRecord> {
        let record = PaymentRecord {
            id: Uuid::new_v4(),
            customer_id: new.customer_id,
            invoice_number: new.invoice_number.clone(),
            amount: new.amount,
            payment_date: new.payment_date,
            payment_month: new.payment_month.clone(),
            payment_method: new.payment_method.clone(),
            proof_url: new.proof_url.clone(),
            status: PaymentStatus::Pending,
            verified_by: None,
            verified_at: None,
            notes: new.notes.clone(),
            created_at: Utc::now(),
        };
        self.payments.write().push(record.clone());
        Ok(record)
    }

    async fn set_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        verified_by: Option<Uuid>,
        notes: Option<String>,
    ) -> BackendResult<Option<PaymentRecord>> {
        let mut payments = self.payments.write();
        let Some(row) = payments.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        row.status = status;
        row.verified_by = verified_by;
        row.verified_at = Some(Utc::now());
        if notes.is_some() {
            row.notes = notes;
        }
        Ok(Some(row.clone()))
    }

    async fn tickets(&self) -> BackendResult<Vec<TicketRecord>> {
        let mut tickets = self.tickets.read().clone();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    async fn tickets_by_customer(&self, customer_id: Uuid) -> BackendResult<Vec<TicketRecord>> {
        let mut tickets: Vec<TicketRecord> = self
            .tickets
            .read()
            .iter()
            .filter(|t| t.customer_id == customer_id)
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    async fn tickets_by_status(&self, status: TicketStatus) -> BackendResult<Vec<TicketRecord>> {
        let mut tickets: Vec<TicketRecord> =
            self.tickets.read().iter().filter(|t| t.status == status).cloned().collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    async fn insert_ticket(&self, new: &NewTicket) -> BackendResult<TicketRecord> {
        let record = TicketRecord {
            id: Uuid::new_v4(),
            customer_id: new.customer_id,
            category: new.category.clone(),
            subject: new.subject.clone(),
            message: new.message.clone(),
            status: TicketStatus::Open,
            priority: new.priority,
            admin_reply: None,
            created_at: Utc::now(),
            resolved_at: None,
        };
        self.tickets.write().push(record.clone());
        Ok(record)
    }

    async fn reply_ticket(
        &self,
        id: Uuid,
        reply: &str,
        status: TicketStatus,
    ) -> BackendResult<Option<TicketRecord>> {
        let mut tickets = self.tickets.write();
        let Some(row) = tickets.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        row.admin_reply = Some(reply.to_string());
        row.status = status;
        if status == TicketStatus::Resolved || status == TicketStatus::Closed {
            row.resolved_at = Some(Utc::now());
        }
        Ok(Some(row.clone()))
    }

    async fn expenses_by_month(&self, month: &str) -> BackendResult<Vec<ExpenseRecord>> {
        let mut expenses: Vec<ExpenseRecord> = self
            .expenses
            .read()
            .iter()
            .filter(|e| month_of(e.date) == month)
            .cloned()
            .collect();
        expenses.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(expenses)
    }

    async fn insert_expense(&self, new: &NewExpense) -> BackendResult<ExpenseRecord> {
        let record = ExpenseRecord {
            id: Uuid::new_v4(),
            date: new.date,
            category: new.category.clone(),
            description: new.description.clone(),
            amount: new.amount,
            vendor: new.vendor.clone(),
            payment_method: new.payment_method.clone(),
            reference_number: new.reference_number.clone(),
            receipt_url: new.receipt_url.clone(),
            created_by: new.created_by,
            created_at: Utc::now(),
        };
        self.expenses.write().push(record.clone());
        Ok(record)
    }

    async fn income_by_month(&self, month: &str) -> BackendResult<Vec<IncomeRecord>> {
        let mut income: Vec<IncomeRecord> =
            self.income.read().iter().filter(|i| month_of(i.date) == month).cloned().collect();
        income.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(income)
    }

    async fn insert_income(&self, new: &NewIncome) -> BackendResult<IncomeRecord> {
        let record = IncomeRecord {
            id: Uuid::new_v4(),
            date: new.date,
            category: new.category.clone(),
            description: new.description.clone(),
            amount: new.amount,
            source: new.source.clone(),
            payment_method: new.payment_method.clone(),
            reference_number: new.reference_number.clone(),
            created_by: new.created_by,
            created_at: Utc::now(),
        };
        self.income.write().push(record.clone());
        Ok(record)
    }

    async fn package_by_id(&self, id: Uuid) -> BackendResult<Option<PackageRecord>> {
        Ok(self.packages.read().iter().find(|p| p.id == id).cloned())
    }

    async fn packages(&self) -> BackendResult<Vec<PackageRecord>> {
        Ok(self.packages.read().clone())
    }

    async fn setting_by_key(&self, key: &str) -> BackendResult<Option<SettingRecord>> {
        Ok(self.settings.read().iter().find(|s| s.key == key).cloned())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod memory_tests;
