use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::task::JoinHandle;
use uuid::Uuid;

use juronet::backend::types::{NewCustomer, StaffRole};
use juronet::backend::{MemoryBackend, SharedBackend};
use juronet::format::month_of;
use juronet::identity::Identity;

// Full portal round trips: a customer reports a payment, an admin reviews
// it, and both sides observe the derived account status move.

async fn start_portal(backend: Arc<MemoryBackend>) -> (JoinHandle<()>, String) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().expect("local addr");
    let shared: SharedBackend = backend;
    let handle = tokio::spawn(async move {
        if let Err(e) = juronet::server::run_on_listener(listener, shared, Duration::from_secs(3600)).await
        {
            eprintln!("portal server task error: {e:?}");
        }
    });
    (handle, format!("http://{}", addr))
}

struct Guard(JoinHandle<()>);
impl Drop for Guard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("build client")
}

async fn body(resp: reqwest::Response) -> serde_json::Value {
    resp.json().await.expect("json body")
}

struct Portal {
    backend: Arc<MemoryBackend>,
    base: String,
    _guard: Guard,
}

// Backend with one package, one customer on it, and one admin, served on an
// ephemeral port.
async fn portal_with_one_customer() -> Portal {
    let backend = Arc::new(MemoryBackend::new());
    let package = backend.seed_package("Home 20M", "20 Mbps", "5 Mbps", 150_000);
    backend
        .seed_customer(&NewCustomer {
            invoice_number: "JRN-240101".to_string(),
            name: "Andi Pratama".to_string(),
            email: Some("andi@example.com".to_string()),
            phone: "+6281234567001".to_string(),
            package_id: Some(package.id),
            monthly_fee: 150_000,
            // Due on the 1st, so any payment this month makes the account
            // active no matter what day the test runs.
            due_date: 1,
            latitude: None,
            longitude: None,
            address: "Jl. Melati No. 4".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            notes: None,
        })
        .expect("seed customer");
    backend.seed_staff("budi@juron.net.id", "Budi Santoso", StaffRole::Admin);
    let (srv, base) = start_portal(backend.clone()).await;
    Portal { backend, base, _guard: Guard(srv) }
}

// Sign in as the seeded customer; returns (client, csrf token).
async fn customer_session(base: &str) -> (reqwest::Client, String) {
    let c = client();
    let resp = c
        .post(format!("{base}/auth/login/customer"))
        .json(&serde_json::json!({"invoice_number": "JRN-240101", "phone": "081234567001"}))
        .send()
        .await
        .expect("customer login");
    assert_eq!(resp.status(), 200);
    let v = body(c.get(format!("{base}/auth/csrf")).send().await.expect("csrf")).await;
    let csrf = v["csrf"].as_str().expect("csrf token").to_string();
    (c, csrf)
}

// Sign in as the seeded admin; returns (client, csrf token).
async fn staff_session(portal: &Portal) -> (reqwest::Client, String) {
    let token = portal.backend.issue_token(Identity {
        id: Uuid::new_v4(),
        email: "budi@juron.net.id".to_string(),
    });
    let c = client();
    let resp = c
        .post(format!("{}/auth/session", portal.base))
        .json(&serde_json::json!({"access_token": token}))
        .send()
        .await
        .expect("staff sign in");
    assert_eq!(resp.status(), 200);
    let v = body(c.get(format!("{}/auth/csrf", portal.base)).send().await.expect("csrf")).await;
    let csrf = v["csrf"].as_str().expect("csrf token").to_string();
    (c, csrf)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn payment_verification_advances_the_customer_account() {
    let portal = portal_with_one_customer().await;
    let base = portal.base.clone();
    let (cust, cust_csrf) = customer_session(&base).await;

    // Fresh account: no payment on record, so the derived status is inactive.
    let v = body(cust.get(format!("{base}/customer/portal")).send().await.expect("portal")).await;
    assert_eq!(v["portal"]["account"]["derived_status"], "inactive");
    assert_eq!(v["portal"]["package"]["name"], "Home 20M");
    assert_eq!(v["portal"]["recent_payments"].as_array().map(Vec::len), Some(0));

    let month = month_of(Local::now().date_naive());
    let resp = cust
        .post(format!("{base}/customer/payments"))
        .header("x-csrf-token", &cust_csrf)
        .json(&serde_json::json!({
            "amount": 150_000,
            "payment_month": month,
            "payment_method": "transfer",
            "notes": "via BCA",
        }))
        .send()
        .await
        .expect("submit payment");
    assert_eq!(resp.status(), 200);
    let v = body(resp).await;
    assert_eq!(v["payment"]["status"], "pending");
    assert_eq!(v["payment"]["amount_display"], "Rp 150.000");
    assert_eq!(v["payment"]["invoice_number"], "JRN-240101");

    let (staff, staff_csrf) = staff_session(&portal).await;

    // The pending queue is the admin's default payments view.
    let v = body(staff.get(format!("{base}/admin/payments")).send().await.expect("pending")).await;
    let pending = v["payments"].as_array().expect("payments array");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["customer_name"], "Andi Pratama");
    let payment_id = pending[0]["id"].as_str().expect("payment id").to_string();
    let customer_id = pending[0]["customer_id"].as_str().expect("customer id").to_string();

    // Verification is a state change and therefore CSRF-protected.
    let resp = staff
        .post(format!("{base}/admin/payments/{payment_id}/verify"))
        .json(&serde_json::json!({"notes": "cek mutasi"}))
        .send()
        .await
        .expect("verify without csrf");
    assert_eq!(resp.status(), 403);

    let resp = staff
        .post(format!("{base}/admin/payments/{payment_id}/verify"))
        .header("x-csrf-token", &staff_csrf)
        .json(&serde_json::json!({"notes": "cek mutasi"}))
        .send()
        .await
        .expect("verify");
    assert_eq!(resp.status(), 200);
    let v = body(resp).await;
    assert_eq!(v["payment"]["status"], "verified");
    assert!(v["payment"]["verified_by"].is_string(), "verifier must be recorded");
    assert_eq!(v["payment"]["notes"], "cek mutasi");

    // Verification stamps the customer's last payment date, which flips the
    // derived status.
    let today = Local::now().date_naive().to_string();
    let v = body(
        staff.get(format!("{base}/admin/customers/{customer_id}")).send().await.expect("detail"),
    )
    .await;
    assert_eq!(v["customer"]["derived_status"], "active");
    assert_eq!(v["customer"]["last_payment_date"], today);

    let v = body(cust.get(format!("{base}/customer/portal")).send().await.expect("portal")).await;
    assert_eq!(v["portal"]["account"]["derived_status"], "active");
    assert_eq!(v["portal"]["account"]["status_category"], "success");
    assert_eq!(v["portal"]["recent_payments"][0]["status"], "verified");

    // The pending queue is empty again; the verified view holds the record.
    let v = body(staff.get(format!("{base}/admin/payments")).send().await.expect("pending")).await;
    assert_eq!(v["payments"].as_array().map(Vec::len), Some(0));
    let v = body(
        staff
            .get(format!("{base}/admin/payments?status=verified"))
            .send()
            .await
            .expect("verified"),
    )
    .await;
    assert_eq!(v["payments"].as_array().map(Vec::len), Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_payments_leave_the_account_untouched() {
    let portal = portal_with_one_customer().await;
    let base = portal.base.clone();
    let (cust, cust_csrf) = customer_session(&base).await;

    let month = month_of(Local::now().date_naive());
    let resp = cust
        .post(format!("{base}/customer/payments"))
        .header("x-csrf-token", &cust_csrf)
        .json(&serde_json::json!({
            "amount": 150_000,
            "payment_month": month,
            "payment_method": "transfer",
        }))
        .send()
        .await
        .expect("submit payment");
    assert_eq!(resp.status(), 200);

    let (staff, staff_csrf) = staff_session(&portal).await;
    let v = body(staff.get(format!("{base}/admin/payments")).send().await.expect("pending")).await;
    let payment_id = v["payments"][0]["id"].as_str().expect("payment id").to_string();
    let customer_id = v["payments"][0]["customer_id"].as_str().expect("customer id").to_string();

    let resp = staff
        .post(format!("{base}/admin/payments/{payment_id}/reject"))
        .header("x-csrf-token", &staff_csrf)
        .json(&serde_json::json!({"notes": "bukti transfer tidak terbaca"}))
        .send()
        .await
        .expect("reject");
    assert_eq!(resp.status(), 200);
    let v = body(resp).await;
    assert_eq!(v["payment"]["status"], "rejected");
    assert_eq!(v["payment"]["status_category"], "danger");

    let v = body(
        staff.get(format!("{base}/admin/customers/{customer_id}")).send().await.expect("detail"),
    )
    .await;
    assert_eq!(v["customer"]["derived_status"], "inactive");
    assert!(v["customer"]["last_payment_date"].is_null());

    let v = body(cust.get(format!("{base}/customer/portal")).send().await.expect("portal")).await;
    assert_eq!(v["portal"]["account"]["derived_status"], "inactive");
    assert_eq!(v["portal"]["recent_payments"][0]["status"], "rejected");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ticket_reply_round_trip() {
    let portal = portal_with_one_customer().await;
    let base = portal.base.clone();
    let (cust, cust_csrf) = customer_session(&base).await;

    let resp = cust
        .post(format!("{base}/customer/tickets"))
        .header("x-csrf-token", &cust_csrf)
        .json(&serde_json::json!({
            "category": "koneksi",
            "subject": "Internet lambat",
            "message": "Sejak kemarin kecepatan turun jauh.",
        }))
        .send()
        .await
        .expect("open ticket");
    assert_eq!(resp.status(), 200);
    let v = body(resp).await;
    assert_eq!(v["ticket"]["status"], "open");
    assert_eq!(v["ticket"]["priority"], "medium");

    // The new ticket shows among the portal's open tickets.
    let v = body(cust.get(format!("{base}/customer/portal")).send().await.expect("portal")).await;
    assert_eq!(v["portal"]["open_tickets"].as_array().map(Vec::len), Some(1));

    let (staff, staff_csrf) = staff_session(&portal).await;
    let v = body(
        staff.get(format!("{base}/admin/tickets?status=open")).send().await.expect("open tickets"),
    )
    .await;
    let tickets = v["tickets"].as_array().expect("tickets array");
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0]["customer_name"], "Andi Pratama");
    let ticket_id = tickets[0]["id"].as_str().expect("ticket id").to_string();

    let resp = staff
        .post(format!("{base}/admin/tickets/{ticket_id}/reply"))
        .header("x-csrf-token", &staff_csrf)
        .json(&serde_json::json!({"reply": "Sudah kami perbaiki dari sisi BTS."}))
        .send()
        .await
        .expect("reply");
    assert_eq!(resp.status(), 200);
    let v = body(resp).await;
    assert_eq!(v["ticket"]["status"], "resolved");
    assert_eq!(v["ticket"]["admin_reply"], "Sudah kami perbaiki dari sisi BTS.");
    assert!(v["ticket"]["resolved_at"].is_string(), "resolution time must be stamped");

    // The customer sees the reply, and the portal's open list empties.
    let v = body(cust.get(format!("{base}/customer/tickets")).send().await.expect("tickets")).await;
    assert_eq!(v["tickets"][0]["status"], "resolved");
    assert_eq!(v["tickets"][0]["admin_reply"], "Sudah kami perbaiki dari sisi BTS.");
    let v = body(cust.get(format!("{base}/customer/portal")).send().await.expect("portal")).await;
    assert_eq!(v["portal"]["open_tickets"].as_array().map(Vec::len), Some(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn payment_submission_validations() {
    let portal = portal_with_one_customer().await;
    let base = portal.base.clone();
    let (cust, cust_csrf) = customer_session(&base).await;
    let month = month_of(Local::now().date_naive());

    // Without the CSRF token nothing is accepted.
    let resp = cust
        .post(format!("{base}/customer/payments"))
        .json(&serde_json::json!({
            "amount": 150_000, "payment_month": month, "payment_method": "transfer",
        }))
        .send()
        .await
        .expect("submit");
    assert_eq!(resp.status(), 403);
    assert_eq!(body(resp).await["error"], "invalid csrf");

    let cases = [
        (
            serde_json::json!({"amount": 0, "payment_month": month, "payment_method": "transfer"}),
            "invalid_amount",
        ),
        (
            serde_json::json!({"amount": 150_000, "payment_month": "2025-13", "payment_method": "transfer"}),
            "invalid_month",
        ),
        (
            serde_json::json!({"amount": 150_000, "payment_month": month, "payment_method": "  "}),
            "missing_payment_method",
        ),
    ];
    for (payload, code) in cases {
        let resp = cust
            .post(format!("{base}/customer/payments"))
            .header("x-csrf-token", &cust_csrf)
            .json(&payload)
            .send()
            .await
            .expect("submit");
        assert_eq!(resp.status(), 400, "{code}");
        assert_eq!(body(resp).await["code"], code);
    }

    let resp = cust
        .post(format!("{base}/customer/tickets"))
        .header("x-csrf-token", &cust_csrf)
        .json(&serde_json::json!({
            "category": "koneksi", "subject": "Lambat", "message": "turun", "priority": "urgent",
        }))
        .send()
        .await
        .expect("ticket");
    assert_eq!(resp.status(), 400);
    assert_eq!(body(resp).await["code"], "invalid_priority");

    // Nothing invalid was recorded.
    let v = body(cust.get(format!("{base}/customer/payments")).send().await.expect("history")).await;
    assert_eq!(v["payments"].as_array().map(Vec::len), Some(0));
}
