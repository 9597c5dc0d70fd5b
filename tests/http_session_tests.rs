use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::task::JoinHandle;
use uuid::Uuid;

use juronet::backend::types::{NewCustomer, StaffRole};
use juronet::backend::{MemoryBackend, SharedBackend};
use juronet::identity::Identity;

// Start the portal server bound to an ephemeral localhost port. Returns
// (join_handle, base_url). Caller should abort the handle to stop the server.
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

// Cookie-holding client that does not follow redirects, so 303 responses
// stay observable.
fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("build client")
}

fn identity(email: &str) -> Identity {
    Identity { id: Uuid::new_v4(), email: email.to_string() }
}

fn new_customer(invoice: &str, phone: &str) -> NewCustomer {
    NewCustomer {
        invoice_number: invoice.to_string(),
        name: "Andi Pratama".to_string(),
        email: Some("andi@example.com".to_string()),
        phone: phone.to_string(),
        package_id: None,
        monthly_fee: 150_000,
        due_date: 1,
        latitude: None,
        longitude: None,
        address: "Jl. Melati No. 4".to_string(),
        start_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        notes: None,
    }
}

async fn body(resp: reqwest::Response) -> serde_json::Value {
    resp.json().await.expect("json body")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn staff_token_exchange_sets_cookie_and_resolves_role() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed_staff("siti@juron.net.id", "Siti Rahayu", StaffRole::SuperAdmin);
    let token = backend.issue_token(identity("siti@juron.net.id"));
    let (srv, base) = start_portal(backend).await;
    let _g = Guard(srv);

    let c = client();
    let resp = c
        .post(format!("{base}/auth/session"))
        .json(&serde_json::json!({"access_token": token}))
        .send()
        .await
        .expect("sign in");
    assert_eq!(resp.status(), 200);
    let cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("session cookie")
        .to_string();
    assert!(cookie.starts_with("juronet_session="), "unexpected cookie: {cookie}");
    assert!(cookie.contains("HttpOnly"), "cookie must be http-only: {cookie}");
    let v = body(resp).await;
    assert_eq!(v["status"], "ok");
    assert_eq!(v["session"]["role"], "super_admin");
    assert_eq!(v["session"]["full_name"], "Siti Rahayu");

    let v = body(c.get(format!("{base}/auth/session")).send().await.expect("state")).await;
    assert_eq!(v["state"], "signed_in");
    assert_eq!(v["session"]["email"], "siti@juron.net.id");

    let resp = c.get(format!("{base}/admin/dashboard")).send().await.expect("dashboard");
    assert_eq!(resp.status(), 200);
    let v = body(resp).await;
    assert!(v["dashboard"]["total_customers"].is_number());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_token_is_unauthorized() {
    let backend = Arc::new(MemoryBackend::new());
    let (srv, base) = start_portal(backend).await;
    let _g = Guard(srv);

    let resp = client()
        .post(format!("{base}/auth/session"))
        .json(&serde_json::json!({"access_token": "tok-nope"}))
        .send()
        .await
        .expect("sign in");
    assert_eq!(resp.status(), 401);
    assert_eq!(body(resp).await["status"], "unauthorized");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn identity_without_account_gets_no_cookie() {
    let backend = Arc::new(MemoryBackend::new());
    let token = backend.issue_token(identity("ghost@example.com"));
    let (srv, base) = start_portal(backend).await;
    let _g = Guard(srv);

    let c = client();
    let resp = c
        .post(format!("{base}/auth/session"))
        .json(&serde_json::json!({"access_token": token}))
        .send()
        .await
        .expect("sign in");
    assert_eq!(resp.status(), 403);
    let v = body(resp).await;
    assert_eq!(v["code"], "no_account");

    // No portal session was created for the rejected identity.
    let resp = c.get(format!("{base}/auth/session")).send().await.expect("state");
    assert_eq!(resp.status(), 401);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn lookup_failure_fails_closed_with_backend_status() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed_customer(&new_customer("JRN-240101", "+6281234567001")).expect("seed");
    let token = backend.issue_token(identity("andi@example.com"));
    backend.fail_customer_lookups(true);
    let (srv, base) = start_portal(backend).await;
    let _g = Guard(srv);

    let resp = client()
        .post(format!("{base}/auth/session"))
        .json(&serde_json::json!({"access_token": token}))
        .send()
        .await
        .expect("sign in");
    assert_eq!(resp.status(), 502);
    assert_eq!(body(resp).await["code"], "resolution_failed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invoice_format_is_checked_before_any_lookup() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed_customer(&new_customer("JRN-240101", "+6281234567001")).expect("seed");
    // With lookups failing, only a request that never reaches the backend can
    // come back as a validation error.
    backend.fail_customer_lookups(true);
    let (srv, base) = start_portal(backend).await;
    let _g = Guard(srv);

    let c = client();
    let resp = c
        .post(format!("{base}/auth/login/customer"))
        .json(&serde_json::json!({"invoice_number": "BAD-1", "phone": "081234567001"}))
        .send()
        .await
        .expect("login");
    assert_eq!(resp.status(), 400);
    let v = body(resp).await;
    assert_eq!(v["code"], "invalid_invoice_format");
    assert_eq!(v["message"], "Invalid invoice number format. Use JRN-XXXXXX");

    let resp = c
        .post(format!("{base}/auth/login/customer"))
        .json(&serde_json::json!({"invoice_number": "JRN-240101", "phone": "081234567001"}))
        .send()
        .await
        .expect("login");
    assert_eq!(resp.status(), 502, "a well-formed invoice reaches the failing backend");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn customer_login_normalizes_the_phone_number() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed_customer(&new_customer("JRN-240101", "+6281234567001")).expect("seed");
    let (srv, base) = start_portal(backend).await;
    let _g = Guard(srv);

    let c = client();
    // Stored as +62..., submitted in local 08... form.
    let resp = c
        .post(format!("{base}/auth/login/customer"))
        .json(&serde_json::json!({"invoice_number": "JRN-240101", "phone": "0812-3456-7001"}))
        .send()
        .await
        .expect("login");
    assert_eq!(resp.status(), 200);
    let v = body(resp).await;
    assert_eq!(v["session"]["role"], "customer");
    assert_eq!(v["session"]["invoice_number"], "JRN-240101");

    let resp = c
        .post(format!("{base}/auth/login/customer"))
        .json(&serde_json::json!({"invoice_number": "JRN-240101", "phone": "081299999999"}))
        .send()
        .await
        .expect("login");
    assert_eq!(resp.status(), 401);
    let v = body(resp).await;
    assert_eq!(v["code"], "invalid_credentials");
    assert_eq!(v["message"], "Invalid invoice number or phone number");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn logout_requires_the_csrf_token() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed_customer(&new_customer("JRN-240101", "+6281234567001")).expect("seed");
    let (srv, base) = start_portal(backend).await;
    let _g = Guard(srv);

    let c = client();
    let resp = c
        .post(format!("{base}/auth/login/customer"))
        .json(&serde_json::json!({"invoice_number": "JRN-240101", "phone": "081234567001"}))
        .send()
        .await
        .expect("login");
    assert_eq!(resp.status(), 200);

    let resp = c.post(format!("{base}/auth/logout")).send().await.expect("logout");
    assert_eq!(resp.status(), 403);
    assert_eq!(body(resp).await["error"], "invalid csrf");

    let v = body(c.get(format!("{base}/auth/csrf")).send().await.expect("csrf")).await;
    let csrf = v["csrf"].as_str().expect("csrf token").to_string();

    let resp = c
        .post(format!("{base}/auth/logout"))
        .header("x-csrf-token", &csrf)
        .send()
        .await
        .expect("logout");
    assert_eq!(resp.status(), 200);

    let resp = c.get(format!("{base}/auth/session")).send().await.expect("state");
    assert_eq!(resp.status(), 401, "session must be gone after logout");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn role_gate_redirects_are_visible_as_303() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed_staff("budi@juron.net.id", "Budi Santoso", StaffRole::Admin);
    backend.seed_customer(&new_customer("JRN-240101", "+6281234567001")).expect("seed");
    let token = backend.issue_token(identity("budi@juron.net.id"));
    let (srv, base) = start_portal(backend).await;
    let _g = Guard(srv);

    // Anonymous client.
    let anon = client();
    let resp = anon.get(format!("{base}/admin/customers")).send().await.expect("get");
    assert_eq!(resp.status(), 303);
    assert_eq!(resp.headers()["location"], "/admin/login");
    let resp = anon.get(format!("{base}/does-not-exist")).send().await.expect("get");
    assert_eq!(resp.status(), 303);
    assert_eq!(resp.headers()["location"], "/");
    assert_eq!(body(resp).await["status"], "redirect");

    // Customer hitting the admin area.
    let cust = client();
    let resp = cust
        .post(format!("{base}/auth/login/customer"))
        .json(&serde_json::json!({"invoice_number": "JRN-240101", "phone": "081234567001"}))
        .send()
        .await
        .expect("login");
    assert_eq!(resp.status(), 200);
    let resp = cust.get(format!("{base}/admin/dashboard")).send().await.expect("get");
    assert_eq!(resp.status(), 303);
    assert_eq!(resp.headers()["location"], "/admin/login");

    // Staff hitting the customer portal.
    let staff = client();
    let resp = staff
        .post(format!("{base}/auth/session"))
        .json(&serde_json::json!({"access_token": token}))
        .send()
        .await
        .expect("sign in");
    assert_eq!(resp.status(), 200);
    let resp = staff.get(format!("{base}/customer/portal")).send().await.expect("get");
    assert_eq!(resp.status(), 303);
    assert_eq!(resp.headers()["location"], "/customer/login");

    // Unrecognized admin page for entitled staff falls back to the dashboard.
    let resp = staff.get(format!("{base}/admin/settings")).send().await.expect("get");
    assert_eq!(resp.status(), 303);
    assert_eq!(resp.headers()["location"], "/admin/dashboard");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn public_pages_render_without_a_session() {
    let backend = Arc::new(MemoryBackend::new());
    let (srv, base) = start_portal(backend).await;
    let _g = Guard(srv);

    let c = client();
    for page in ["/customer/login", "/admin/login"] {
        let resp = c.get(format!("{base}{page}")).send().await.expect("get");
        assert_eq!(resp.status(), 200, "{page}");
    }
    let resp = c.get(format!("{base}/")).send().await.expect("root");
    assert_eq!(resp.status(), 200);
    let text = resp.text().await.expect("text");
    assert!(text.starts_with("juronet ok"), "unexpected landing body: {text}");
    assert!(text.contains("/customer/login") && text.contains("/admin/login"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn identity_rebind_re_resolves_without_dropping_requests() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed_staff("siti@juron.net.id", "Siti Rahayu", StaffRole::SuperAdmin);
    backend.seed_staff("agus@juron.net.id", "Agus Wijaya", StaffRole::Technician);
    backend.set_lookup_delay("agus@juron.net.id", Duration::from_millis(150));
    let token = backend.issue_token(identity("siti@juron.net.id"));
    let (srv, base) = start_portal(backend.clone()).await;
    let _g = Guard(srv);

    let c = client();
    let resp = c
        .post(format!("{base}/auth/session"))
        .json(&serde_json::json!({"access_token": token}))
        .send()
        .await
        .expect("sign in");
    assert_eq!(resp.status(), 200);

    // The provider swaps the token's identity; the watcher re-resolves it on
    // a deliberately slow lookup.
    backend.rebind_token(&token, identity("agus@juron.net.id"));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let v = body(c.get(format!("{base}/auth/session")).send().await.expect("state")).await;
    assert_eq!(v["state"], "resolving", "watcher should have restarted resolution");

    // A page request during the window waits out the resolution instead of
    // flashing a redirect.
    let resp = c.get(format!("{base}/admin/dashboard")).send().await.expect("dashboard");
    assert_eq!(resp.status(), 200);

    let v = body(c.get(format!("{base}/auth/session")).send().await.expect("state")).await;
    assert_eq!(v["state"], "signed_in");
    assert_eq!(v["session"]["email"], "agus@juron.net.id");

    // Revoking the token signs the session out through the same feed.
    backend.revoke_token(&token);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let resp = c.get(format!("{base}/auth/session")).send().await.expect("state");
        if resp.status() == 401 {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "sign-out never reached the session");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let resp = c.get(format!("{base}/admin/dashboard")).send().await.expect("dashboard");
    assert_eq!(resp.status(), 303);
    assert_eq!(resp.headers()["location"], "/admin/login");
}
