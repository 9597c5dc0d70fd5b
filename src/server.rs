//! juronet HTTP/WS server
//! ----------------------
//! Axum-based HTTP API for the portal, plus a WebSocket feed of session
//! state changes.
//!
//! Responsibilities:
//! - Portal session management with a cookie + CSRF token model; each portal
//!   session owns a `SessionStore` and, for token-backed sessions, a watcher
//!   task following the backend's auth changes.
//! - Sign-in endpoints: provider access tokens for staff, invoice + phone for
//!   customers.
//! - Page gating: every page-scoped route asks the role gate, waiting out an
//!   in-flight resolution for a bounded interval before answering 503.
//! - Admin and customer APIs, mounted from `admin_api` and `portal_api`.
//! - Session TTL sweeping in the background.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use getrandom::getrandom;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::backend::{AuthEvent, DataBackend, SharedBackend};
use crate::error::AppError;
use crate::format::{format_phone_number, validate_invoice_number};
use crate::identity::{
    decide, resolve_identity, GateDecision, ResolutionOutcome, Session, SessionState, SessionStore,
};

pub mod admin_api;
pub mod portal_api;

const SESSION_COOKIE: &str = "juronet_session";

/// How long a page request waits for an in-flight resolution to settle
/// before answering 503.
const SETTLE_WAIT: Duration = Duration::from_secs(2);

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(8 * 3600);

/// One signed-in portal session. Owns the session store; token-backed
/// sessions also carry the provider access token and the watcher task that
/// follows its auth changes.
pub struct ClientSession {
    pub store: Arc<SessionStore>,
    pub access_token: Option<String>,
    pub issued_at: Instant,
    pub expires_at: Instant,
    watcher: Option<tokio::task::JoinHandle<()>>,
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

/// Shared server state injected into all handlers.
///
/// Session and CSRF maps are keyed by the portal session id from the cookie.
/// No globals: everything a handler needs travels through this state.
#[derive(Clone)]
pub struct AppState {
    pub backend: SharedBackend,
    pub sessions: Arc<RwLock<HashMap<String, Arc<ClientSession>>>>,
    pub csrf_tokens: Arc<RwLock<HashMap<String, String>>>,
    pub session_ttl: Duration,
}

impl AppState {
    pub fn new(backend: SharedBackend, session_ttl: Duration) -> Self {
        Self {
            backend,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            csrf_tokens: Arc::new(RwLock::new(HashMap::new())),
            session_ttl,
        }
    }
}

/// Start the portal HTTP server on the given port.
pub async fn run_with_port(
    http_port: u16,
    backend: SharedBackend,
    session_ttl: Duration,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    run_on_listener(listener, backend, session_ttl).await
}

/// Serve on an already-bound listener. Tests bind an ephemeral port and hand
/// it in here.
pub async fn run_on_listener(
    listener: tokio::net::TcpListener,
    backend: SharedBackend,
    session_ttl: Duration,
) -> anyhow::Result<()> {
    let state = AppState::new(backend, session_ttl);
    spawn_session_sweeper(state.clone());
    let app = build_router(state);
    info!("Starting server on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            get(|| async { "juronet ok\ncustomer login: /customer/login\nadmin login: /admin/login" }),
        )
        .route("/auth/session", post(begin_session).get(current_session))
        .route("/auth/refresh", post(refresh_session))
        .route("/auth/login/customer", post(customer_login))
        .route("/auth/oauth/{provider}", get(oauth_start))
        .route("/auth/csrf", get(get_csrf))
        .route("/auth/logout", post(logout))
        .route("/auth/events", get(events_ws))
        .route("/admin/dashboard", get(admin_api::dashboard))
        .route(
            "/admin/customers",
            get(admin_api::list_customers).post(admin_api::create_customer),
        )
        .route(
            "/admin/customers/{id}",
            get(admin_api::customer_detail).put(admin_api::update_customer),
        )
        .route("/admin/financial", get(admin_api::financial_summary))
        .route("/admin/financial/income", post(admin_api::record_income))
        .route("/admin/financial/expenses", post(admin_api::record_expense))
        .route("/admin/payments", get(admin_api::list_payments))
        .route("/admin/payments/{id}/verify", post(admin_api::verify_payment))
        .route("/admin/payments/{id}/reject", post(admin_api::reject_payment))
        .route("/admin/tickets", get(admin_api::list_tickets))
        .route("/admin/tickets/{id}/reply", post(admin_api::reply_to_ticket))
        .route("/admin/maps", get(admin_api::customer_map))
        .route("/customer/portal", get(portal_api::portal_home))
        .route(
            "/customer/payments",
            get(portal_api::list_payments).post(portal_api::submit_payment),
        )
        .route(
            "/customer/tickets",
            get(portal_api::list_tickets).post(portal_api::create_ticket),
        )
        .fallback(spa_fallback)
        .with_state(state)
}

fn spawn_session_sweeper(state: AppState) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(SWEEP_INTERVAL).await;
            let now = Instant::now();
            let expired: Vec<String> = {
                let sessions = state.sessions.read().await;
                sessions
                    .iter()
                    .filter(|(_, entry)| entry.expires_at <= now)
                    .map(|(sid, _)| sid.clone())
                    .collect()
            };
            if expired.is_empty() {
                continue;
            }
            let mut sessions = state.sessions.write().await;
            let mut csrf_tokens = state.csrf_tokens.write().await;
            for sid in &expired {
                if let Some(entry) = sessions.remove(sid) {
                    entry.store.clear();
                }
                csrf_tokens.remove(sid);
            }
            tracing::debug!(removed = expired.len(), "session_sweep");
        }
    });
}

fn gen_token() -> String {
    // 256-bit random token, hex encoded
    let mut buf = [0u8; 32];
    let _ = getrandom(&mut buf);
    let mut token = String::with_capacity(64);
    use std::fmt::Write as _;
    for b in &buf {
        let _ = write!(&mut token, "{:02x}", b);
    }
    token
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name {
                return Some(v[1..].to_string());
            }
        }
    }
    None
}

async fn session_for_headers(state: &AppState, headers: &HeaderMap) -> Option<Arc<ClientSession>> {
    let sid = parse_cookie(headers, SESSION_COOKIE)?;
    let map = state.sessions.read().await;
    map.get(&sid).cloned()
}

async fn validate_csrf(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(sid) = parse_cookie(headers, SESSION_COOKIE) else {
        return false;
    };
    let Some(provided) = headers
        .get("x-csrf-token")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
    else {
        return false;
    };
    let cmap = state.csrf_tokens.read().await;
    match cmap.get(&sid) {
        Some(expected) => expected == &provided,
        None => false,
    }
}

fn set_session_cookie(sid: &str) -> HeaderValue {
    // Secure, HttpOnly cookie scoped to path / with SameSite=Strict
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; Secure; SameSite=Strict; Path=/",
        SESSION_COOKIE, sid
    ))
    .unwrap()
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_str(&format!(
        "{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; Secure; SameSite=Strict; Path=/",
        SESSION_COOKIE
    ))
    .unwrap()
}

pub(crate) fn error_response(err: AppError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({"status":"error","code": err.code_str(), "message": err.message()})),
    )
        .into_response()
}

pub(crate) fn redirect_response(location: &str) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(location) {
        headers.insert("Location", value);
    }
    (
        StatusCode::SEE_OTHER,
        headers,
        Json(json!({"status":"redirect","location": location})),
    )
        .into_response()
}

fn resolving_response() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Retry-After", HeaderValue::from_static("1"));
    (
        StatusCode::SERVICE_UNAVAILABLE,
        headers,
        Json(json!({"status":"resolving","message":"session resolution in progress"})),
    )
        .into_response()
}

/// Wait for the store to leave `Resolving`, up to `max_wait`. Subscribes
/// first and re-reads the snapshot afterwards so a settle landing between
/// the two is not missed.
pub(crate) async fn wait_until_settled(store: &SessionStore, max_wait: Duration) -> SessionState {
    let notify = Arc::new(tokio::sync::Notify::new());
    let notify_tx = notify.clone();
    let sub = store.subscribe(move |state| {
        if !matches!(state, SessionState::Resolving) {
            notify_tx.notify_one();
        }
    });
    let mut snapshot = store.snapshot();
    if matches!(snapshot, SessionState::Resolving) {
        let _ = tokio::time::timeout(max_wait, notify.notified()).await;
        snapshot = store.snapshot();
    }
    store.unsubscribe(sub);
    snapshot
}

/// Gate a request against a page path. `Ok(Some(session))` for a signed-in
/// render, `Ok(None)` for a public render, `Err(response)` for redirects and
/// the still-resolving case.
pub(crate) async fn page_access(
    state: &AppState,
    headers: &HeaderMap,
    page: &str,
) -> Result<Option<Session>, Response> {
    let client = session_for_headers(state, headers).await;
    let mut snapshot = match &client {
        Some(client) => client.store.snapshot(),
        None => SessionState::Anonymous,
    };
    if matches!(snapshot, SessionState::Resolving) {
        if let Some(client) = &client {
            snapshot = wait_until_settled(&client.store, SETTLE_WAIT).await;
        }
    }
    match decide(&snapshot, page) {
        GateDecision::Render => Ok(snapshot.session().cloned()),
        GateDecision::Redirect(location) => Err(redirect_response(location)),
        GateDecision::Defer => Err(resolving_response()),
    }
}

/// `page_access` for protected pages, where a render implies a session.
pub(crate) async fn page_session(
    state: &AppState,
    headers: &HeaderMap,
    page: &str,
) -> Result<Session, Response> {
    match page_access(state, headers, page).await? {
        Some(session) => Ok(session),
        None => Err(redirect_response("/")),
    }
}

fn spawn_session_watcher(
    backend: SharedBackend,
    store: Arc<SessionStore>,
    access_token: String,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut watch = backend.watch(&access_token).await;
        while let Some(event) = watch.next_event().await {
            match event {
                AuthEvent::IdentityChanged(identity) => {
                    let data: &dyn DataBackend = backend.as_ref();
                    resolve_identity(data, &store, &identity).await;
                }
                AuthEvent::SignedOut => {
                    store.clear();
                    break;
                }
            }
        }
    })
}

async fn install_session(state: &AppState, entry: Arc<ClientSession>) -> (String, String) {
    let sid = gen_token();
    let csrf = gen_token();
    {
        let mut map = state.sessions.write().await;
        map.insert(sid.clone(), entry);
    }
    {
        let mut cmap = state.csrf_tokens.write().await;
        cmap.insert(sid.clone(), csrf.clone());
    }
    (sid, csrf)
}

async fn remove_session(state: &AppState, sid: &str) -> Option<Arc<ClientSession>> {
    let entry = state.sessions.write().await.remove(sid);
    state.csrf_tokens.write().await.remove(sid);
    entry
}

#[derive(Debug, Deserialize)]
struct AccessTokenPayload {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct CustomerLoginPayload {
    invoice_number: String,
    phone: String,
}

#[derive(Debug, Deserialize)]
struct OAuthQuery {
    redirect_to: Option<String>,
}

/// POST /auth/session: exchange a provider access token for a portal session.
/// The token is introspected, the identity resolved against staff-then-customer
/// collections, and only a successful resolution gets a cookie.
async fn begin_session(
    State(state): State<AppState>,
    Json(payload): Json<AccessTokenPayload>,
) -> Response {
    let identity = match state.backend.identity_for_token(&payload.access_token).await {
        Ok(Some(identity)) => identity,
        Ok(None) => {
            return (StatusCode::UNAUTHORIZED, Json(json!({"status":"unauthorized"})))
                .into_response();
        }
        Err(e) => {
            error!("token introspection failed: {e}");
            return error_response(e.into());
        }
    };

    let store = Arc::new(SessionStore::new());
    let data: &dyn DataBackend = state.backend.as_ref();
    let outcome = resolve_identity(data, &store, &identity).await;
    let session = match store.snapshot() {
        SessionState::SignedIn(session) => session,
        _ => {
            return match outcome {
                ResolutionOutcome::Failed => error_response(AppError::Backend {
                    code: "resolution_failed".into(),
                    message: "account lookup failed; signed out".into(),
                }),
                _ => error_response(AppError::Forbidden {
                    code: "no_account".into(),
                    message: "no staff or customer account matches this identity".into(),
                }),
            };
        }
    };

    let watcher = spawn_session_watcher(
        state.backend.clone(),
        store.clone(),
        payload.access_token.clone(),
    );
    let entry = Arc::new(ClientSession {
        store,
        access_token: Some(payload.access_token),
        issued_at: Instant::now(),
        expires_at: Instant::now() + state.session_ttl,
        watcher: Some(watcher),
    });
    let (sid, _csrf) = install_session(&state, entry).await;
    let mut headers = HeaderMap::new();
    headers.insert("Set-Cookie", set_session_cookie(&sid));
    (StatusCode::OK, headers, Json(json!({"status":"ok","session": session}))).into_response()
}

/// GET /auth/session: current resolution state for this portal session.
async fn current_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(client) = session_for_headers(&state, &headers).await else {
        return (StatusCode::UNAUTHORIZED, Json(json!({"status":"unauthorized"}))).into_response();
    };
    match client.store.snapshot() {
        SessionState::SignedIn(session) => (
            StatusCode::OK,
            Json(json!({"status":"ok","state":"signed_in","session": session})),
        )
            .into_response(),
        SessionState::Resolving => {
            (StatusCode::OK, Json(json!({"status":"ok","state":"resolving"}))).into_response()
        }
        SessionState::Anonymous => {
            (StatusCode::UNAUTHORIZED, Json(json!({"status":"unauthorized"}))).into_response()
        }
    }
}

/// POST /auth/refresh: swap in a rotated access token and re-resolve on the
/// same store, so subscribers observe resolving then the fresh result.
async fn refresh_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AccessTokenPayload>,
) -> Response {
    let Some(client) = session_for_headers(&state, &headers).await else {
        return (StatusCode::UNAUTHORIZED, Json(json!({"status":"unauthorized"}))).into_response();
    };
    if !validate_csrf(&state, &headers).await {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"status":"forbidden","error":"invalid csrf"})),
        )
            .into_response();
    }
    let Some(sid) = parse_cookie(&headers, SESSION_COOKIE) else {
        return (StatusCode::UNAUTHORIZED, Json(json!({"status":"unauthorized"}))).into_response();
    };

    let identity = match state.backend.identity_for_token(&payload.access_token).await {
        Ok(Some(identity)) => identity,
        Ok(None) => {
            return (StatusCode::UNAUTHORIZED, Json(json!({"status":"unauthorized"})))
                .into_response();
        }
        Err(e) => {
            error!("token introspection failed: {e}");
            return error_response(e.into());
        }
    };

    let store = client.store.clone();
    let data: &dyn DataBackend = state.backend.as_ref();
    let outcome = resolve_identity(data, &store, &identity).await;
    let session = match store.snapshot() {
        SessionState::SignedIn(session) => session,
        _ => {
            // The refreshed token no longer maps to an account: fail closed.
            remove_session(&state, &sid).await;
            let mut h = HeaderMap::new();
            h.insert("Set-Cookie", clear_session_cookie());
            let err = match outcome {
                ResolutionOutcome::Failed => AppError::Backend {
                    code: "resolution_failed".into(),
                    message: "account lookup failed; signed out".into(),
                },
                _ => AppError::Forbidden {
                    code: "no_account".into(),
                    message: "no staff or customer account matches this identity".into(),
                },
            };
            let status = StatusCode::from_u16(err.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (
                status,
                h,
                Json(json!({"status":"error","code": err.code_str(), "message": err.message()})),
            )
                .into_response();
        }
    };

    let watcher = spawn_session_watcher(
        state.backend.clone(),
        store.clone(),
        payload.access_token.clone(),
    );
    let entry = Arc::new(ClientSession {
        store,
        access_token: Some(payload.access_token),
        issued_at: client.issued_at,
        expires_at: Instant::now() + state.session_ttl,
        watcher: Some(watcher),
    });
    state.sessions.write().await.insert(sid, entry);
    (StatusCode::OK, Json(json!({"status":"ok","session": session}))).into_response()
}

/// POST /auth/login/customer: invoice number + phone sign-in. The invoice
/// format is validated before any lookup runs; the phone is normalized to
/// +62 form first.
async fn customer_login(
    State(state): State<AppState>,
    Json(payload): Json<CustomerLoginPayload>,
) -> Response {
    if !validate_invoice_number(&payload.invoice_number) {
        return error_response(AppError::UserInput {
            code: "invalid_invoice_format".into(),
            message: "Invalid invoice number format. Use JRN-XXXXXX".into(),
        });
    }
    let phone = format_phone_number(&payload.phone);
    let customer = match state
        .backend
        .customer_by_invoice_and_phone(&payload.invoice_number, &phone)
        .await
    {
        Ok(Some(customer)) => customer,
        Ok(None) => {
            return error_response(AppError::Auth {
                code: "invalid_credentials".into(),
                message: "Invalid invoice number or phone number".into(),
            });
        }
        Err(e) => {
            error!("customer login lookup failed: {e}");
            return error_response(e.into());
        }
    };

    let session = Session::from_customer(&customer);
    let store = Arc::new(SessionStore::new());
    store.set(session.clone());
    let entry = Arc::new(ClientSession {
        store,
        access_token: None,
        issued_at: Instant::now(),
        expires_at: Instant::now() + state.session_ttl,
        watcher: None,
    });
    let (sid, _csrf) = install_session(&state, entry).await;
    let mut headers = HeaderMap::new();
    headers.insert("Set-Cookie", set_session_cookie(&sid));
    (StatusCode::OK, headers, Json(json!({"status":"ok","session": session}))).into_response()
}

/// GET /auth/oauth/{provider}: compose the provider authorize URL for the
/// client to follow.
async fn oauth_start(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<OAuthQuery>,
) -> Response {
    let redirect_to = query.redirect_to.unwrap_or_else(|| "/".to_string());
    let url = state.backend.authorize_url(&provider, &redirect_to);
    (StatusCode::OK, Json(json!({"status":"ok","authorize_url": url}))).into_response()
}

async fn get_csrf(State(state): State<AppState>, headers: HeaderMap) -> Response {
    // Must hold a portal session to fetch the CSRF token
    let Some(_client) = session_for_headers(&state, &headers).await else {
        return (StatusCode::UNAUTHORIZED, Json(json!({"status":"unauthorized"}))).into_response();
    };
    let Some(sid) = parse_cookie(&headers, SESSION_COOKIE) else {
        return (StatusCode::UNAUTHORIZED, Json(json!({"status":"unauthorized"}))).into_response();
    };
    let cmap = state.csrf_tokens.read().await;
    if let Some(token) = cmap.get(&sid) {
        return (StatusCode::OK, Json(json!({"status":"ok","csrf": token}))).into_response();
    }
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"status":"error","error":"csrf not available"})),
    )
        .into_response()
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    // Require CSRF token
    if !validate_csrf(&state, &headers).await {
        return (
            StatusCode::FORBIDDEN,
            HeaderMap::new(),
            Json(json!({"status":"forbidden","error":"invalid csrf"})),
        )
            .into_response();
    }
    if let Some(sid) = parse_cookie(&headers, SESSION_COOKIE) {
        if let Some(entry) = remove_session(&state, &sid).await {
            entry.store.clear();
            if let Some(token) = &entry.access_token {
                if let Err(e) = state.backend.sign_out(token).await {
                    error!("provider sign-out failed: {e}");
                }
            }
        }
    }
    let mut h = HeaderMap::new();
    h.insert("Set-Cookie", clear_session_cookie());
    (StatusCode::OK, h, Json(json!({"status":"ok"}))).into_response()
}

fn state_event_json(state: &SessionState) -> serde_json::Value {
    match state {
        SessionState::Resolving => json!({"status":"ok","state":"resolving"}),
        SessionState::Anonymous => json!({"status":"ok","state":"signed_out"}),
        SessionState::SignedIn(session) => {
            json!({"status":"ok","state":"signed_in","session": session})
        }
    }
}

/// GET /auth/events: WebSocket feed of this portal session's state changes.
/// The current state is sent immediately on connect.
async fn events_ws(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(client) = session_for_headers(&state, &headers).await else {
        return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
    };
    if !validate_csrf(&state, &headers).await {
        return (StatusCode::FORBIDDEN, "forbidden: invalid csrf").into_response();
    }
    ws.on_upgrade(move |socket| async move {
        let (mut sender, mut receiver) = socket.split();
        let (tx, mut rx) = tokio::sync::mpsc::channel::<SessionState>(16);
        let sub = client.store.subscribe(move |state| {
            // A full channel means the socket is hopelessly behind; the next
            // snapshot it does receive is still current.
            let _ = tx.try_send(state.clone());
        });
        let snapshot = client.store.snapshot();
        if sender
            .send(Message::Text(state_event_json(&snapshot).to_string().into()))
            .await
            .is_err()
        {
            client.store.unsubscribe(sub);
            return;
        }
        loop {
            tokio::select! {
                next = rx.recv() => {
                    let Some(next) = next else { break; };
                    if sender
                        .send(Message::Text(state_event_json(&next).to_string().into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                msg = receiver.next() => {
                    match msg {
                        Some(Ok(Message::Close(_))) | None => break,
                        _ => {}
                    }
                }
            }
        }
        client.store.unsubscribe(sub);
    })
}

/// Fallback for every unrouted path: answer with the gate's verdict, which is
/// a redirect for everything except the public pages.
async fn spa_fallback(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    match page_access(&state, &headers, uri.path()).await {
        Ok(_) => (StatusCode::OK, Json(json!({"status":"ok"}))).into_response(),
        Err(resp) => resp,
    }
}
