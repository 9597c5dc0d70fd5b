//!
//! juronet server binary
//! ---------------------
//! Command-line entry point for starting the juronet portal server. Supports
//! configuration via CLI flags and environment variables; flags win.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use uuid::Uuid;

use juronet::backend::{MemoryBackend, RestBackend, SharedBackend};
use juronet::identity::Identity;
use juronet::server::DEFAULT_SESSION_TTL;

fn parse_port_env(name: &str) -> Option<u16> {
    match env::var(name) {
        Ok(val) => val.parse::<u16>().ok(),
        Err(_) => None,
    }
}

fn parse_port_arg(args: &[String], flag: &str) -> Option<u16> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return args[i + 1].parse::<u16>().ok();
        }
        i += 1;
    }
    None
}

fn parse_string_arg(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn build_backend(kind: &str, base: Option<String>, key: Option<String>) -> Result<SharedBackend> {
    match kind {
        "memory" => {
            let backend = MemoryBackend::with_demo_data()?;
            println!("demo staff tokens (memory backend):");
            for email in ["owner@juron.net.id", "admin@juron.net.id", "teknisi@juron.net.id"] {
                let token =
                    backend.issue_token(Identity { id: Uuid::new_v4(), email: email.to_string() });
                println!("  {:<24} {}", email, token);
            }
            println!("demo customer sign-in: JRN-240101 / 081234567001");
            Ok(Arc::new(backend))
        }
        "rest" => {
            let base = base.ok_or_else(|| {
                anyhow::anyhow!("rest backend needs --backend-url or JURONET_BACKEND_URL")
            })?;
            let key = key.ok_or_else(|| {
                anyhow::anyhow!("rest backend needs --backend-key or JURONET_BACKEND_KEY")
            })?;
            Ok(Arc::new(RestBackend::new(base, key)?))
        }
        other => anyhow::bail!("unknown backend '{}' (expected memory or rest)", other),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!(
        r"    _                            __
   (_)_  ___________  ____  ___  / /_
  / / / / / ___/ __ \/ __ \/ _ \/ __/
 / / /_/ / /  / /_/ / / / /  __/ /_
/ /\__,_/_/   \____/_/ /_/\___/\__/
|_/"
    );

    // Initialize tracing subscriber with env filter if provided
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("juronet Server\n\nUSAGE:\n  juronet_server [--http-port N] [--backend memory|rest] [--backend-url URL] [--backend-key KEY] [--session-ttl-secs N]\n\nOPTIONS:\n  --http-port N          HTTP API port (env: JURONET_HTTP_PORT, default 7878)\n  --backend KIND         Backend: 'memory' (demo dataset) or 'rest' (hosted API) (env: JURONET_BACKEND, default memory)\n  --backend-url URL      Hosted backend base URL, rest mode only (env: JURONET_BACKEND_URL)\n  --backend-key KEY      Hosted backend API key, rest mode only (env: JURONET_BACKEND_KEY)\n  --session-ttl-secs N   Portal session lifetime in seconds (env: JURONET_SESSION_TTL_SECS, default 28800)\n");
        return Ok(());
    }

    // Defaults
    let default_http: u16 = 7878;

    // Environment variables
    let env_http = parse_port_env("JURONET_HTTP_PORT");
    let env_backend = env::var("JURONET_BACKEND").ok();
    let env_backend_url = env::var("JURONET_BACKEND_URL").ok();
    let env_backend_key = env::var("JURONET_BACKEND_KEY").ok();
    let env_ttl = env::var("JURONET_SESSION_TTL_SECS").ok().and_then(|v| v.parse::<u64>().ok());

    // CLI arguments override environment
    let arg_http = parse_port_arg(&args, "--http-port");
    let arg_backend = parse_string_arg(&args, "--backend");
    let arg_backend_url = parse_string_arg(&args, "--backend-url");
    let arg_backend_key = parse_string_arg(&args, "--backend-key");
    let arg_ttl =
        parse_string_arg(&args, "--session-ttl-secs").and_then(|v| v.parse::<u64>().ok());

    let http_port = arg_http.or(env_http).unwrap_or(default_http);
    let backend_kind = arg_backend.or(env_backend).unwrap_or_else(|| "memory".to_string());
    let backend_url = arg_backend_url.or(env_backend_url);
    let backend_key = arg_backend_key.or(env_backend_key);
    let session_ttl =
        arg_ttl.or(env_ttl).map(Duration::from_secs).unwrap_or(DEFAULT_SESSION_TTL);

    let backend = build_backend(&backend_kind, backend_url, backend_key)?;

    println!(
        "juronet starting: http={}, backend={}, session_ttl_secs={}",
        http_port,
        backend_kind,
        session_ttl.as_secs()
    );
    tracing::info!(
        "Using port: http={}, backend={}, session_ttl_secs={}",
        http_port,
        backend_kind,
        session_ttl.as_secs()
    );
    juronet::server::run_with_port(http_port, backend, session_ttl).await
}
