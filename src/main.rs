use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

use juronet::backend::{MemoryBackend, RestBackend, SharedBackend};
use juronet::identity::Identity;
use juronet::server::DEFAULT_SESSION_TTL;

fn backend_from_env() -> anyhow::Result<SharedBackend> {
    let kind = std::env::var("JURONET_BACKEND").unwrap_or_else(|_| "memory".to_string());
    match kind.as_str() {
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
            let base = std::env::var("JURONET_BACKEND_URL")
                .map_err(|_| anyhow::anyhow!("JURONET_BACKEND_URL is required for the rest backend"))?;
            let key = std::env::var("JURONET_BACKEND_KEY")
                .map_err(|_| anyhow::anyhow!("JURONET_BACKEND_KEY is required for the rest backend"))?;
            Ok(Arc::new(RestBackend::new(&base, &key)?))
        }
        other => anyhow::bail!("unknown JURONET_BACKEND '{}' (expected memory or rest)", other),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let http_port: u16 = std::env::var("JURONET_HTTP_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(7878);
    let backend_kind = std::env::var("JURONET_BACKEND").unwrap_or_else(|_| "memory".to_string());
    let session_ttl = std::env::var("JURONET_SESSION_TTL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(std::time::Duration::from_secs)
        .unwrap_or(DEFAULT_SESSION_TTL);
    info!(
        target: "juronet",
        "juronet starting: RUST_LOG='{}', http_port={}, backend={}, session_ttl_secs={}",
        rust_log, http_port, backend_kind, session_ttl.as_secs()
    );

    let backend = backend_from_env()?;
    juronet::server::run_with_port(http_port, backend, session_ttl).await
}
