//! Device capabilities
//! -------------------
//! Host-side integrations the CLI leans on: clipboard write, geolocation
//! fixes, and opening map links. Each capability is a trait so callers degrade
//! gracefully on hosts that lack it; adapters shell out or read the
//! environment rather than assuming a desktop session.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::format::maps_url;

const GEO_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("{0} is not supported on this host")]
    Unsupported(&'static str),
    #[error("device operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Failed(String),
}

/// A location fix. Fixes are requested fresh on every call; adapters must not
/// serve cached positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
}

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn copy(&self, text: &str) -> Result<(), DeviceError>;
}

#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_fix(&self) -> Result<GeoFix, DeviceError>;
}

#[async_trait]
pub trait LinkOpener: Send + Sync {
    async fn open(&self, url: &str) -> Result<(), DeviceError>;
}

/// Copy with fallback: try the preferred clipboard first, then the fallback.
/// The fallback's error wins when both fail.
pub async fn copy_text(
    primary: &dyn Clipboard,
    fallback: &dyn Clipboard,
    text: &str,
) -> Result<(), DeviceError> {
    match primary.copy(text).await {
        Ok(()) => Ok(()),
        Err(primary_err) => {
            crate::jprintln!("device.clipboard primary failed, trying fallback: {}", primary_err);
            fallback.copy(text).await
        }
    }
}

/// Request a fresh fix with the standard ten second deadline.
pub async fn current_location(geolocator: &dyn Geolocator) -> Result<GeoFix, DeviceError> {
    current_location_with(geolocator, GEO_TIMEOUT).await
}

pub async fn current_location_with(
    geolocator: &dyn Geolocator,
    timeout: Duration,
) -> Result<GeoFix, DeviceError> {
    match tokio::time::timeout(timeout, geolocator.current_fix()).await {
        Ok(result) => result,
        Err(_) => Err(DeviceError::Timeout(timeout)),
    }
}

/// Open the external map view for a coordinate pair.
pub async fn open_in_maps(opener: &dyn LinkOpener, lat: f64, lng: f64) -> Result<(), DeviceError> {
    opener.open(&maps_url(lat, lng)).await
}

/// Clipboard that pipes text into a shell command (`wl-copy`, `xclip`,
/// `pbcopy`). The command comes from `JURONET_CLIPBOARD_CMD`.
pub struct CommandClipboard {
    command: String,
}

impl CommandClipboard {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var("JURONET_CLIPBOARD_CMD").ok().map(Self::new)
    }
}

#[async_trait]
impl Clipboard for CommandClipboard {
    async fn copy(&self, text: &str) -> Result<(), DeviceError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| DeviceError::Failed(format!("clipboard command failed to start: {}", e)))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| DeviceError::Failed(format!("clipboard write failed: {}", e)))?;
        }
        let status = child
            .wait()
            .await
            .map_err(|e| DeviceError::Failed(format!("clipboard command failed: {}", e)))?;
        if status.success() {
            Ok(())
        } else {
            Err(DeviceError::Failed(format!("clipboard command exited with {}", status)))
        }
    }
}

/// Absent clipboard, for hosts with no copy mechanism configured.
pub struct NoClipboard;

#[async_trait]
impl Clipboard for NoClipboard {
    async fn copy(&self, _text: &str) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported("clipboard"))
    }
}

/// Geolocator fed by an environment variable holding `lat,lng` or
/// `lat,lng,accuracy`. Headless hosts have no positioning hardware, so the
/// fix is operator-provided.
pub struct EnvGeolocator {
    var: String,
}

impl EnvGeolocator {
    pub fn new() -> Self {
        Self::with_var("JURONET_GEO_FIX")
    }

    pub fn with_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvGeolocator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Geolocator for EnvGeolocator {
    async fn current_fix(&self) -> Result<GeoFix, DeviceError> {
        let Ok(raw) = std::env::var(&self.var) else {
            return Err(DeviceError::Unsupported("geolocation"));
        };
        parse_fix(&raw).ok_or_else(|| DeviceError::Failed(format!("malformed location fix {:?}", raw)))
    }
}

fn parse_fix(raw: &str) -> Option<GeoFix> {
    let mut parts = raw.split(',').map(str::trim);
    let latitude: f64 = parts.next()?.parse().ok()?;
    let longitude: f64 = parts.next()?.parse().ok()?;
    let accuracy = match parts.next() {
        Some(acc) => Some(acc.parse().ok()?),
        None => None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(GeoFix { latitude, longitude, accuracy })
}

/// Opens links through the host's URL handler, `xdg-open` by default.
pub struct ShellLinkOpener {
    program: String,
}

impl ShellLinkOpener {
    pub fn new() -> Self {
        let program =
            std::env::var("JURONET_OPEN_CMD").unwrap_or_else(|_| "xdg-open".to_string());
        Self { program }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl Default for ShellLinkOpener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkOpener for ShellLinkOpener {
    async fn open(&self, url: &str) -> Result<(), DeviceError> {
        let status = Command::new(&self.program)
            .arg(url)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| DeviceError::Failed(format!("{} failed to start: {}", self.program, e)))?;
        if status.success() {
            Ok(())
        } else {
            Err(DeviceError::Failed(format!("{} exited with {}", self.program, status)))
        }
    }
}

/// The standard clipboard stack: the configured command when present, with
/// nothing to fall back to otherwise.
pub fn default_clipboard() -> Arc<dyn Clipboard> {
    match CommandClipboard::from_env() {
        Some(cmd) => Arc::new(cmd),
        None => Arc::new(NoClipboard),
    }
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod device_tests;
