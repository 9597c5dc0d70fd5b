//! Unified application error model and mapping helpers.
//! This module provides a common error enum used across the HTTP/WS handlers
//! and the backend/device layers, along with the HTTP status mapping.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    NotFound { code: String, message: String },
    Conflict { code: String, message: String },
    Auth { code: String, message: String },
    Csrf { code: String, message: String },
    Forbidden { code: String, message: String },
    Backend { code: String, message: String },
    Capability { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Csrf { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::Backend { code, .. }
            | AppError::Capability { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Csrf { message, .. }
            | AppError::Forbidden { message, .. }
            | AppError::Backend { message, .. }
            | AppError::Capability { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn conflict<S: Into<String>>(code: S, msg: S) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn csrf<S: Into<String>>(code: S, msg: S) -> Self { AppError::Csrf { code: code.into(), message: msg.into() } }
    pub fn forbidden<S: Into<String>>(code: S, msg: S) -> Self { AppError::Forbidden { code: code.into(), message: msg.into() } }
    pub fn backend<S: Into<String>>(code: S, msg: S) -> Self { AppError::Backend { code: code.into(), message: msg.into() } }
    pub fn capability<S: Into<String>>(code: S, msg: S) -> Self { AppError::Capability { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::NotFound { .. } => 404,
            AppError::Conflict { .. } => 409,
            AppError::Auth { .. } => 401,
            AppError::Csrf { .. } => 403,
            AppError::Forbidden { .. } => 403,
            AppError::Backend { .. } => 502,
            AppError::Capability { .. } => 501,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Default mapping: treat as Internal unless downcasted elsewhere
        AppError::Internal { code: "internal_error".into(), message: err.to_string() }
    }
}

impl From<crate::backend::BackendError> for AppError {
    fn from(err: crate::backend::BackendError) -> Self {
        match err {
            crate::backend::BackendError::Conflict(msg) => AppError::Conflict { code: "backend_conflict".into(), message: msg },
            other => AppError::Backend { code: "backend_error".into(), message: other.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::user("bad_input", "oops").http_status(), 400);
        assert_eq!(AppError::not_found("not_found", "missing").http_status(), 404);
        assert_eq!(AppError::conflict("conflict", "dup").http_status(), 409);
        assert_eq!(AppError::auth("auth", "no").http_status(), 401);
        assert_eq!(AppError::csrf("csrf", "blocked").http_status(), 403);
        assert_eq!(AppError::forbidden("forbidden", "denied").http_status(), 403);
        assert_eq!(AppError::backend("backend", "down").http_status(), 502);
        assert_eq!(AppError::capability("capability", "unsupported").http_status(), 501);
        assert_eq!(AppError::internal("internal", "panic").http_status(), 500);
    }

    #[test]
    fn display_includes_code_and_message() {
        let e = AppError::auth("invalid_token", "token rejected");
        assert_eq!(e.to_string(), "invalid_token: token rejected");
    }

    #[test]
    fn backend_conflict_maps_to_conflict() {
        let e: AppError = crate::backend::BackendError::Conflict("invoice number taken".into()).into();
        assert_eq!(e.http_status(), 409);
        let e2: AppError = crate::backend::BackendError::Decode("bad json".into()).into();
        assert_eq!(e2.http_status(), 502);
    }
}
