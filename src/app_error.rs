//! 面向用户的终端错误分类。
//!
//! User-facing, terminal error taxonomy.
//!
//! Every failure that leaves the assistant is exactly one [`AppError`], whose
//! [`AppErrorKind`] comes from a closed set:
//!
//! | Kind             | Typical cause                                  |
//! |------------------|------------------------------------------------|
//! | `Network`        | timeouts, 4xx (except 401/403), 5xx            |
//! | `ApiKey`         | no API key stored, detected before any request |
//! | `Authentication` | HTTP 401 / 403                                 |
//! | `Serialization`  | payload could not be encoded or decoded        |
//! | `Unknown`        | anything else; message kept verbatim           |
//!
//! An `AppError` is created once, at the boundary where a raw
//! [`crate::Error`] is classified, and is never re-classified.

use std::fmt;

/// Closed set of failure kinds presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppErrorKind {
    Network,
    ApiKey,
    Authentication,
    Serialization,
    Unknown,
}

impl AppErrorKind {
    /// Returns the stable name (e.g., `"network"`), used in logs.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::ApiKey => "api_key",
            Self::Authentication => "authentication",
            Self::Serialization => "serialization",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AppErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Classified failure carrying a localized, human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    kind: AppErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: AppErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Network, message)
    }

    pub fn api_key(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::ApiKey, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Authentication, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Serialization, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Unknown, message)
    }

    /// No API key has been stored yet.
    pub fn api_key_missing() -> Self {
        Self::api_key("APIキーが設定されていません。設定画面で設定してください。")
    }

    pub fn kind(&self) -> AppErrorKind {
        self.kind
    }

    /// Message suitable for direct display.
    pub fn user_message(&self) -> &str {
        &self.message
    }
}
