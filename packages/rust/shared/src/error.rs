//! Error types for the onboarding service.
//!
//! Library crates use [`OnboardingError`] via `thiserror`. Every variant knows
//! the HTTP status it maps to and the `errors` array a caller gets to see.
//! The server app wraps startup failures with `color-eyre`.

use std::path::PathBuf;

use crate::types::ErrorDetail;

/// Error source tag attached to credential failures.
pub const AUTHENTICATION_SOURCE: &str = "authentication";

/// Message returned for any failure whose detail must stay in the operator log.
pub const GENERIC_SERVER_ERROR: &str = "Internal Server Error";

/// Top-level error type for all onboarding operations.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    /// No usable credential was supplied by the caller (401).
    #[error("authentication required: {message}")]
    Unauthenticated { message: String },

    /// The auth service refused to grant the requested scope (403).
    #[error("access denied: {}", join_messages(.errors))]
    Forbidden { errors: Vec<ErrorDetail> },

    /// A referenced resource does not exist (404).
    #[error("not found: {message}")]
    NotFound { message: String },

    /// A remote service rejected the request; status and body pass through.
    #[error("upstream returned {status}: {}", join_messages(.errors))]
    Upstream { status: u16, errors: Vec<ErrorDetail> },

    /// A remote service failed or could not be reached (500).
    ///
    /// `message` is synthesized by us and safe to show a caller.
    #[error("upstream service error: {message}")]
    Service { message: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OnboardingError>;

impl OnboardingError {
    /// Create a 401 error.
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: msg.into(),
        }
    }

    /// Create a 403 error tagged with the authentication source.
    pub fn forbidden(messages: impl IntoIterator<Item = String>) -> Self {
        Self::Forbidden {
            errors: messages
                .into_iter()
                .map(|m| ErrorDetail::with_source(m, AUTHENTICATION_SOURCE))
                .collect(),
        }
    }

    /// Create a 404 error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound {
            message: msg.into(),
        }
    }

    /// Create a 500 error with a caller-safe message.
    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// HTTP status this error surfaces as.
    pub fn status(&self) -> u16 {
        match self {
            Self::Unauthenticated { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::Upstream { status, .. } => *status,
            Self::Service { .. } | Self::Config { .. } | Self::Io { .. } => 500,
        }
    }

    /// The `errors` array returned to the caller.
    ///
    /// Config and I/O failures are internal and collapse to a generic message.
    pub fn details(&self) -> Vec<ErrorDetail> {
        match self {
            Self::Unauthenticated { message } => {
                vec![ErrorDetail::with_source(message.clone(), AUTHENTICATION_SOURCE)]
            }
            Self::Forbidden { errors } | Self::Upstream { errors, .. } => errors.clone(),
            Self::NotFound { message } | Self::Service { message } => {
                vec![ErrorDetail::new(message.clone())]
            }
            Self::Config { .. } | Self::Io { .. } => vec![ErrorDetail::new(GENERIC_SERVER_ERROR)],
        }
    }
}

fn join_messages(errors: &[ErrorDetail]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
