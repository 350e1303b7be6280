//! Error types for reconciler operations.
//!
//! Every failure the engine can observe maps onto one variant here. The
//! classification helpers decide whether a failure is retried by the client
//! facade, recorded against a single resource, or aborts the whole run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for reconciler operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Input document failed schema, regex, or cross-field validation
    #[error("Invalid input at `{path}`: {message}")]
    InputInvalid {
        /// Dotted path to the offending input field
        path: String,
        /// What was wrong with it
        message: String,
    },

    /// Method requires a newer controller release
    #[error("`{method}` requires controller {required} or later (controller is {actual})")]
    UnsupportedVersion {
        /// Facade method name
        method: String,
        /// Minimum release for the method
        required: String,
        /// Release reported by the controller
        actual: String,
    },

    /// Network failure or 5xx response
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Controller refused the caller's credentials for a method
    #[error("Forbidden: `{method}`: {message}")]
    Forbidden {
        /// Facade method name
        method: String,
        /// Controller response text
        message: String,
    },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Controller rejected the request semantics
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Anything else
    #[error("Unexpected error: {0}")]
    Unexpected(String),

    /// Response body could not be decoded
    #[error("Failed to parse controller response: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Secret encryption or decryption failed
    #[error("Secret handling failed: {0}")]
    Crypto(String),

    /// The run was cancelled between resources
    #[error("Run cancelled")]
    Cancelled,
}

/// Specialized result type for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structured error response for serialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Whether the error aborted the run
    pub fatal: bool,
}

impl Error {
    /// Shorthand for an [`Error::InputInvalid`] at `path`.
    pub fn input(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InputInvalid {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InputInvalid { .. } => "INPUT_INVALID",
            Self::UnsupportedVersion { .. } => "UNSUPPORTED_VERSION",
            Self::Transport(_) => "TRANSPORT",
            Self::Timeout(_) => "TIMEOUT",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Unexpected(_) => "UNEXPECTED",
            Self::Parse(_) => "PARSE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Crypto(_) => "CRYPTO_ERROR",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Returns true if the client facade should re-issue the call.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }

    /// Returns true if the error aborts the whole run instead of failing one
    /// resource.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InputInvalid { .. }
                | Self::UnsupportedVersion { .. }
                | Self::Forbidden { .. }
                | Self::Config(_)
                | Self::Cancelled
        )
    }

    /// Converts the error into an `ErrorResponse`.
    #[must_use]
    pub fn into_error_response(self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            fatal: self.is_fatal(),
            message: self.to_string(),
        }
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            Self::Transport(err.to_string())
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Unexpected(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::input("config", err.to_string())
    }
}
