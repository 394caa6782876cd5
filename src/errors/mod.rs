//! Error types for the invoice client.
//!
//! Every failure that reaches a caller is one of the classified HTTP kinds
//! (`Client`, `Server`, `Unavailable`) or one of the local kinds
//! (`Cancelled`, `Configuration`, `Serialization`). Retry decisions are
//! driven by the classified kinds only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for invoice operations.
pub type InvoiceResult<T> = Result<T, InvoiceError>;

/// Status code reported when no HTTP response was received.
pub const NO_RESPONSE_STATUS: u16 = 0;

/// Status code carried by every [`InvoiceError::Unavailable`].
pub const SERVICE_UNAVAILABLE_STATUS: u16 = 503;

/// Message carried by the error synthesized when the retry budget runs out.
pub const RETRIES_EXHAUSTED_MESSAGE: &str =
    "External Service failed to process after max retries";

/// Error type for invoice client operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvoiceError {
    /// The downstream service answered with a 4xx status. Never retried.
    #[error("{message} (HTTP {status_code})")]
    Client {
        /// Human-readable message.
        message: String,
        /// Originating HTTP status code.
        status_code: u16,
    },

    /// The downstream service answered with a 5xx (or unexpected) status, or
    /// the exchange never completed. Retryable.
    #[error("{message} (HTTP {status_code})")]
    Server {
        /// Human-readable message.
        message: String,
        /// Originating HTTP status code, `0` when no response was received.
        status_code: u16,
    },

    /// The retry budget was exhausted while the service kept failing.
    #[error("{message} (HTTP {status_code})")]
    Unavailable {
        /// Human-readable message.
        message: String,
        /// Always `503`.
        status_code: u16,
    },

    /// The surrounding context cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid client configuration.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration issue.
        message: String,
    },

    /// A request body could not be encoded or a success body could not be decoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message.
        message: String,
    },
}

impl InvoiceError {
    /// Creates a client error.
    pub fn client(message: impl Into<String>, status_code: u16) -> Self {
        InvoiceError::Client {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>, status_code: u16) -> Self {
        InvoiceError::Server {
            message: message.into(),
            status_code,
        }
    }

    /// Creates the terminal error used once all retries are spent.
    pub fn retries_exhausted() -> Self {
        InvoiceError::Unavailable {
            message: RETRIES_EXHAUSTED_MESSAGE.to_string(),
            status_code: SERVICE_UNAVAILABLE_STATUS,
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        InvoiceError::Configuration {
            message: message.into(),
        }
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, InvoiceError::Server { .. })
    }

    /// Returns the HTTP status code carried by a classified error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            InvoiceError::Client { status_code, .. }
            | InvoiceError::Server { status_code, .. }
            | InvoiceError::Unavailable { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Returns the bare message without the status suffix.
    pub fn message(&self) -> String {
        match self {
            InvoiceError::Client { message, .. }
            | InvoiceError::Server { message, .. }
            | InvoiceError::Unavailable { message, .. }
            | InvoiceError::Configuration { message }
            | InvoiceError::Serialization { message } => message.clone(),
            InvoiceError::Cancelled => self.to_string(),
        }
    }

    /// Short, stable name of the error kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            InvoiceError::Client { .. } => "client",
            InvoiceError::Server { .. } => "server",
            InvoiceError::Unavailable { .. } => "unavailable",
            InvoiceError::Cancelled => "cancelled",
            InvoiceError::Configuration { .. } => "configuration",
            InvoiceError::Serialization { .. } => "serialization",
        }
    }

    /// Builds the body a boundary layer returns alongside [`Self::status_code`].
    pub fn to_error_data(&self) -> ErrorData {
        ErrorData {
            message: self.message(),
        }
    }
}

/// Error body exposed to the callers of an HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    /// Error message.
    pub message: String,
}

impl From<serde_json::Error> for InvoiceError {
    fn from(err: serde_json::Error) -> Self {
        InvoiceError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for InvoiceError {
    fn from(err: url::ParseError) -> Self {
        InvoiceError::Configuration {
            message: format!("Invalid URL: {}", err),
        }
    }
}
