//! Typed error hierarchy for the settlement console.
//!
//! Three top-level enums cover the three subsystems:
//! - `BackendError`: calls against the settlement system of record
//! - `DateError`: settlement date parsing
//! - `BatchError`: batch orchestration refusals

use thiserror::Error;

/// The envelope status code the backend uses to signal success.
pub const SUCCESS_STATUS: &str = "00";

/// Errors from a single call against the settlement backend.
///
/// `Application` means the call reached the backend and it reported a logical
/// failure. Every other variant is a transport-class failure: the call did not
/// complete or its answer could not be understood.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend rejected {operation} with status {status_code}: {msg}")]
    Application {
        operation: &'static str,
        status_code: String,
        msg: String,
    },

    #[error("Request to {operation} failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} returned HTTP {status}")]
    Http {
        operation: &'static str,
        status: u16,
    },

    #[error("Failed to decode {operation} response: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

impl BackendError {
    /// The backend answered with a non-success envelope.
    pub fn is_application(&self) -> bool {
        matches!(self, Self::Application { .. })
    }

    /// The call itself failed or its response was unusable.
    pub fn is_transport(&self) -> bool {
        !self.is_application()
    }

    /// Name of the backend operation that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Application { operation, .. }
            | Self::Transport { operation, .. }
            | Self::Http { operation, .. }
            | Self::Decode { operation, .. } => operation,
        }
    }
}

/// Errors from parsing a settlement date.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("Settlement date '{0}' must be YYYYMMDD, YYYY/MM/DD or YYYY-MM-DD")]
    Malformed(String),

    #[error("Settlement date '{0}' is not a calendar date")]
    OutOfRange(String),
}

/// Errors from the batch orchestrator.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("A batch run for {date} is already in progress")]
    AlreadyRunning { date: String },
}
