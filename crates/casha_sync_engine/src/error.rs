//! Error types for the sync engine.

use casha_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for remote gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors returned by a remote entity gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The backend could not be reached.
    #[error("no connection: {0}")]
    Connectivity(String),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The backend rejected the request (4xx).
    #[error("client error {status}: {message}")]
    Client {
        /// HTTP status.
        status: u16,
        /// Server message.
        message: String,
    },

    /// The backend failed (5xx).
    #[error("server error {status}: {message}")]
    Server {
        /// HTTP status.
        status: u16,
        /// Server message.
        message: String,
    },
}

impl GatewayError {
    /// Classifies an HTTP error status.
    ///
    /// 408 is a timeout, other 4xx are client errors, everything else is
    /// treated as a server error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            408 => GatewayError::Timeout,
            400..=499 => GatewayError::Client { status, message },
            _ => GatewayError::Server { status, message },
        }
    }

    /// Creates a 404 client error.
    pub fn not_found(message: impl Into<String>) -> Self {
        GatewayError::Client {
            status: 404,
            message: message.into(),
        }
    }

    /// Returns true if the backend reported the entity as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::Client { status: 404, .. })
    }

    /// Returns true if the backend could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, GatewayError::Connectivity(_))
    }
}

/// Errors that can occur during a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncError {
    /// The backend became unreachable. Aborts the push phase.
    #[error("connectivity lost: {message}")]
    Connectivity {
        /// Error message.
        message: String,
    },

    /// The payload was rejected, locally or by the backend.
    #[error("validation failed: {message}")]
    ClientValidation {
        /// HTTP status, if the backend rejected it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        /// Error message.
        message: String,
    },

    /// The backend failed. Retried on the next run.
    #[error("server error {status}: {message}")]
    Server {
        /// HTTP status.
        status: u16,
        /// Error message.
        message: String,
    },

    /// A gateway call timed out. Retried on the next run.
    #[error("operation timed out")]
    Timeout,

    /// The local store failed. Ends the run.
    #[error("local store error: {message}")]
    LocalStore {
        /// Error message.
        message: String,
    },

    /// A push result could not be written back because the record kept changing.
    #[error("write-back abandoned after {attempts} attempts")]
    WriteBackConflict {
        /// Attempts made.
        attempts: usize,
    },

    /// The run was cancelled.
    #[error("sync cancelled")]
    Cancelled,

    /// The components were wired inconsistently.
    #[error("configuration error: {message}")]
    Configuration {
        /// Error message.
        message: String,
    },
}

impl SyncError {
    /// Creates a local validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ClientValidation {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns true if this error can be retried on a later run.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Connectivity { .. }
                | SyncError::Server { .. }
                | SyncError::Timeout
                | SyncError::WriteBackConflict { .. }
        )
    }

    /// Returns true if this error means the backend is unreachable.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, SyncError::Connectivity { .. })
    }

    /// Returns true if this error is a payload rejection.
    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::ClientValidation { .. })
    }
}

impl From<GatewayError> for SyncError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Connectivity(message) => SyncError::Connectivity { message },
            GatewayError::Timeout => SyncError::Timeout,
            GatewayError::Client { status, message } => SyncError::ClientValidation {
                status: Some(status),
                message,
            },
            GatewayError::Server { status, message } => SyncError::Server { status, message },
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        SyncError::LocalStore {
            message: err.to_string(),
        }
    }
}
