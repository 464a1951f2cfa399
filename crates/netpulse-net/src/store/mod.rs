//! ---
//! np_section: "05-networking-external-interfaces"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Metrics store contract."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::time::Duration;

use async_trait::async_trait;
use netpulse_schema::{Batch, SchemaError};

pub mod influx;

/// Failure of a single batch write.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// The batch could not be encoded; retrying cannot help.
    #[error("batch encoding failed: {0}")]
    Encode(#[from] SchemaError),
    /// The store could not be reached.
    #[error("connection to store failed: {0}")]
    Connect(String),
    /// The request did not complete within the configured timeout.
    #[error("store request timed out after {0:?}")]
    Timeout(Duration),
    /// The store answered with a status worth retrying (5xx, 408, 429).
    #[error("store unavailable (HTTP {status}): {body}")]
    Unavailable {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
    /// The store refused the batch (4xx other than 408 and 429).
    #[error("store rejected batch (HTTP {status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
    /// Any other transport failure.
    #[error("store request failed: {0}")]
    Transport(String),
}

impl StoreError {
    /// Whether a later attempt with the same batch may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Connect(_)
            | StoreError::Timeout(_)
            | StoreError::Unavailable { .. }
            | StoreError::Transport(_) => true,
            StoreError::Encode(_) | StoreError::Rejected { .. } => false,
        }
    }

    /// Classify an HTTP status that is not a success.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        if status >= 500 || status == 408 || status == 429 {
            StoreError::Unavailable { status, body }
        } else {
            StoreError::Rejected { status, body }
        }
    }
}

/// Destination for batches. A write either stores the whole batch or fails.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Write every point of `batch` in one request.
    async fn write(&self, batch: &Batch) -> Result<(), StoreError>;

    /// Short identifier for logs.
    fn describe(&self) -> String;
}
