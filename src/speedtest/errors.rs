//! Speed test error types
//!
//! `TransportError` covers a single request; it is absorbed by the phase that issued
//! it. `SpeedTestError` is a run-level failure and ends up in the published result.

use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("Failed to build HTTP client: {message}")]
    Client { message: String },

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Server returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed reading response from {url}: {message}")]
    Body { url: String, message: String },
}

impl TransportError {
    pub(crate) fn request(url: &str, error: impl ToString) -> Self {
        TransportError::Request {
            url: url.to_string(),
            message: error.to_string(),
        }
    }

    pub(crate) fn body(url: &str, error: impl ToString) -> Self {
        TransportError::Body {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Run-level failure
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpeedTestError {
    #[error("Speed test cancelled")]
    Cancelled,

    #[error("{0}")]
    Network(#[from] TransportError),

    #[error("Could not connect to speed test servers")]
    Unreachable,

    #[error("{0}")]
    Failed(String),
}

/// Most recent transport error seen by any worker of a run
#[derive(Debug, Clone, Default)]
pub struct LastError {
    slot: Arc<Mutex<Option<TransportError>>>,
}

impl LastError {
    pub fn record(&self, error: TransportError) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    pub fn take(&self) -> Option<TransportError> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}
