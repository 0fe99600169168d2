//! Error taxonomy for calls against the external providers.
//!
//! `CallError` is what a single provider operation reports. The rate-limited
//! client turns it into a `ProviderError` once its retry policy is spent.

use std::time::Duration;
use thiserror::Error;

/// Outcome of one failed provider operation, as classified by the adapter.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CallError {
    /// HTTP 429, with the provider-suggested wait if one was sent
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Timeout, connection reset, retryable 5xx
    #[error("transient failure: {0}")]
    Transient(String),

    /// Any other 4xx/5xx or a response body we could not understand
    #[error("permanent failure: {0}")]
    Permanent(String),
}

impl CallError {
    /// Classify an HTTP status that is not a success.
    pub fn from_status(status: u16, retry_after: Option<Duration>, context: &str) -> Self {
        match status {
            429 => CallError::RateLimited { retry_after },
            500 | 502 | 503 | 504 => CallError::Transient(format!("{} returned HTTP {}", context, status)),
            _ => CallError::Permanent(format!("{} returned HTTP {}", context, status)),
        }
    }
}

/// Failure surfaced by `RateLimitedClient::call` to its caller.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("{operation}: gave up after {attempts} attempts: {reason}")]
    Transient {
        operation: String,
        attempts: u32,
        reason: String,
    },

    #[error("{operation}: {reason}")]
    Permanent { operation: String, reason: String },
}

impl ProviderError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}
