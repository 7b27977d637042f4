//! Typed errors at the component seams.
//!
//! Application glue (`main`, config loading) uses `anyhow`; everything that
//! callers need to match on is modeled here.

use thiserror::Error;

/// Failure of a single upstream HTTP request (after retries, where retried).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {url} timed out after {attempts} attempt(s)")]
    Timeout { url: String, attempts: u32 },

    #[error("connection failure for {url} after {attempts} attempt(s): {detail}")]
    Connect {
        url: String,
        attempts: u32,
        detail: String,
    },

    #[error("HTTP {status} from {url} after {attempts} attempt(s)")]
    Status {
        url: String,
        status: u16,
        attempts: u32,
    },

    #[error("invalid JSON from {url}: {detail}")]
    Decode { url: String, detail: String },

    #[error("request error for {url}: {detail}")]
    Request { url: String, detail: String },

    #[error("every query for {source_name} failed: {last}")]
    AllQueriesFailed { source_name: String, last: String },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout { .. } | FetchError::Connect { .. } | FetchError::Status { .. }
        )
    }

    pub(crate) fn with_attempts(self, n: u32) -> Self {
        match self {
            FetchError::Timeout { url, .. } => FetchError::Timeout { url, attempts: n },
            FetchError::Connect { url, detail, .. } => FetchError::Connect {
                url,
                attempts: n,
                detail,
            },
            FetchError::Status { url, status, .. } => FetchError::Status {
                url,
                status,
                attempts: n,
            },
            other => other,
        }
    }
}

/// A single event that could not be turned into a canonical record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("event has {found} participant(s), expected 2")]
    Participants { found: usize },

    #[error("event is not a JSON object")]
    NotAnObject,

    #[error("result set {0} is missing")]
    MissingResultSet(&'static str),
}

/// Configuration values that parse but make no sense.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no source configured for {0}")]
    NoSources(String),

    #[error("date range is inverted: {from} is after {to}")]
    InvertedRange { from: String, to: String },

    #[error("utc offset {0} hours is out of range")]
    BadOffset(i32),

    #[error("unknown source {0} referenced")]
    UnknownSource(String),
}
