//! Typed failures for one source attempt and for a whole failover round.

use serde::Serialize;
use thiserror::Error;

use crate::ValidationError;

/// Failure of a single gateway attempt, or of a whole failover round.
///
/// `Clone` so one single-flight outcome can be handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("no response within {deadline_ms} ms")]
    Timeout { deadline_ms: u64 },

    #[error("upstream answered with HTTP {0}")]
    BadStatus(u16),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("insufficient data: {got} usable record(s), need {need}")]
    InsufficientData { got: usize, need: usize },

    #[error("source '{source_name}' is disabled: {reason}")]
    Disabled { source_name: String, reason: String },

    #[error("all {attempted} source(s) exhausted")]
    AllSourcesExhausted {
        attempted: usize,
        failures: Vec<SourceFailure>,
    },
}

impl FetchError {
    pub fn exhausted(failures: Vec<SourceFailure>) -> Self {
        Self::AllSourcesExhausted {
            attempted: failures.len(),
            failures,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "fetch.timeout",
            Self::BadStatus(_) => "fetch.bad_status",
            Self::Transport(_) => "fetch.transport",
            Self::MalformedPayload(_) => "fetch.malformed_payload",
            Self::InsufficientData { .. } => "fetch.insufficient_data",
            Self::Disabled { .. } => "fetch.disabled",
            Self::AllSourcesExhausted { .. } => "fetch.all_sources_exhausted",
        }
    }

    /// Whether a later attempt against the same source could succeed.
    pub const fn retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport(_) | Self::AllSourcesExhausted { .. } => true,
            Self::BadStatus(status) => *status == 429 || *status >= 500,
            Self::MalformedPayload(_) | Self::InsufficientData { .. } | Self::Disabled { .. } => {
                false
            }
        }
    }
}

/// Error returned by a source transform when a body cannot be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransformError(pub String);

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<serde_json::Error> for TransformError {
    fn from(value: serde_json::Error) -> Self {
        Self(format!("invalid json: {value}"))
    }
}

impl From<ValidationError> for TransformError {
    fn from(value: ValidationError) -> Self {
        Self(value.to_string())
    }
}

impl From<TransformError> for FetchError {
    fn from(value: TransformError) -> Self {
        Self::MalformedPayload(value.0)
    }
}

/// One failed attempt in a failover round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl SourceFailure {
    pub fn new(source: impl Into<String>, error: &FetchError) -> Self {
        Self {
            source: source.into(),
            code: error.code(),
            message: error.to_string(),
            retryable: error.retryable(),
        }
    }
}
