use thiserror::Error;

/// Validation and contract errors exposed by `monaspect-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("asset id cannot be empty")]
    EmptyAssetId,
    #[error("news title cannot be empty")]
    EmptyTitle,

    #[error("invalid timeframe '{value}', expected one of LIVE, 1D, 1W, 1M, 1Y")]
    InvalidTimeframe { value: String },
    #[error("invalid horizon '{value}', expected short or long")]
    InvalidHorizon { value: String },
    #[error("invalid fetch strategy '{value}', expected sequential or race")]
    InvalidStrategy { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("unix timestamp {value} is out of range")]
    TimestampOutOfRange { value: i64 },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("source name '{name}' is registered more than once")]
    DuplicateSource { name: String },
    #[error("source registry must contain at least one source")]
    EmptyRegistry,

    #[error("invalid setting {key}='{value}': {reason}")]
    InvalidSetting {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}
