//! Error types shared across the crate.
//!
//! Per-item failures are not errors here: they are [`crate::pipeline::DropReason`]
//! values. These types cover startup misconfiguration and store faults.

use thiserror::Error;

/// A registry or normalizer configuration that cannot be used.
///
/// Raised while building, never while processing an item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("model '{0}' is registered twice")]
    DuplicateKind(String),

    #[error("model '{kind}' has no discriminator patterns")]
    NoPatterns { kind: String },

    #[error("invalid discriminator pattern '{pattern}' in model '{kind}'")]
    InvalidPattern { kind: String, pattern: String },

    #[error("pattern '{pattern}' is claimed by both '{first}' and '{second}' at equal specificity")]
    AmbiguousDiscriminator { pattern: String, first: String, second: String },

    #[error("model '{kind}' declares field '{field}' twice")]
    DuplicateField { kind: String, field: String },

    #[error("model '{kind}' refers to undeclared field '{field}'")]
    UnknownField { kind: String, field: String },

    #[error("price field '{field}' of model '{kind}' must have type price")]
    PriceFieldType { kind: String, field: String },

    #[error("condition field '{field}' of model '{kind}' must have type integer")]
    ConditionFieldType { kind: String, field: String },
}

/// A fault raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Backend(#[from] rusqlite::Error),

    #[error("corrupt record: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// True for faults that may clear on their own (busy or locked database).
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Backend(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}
