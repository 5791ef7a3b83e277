//! Ledger error taxonomy.

use thiserror::Error;

/// Result type used across the ledger and credit domains.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Deterministic business failure raised by ledger and credit operations.
///
/// Every variant is produced before anything is persisted. Storage failures
/// are not represented here; they travel separately as infrastructure errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The entry kind is not accepted by the entrypoint that received it.
    #[error("invalid entry type for this operation: {0}")]
    InvalidType(String),

    /// Zero-amount movement.
    #[error("transaction amount must not be zero")]
    PointlessTransaction,

    /// Amounts are positive minor units.
    #[error("transaction amount must not be negative")]
    NegativeAmount,

    #[error("currency is required")]
    CurrencyRequired,

    /// Source and destination name the same participant.
    #[error("source and destination must not be the same participant")]
    CircularTransaction,

    #[error("source id and kind are required")]
    SourceRequired,

    #[error("destination id and kind are required")]
    DestinationRequired,

    /// `balance - holds` does not cover the requested amount.
    #[error("insufficient funds: {available} available, {requested} requested")]
    InsufficientFunds { available: i64, requested: i64 },

    /// Unknown entry or grant id.
    #[error("not found")]
    NotFound,

    #[error("credit grant is already voided")]
    AlreadyVoided,

    /// An identifier failed to parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A request value failed validation (malformed input).
    #[error("validation failed: {0}")]
    Validation(String),
}

impl LedgerError {
    pub fn invalid_type(kind: impl core::fmt::Display) -> Self {
        Self::InvalidType(kind.to_string())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn insufficient_funds(available: i64, requested: i64) -> Self {
        Self::InsufficientFunds {
            available,
            requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_funds_message_names_both_amounts() {
        let err = LedgerError::insufficient_funds(3000, 3500);
        assert_eq!(
            err.to_string(),
            "insufficient funds: 3000 available, 3500 requested"
        );
    }

    #[test]
    fn invalid_type_renders_kind() {
        let err = LedgerError::invalid_type("hold");
        assert_eq!(err, LedgerError::InvalidType("hold".to_string()));
    }
}
