//! Service-level error: business failures and store failures side by side.

use thiserror::Error;

use ledgerkit_core::LedgerError;
use ledgerkit_credits::BurnOutcome;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Deterministic ledger failure; nothing was persisted.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Store failure, passed through unmodified.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A credit burn failed after deducting from at least one grant. Those
    /// deductions stay committed; `outcome` lists them and `outcome.remaining`
    /// is what is still uncovered.
    #[error("credit burn stopped after {} grant deduction(s), {} left uncovered: {source}", .outcome.steps.len(), .outcome.remaining)]
    PartialBurn {
        outcome: BurnOutcome,
        source: Box<ServiceError>,
    },
}

impl ServiceError {
    pub fn ledger(&self) -> Option<&LedgerError> {
        match self {
            ServiceError::Ledger(err) => Some(err),
            ServiceError::Store(_) => None,
            ServiceError::PartialBurn { source, .. } => source.ledger(),
        }
    }

    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self.ledger(), Some(LedgerError::InsufficientFunds { .. }))
    }

    /// Deductions a failed burn already committed, if any.
    pub fn partial_burn(&self) -> Option<&BurnOutcome> {
        match self {
            ServiceError::PartialBurn { outcome, .. } => Some(outcome),
            _ => None,
        }
    }
}
