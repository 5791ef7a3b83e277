//! Transaction recorder: validates and persists deposits, withdrawals and
//! transfers.
//!
//! ```text
//! NewEntry
//!   ↓
//! 1. Stateless validation (kind, amount, currency, circularity)
//!   ↓  ── atomic transaction ──
//! 2. Resolve endpoints for the kind
//! 3. Tally the debited participant (withdraw / transfer only)
//! 4. Require balance - holds >= amount
//! 5. Persist the entry
//! ```
//!
//! Steps 2-5 run inside one store transaction, so two concurrent debits
//! against the same owner cannot both pass the funds check.

use chrono::Utc;
use tracing::{info, instrument, warn};

use ledgerkit_core::{EntryId, LedgerContext, LedgerError};
use ledgerkit_ledger::{LedgerEntry, NewEntry};

use crate::error::ServiceError;
use crate::store::LedgerStore;
use crate::tally::tally_in_tx;

#[derive(Debug, Clone)]
pub struct TransactionRecorder<S> {
    store: S,
}

impl<S> TransactionRecorder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: LedgerStore> TransactionRecorder<S> {
    /// Record a deposit, withdrawal or transfer.
    ///
    /// Holds are rejected with `InvalidType`; they only come from the hold API.
    #[instrument(
        skip(self, ctx, request),
        fields(tenant = %ctx.tenant_id, test = ctx.test, kind = %request.kind, amount = request.amount),
        err
    )]
    pub fn record(
        &self,
        ctx: &LedgerContext,
        request: NewEntry,
    ) -> Result<LedgerEntry, ServiceError> {
        if let Err(err) = request.validate() {
            warn!(error = %err, "rejected ledger entry");
            return Err(err.into());
        }

        let entry = self.store.run_in_transaction(ctx.tenant_id, |tx| {
            let now = Utc::now();
            let prepared = request.clone().prepare(ctx.test, now)?;
            let entry = prepared.entry;

            if let Some(debited) = &prepared.debited {
                let snapshot =
                    tally_in_tx(tx, ctx, debited, Some(entry.currency), now)?.snapshot(entry.currency);
                if let Err(err) = snapshot.ensure_covers(entry.amount) {
                    warn!(
                        owner = %debited,
                        currency = %entry.currency,
                        balance = snapshot.balance,
                        holds = snapshot.holds,
                        "insufficient funds"
                    );
                    return Err(err.into());
                }
            }

            tx.put_entry(entry.clone())?;
            Ok::<_, ServiceError>(entry)
        })?;

        info!(entry_id = %entry.id, currency = %entry.currency, "recorded ledger entry");
        Ok(entry)
    }

    /// Load one entry from the context's partition.
    pub fn get(&self, ctx: &LedgerContext, id: EntryId) -> Result<LedgerEntry, ServiceError> {
        self.store
            .get_entry(ctx.tenant_id, id)?
            .filter(|e| e.test == ctx.test)
            .ok_or(ServiceError::Ledger(LedgerError::NotFound))
    }
}
