//! Hold lifecycle: reserve against available balance, release in place.

use chrono::Utc;
use tracing::{info, instrument, warn};

use ledgerkit_core::{EntryId, LedgerContext, LedgerError};
use ledgerkit_ledger::{LedgerEntry, NewHold, release};

use crate::error::ServiceError;
use crate::store::LedgerStore;
use crate::tally::tally_in_tx;

#[derive(Debug, Clone)]
pub struct HoldManager<S> {
    store: S,
}

impl<S> HoldManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: LedgerStore> HoldManager<S> {
    /// Reserve `amount` of the source's available balance.
    ///
    /// The funds check and the write share one atomic transaction, exactly as
    /// for a withdrawal.
    #[instrument(
        skip(self, ctx, request),
        fields(tenant = %ctx.tenant_id, test = ctx.test, amount = request.amount),
        err
    )]
    pub fn create_hold(
        &self,
        ctx: &LedgerContext,
        request: NewHold,
    ) -> Result<LedgerEntry, ServiceError> {
        if let Err(err) = request.validate() {
            warn!(error = %err, "rejected hold");
            return Err(err.into());
        }

        let hold = self.store.run_in_transaction(ctx.tenant_id, |tx| {
            let now = Utc::now();
            let prepared = request.clone().prepare(ctx.test, now)?;
            let hold = prepared.entry;

            if let Some(source) = &prepared.debited {
                let snapshot =
                    tally_in_tx(tx, ctx, source, Some(hold.currency), now)?.snapshot(hold.currency);
                if let Err(err) = snapshot.ensure_covers(hold.amount) {
                    warn!(
                        owner = %source,
                        currency = %hold.currency,
                        balance = snapshot.balance,
                        holds = snapshot.holds,
                        "insufficient funds for hold"
                    );
                    return Err(err.into());
                }
            }

            tx.put_entry(hold.clone())?;
            Ok::<_, ServiceError>(hold)
        })?;

        info!(entry_id = %hold.id, currency = %hold.currency, "placed hold");
        Ok(hold)
    }

    /// Release a hold: its kind becomes `HoldRemoved` and it stops counting
    /// toward holds. Releasing twice rewrites the same state.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_id, test = ctx.test), err)]
    pub fn release_hold(
        &self,
        ctx: &LedgerContext,
        hold_id: EntryId,
    ) -> Result<LedgerEntry, ServiceError> {
        let released = self.store.run_in_transaction(ctx.tenant_id, |tx| {
            let hold = tx
                .get_entry(hold_id)?
                .filter(|e| e.test == ctx.test)
                .ok_or(LedgerError::NotFound)?;
            let released = release(hold, Utc::now())?;
            tx.put_entry(released.clone())?;
            Ok::<_, ServiceError>(released)
        })?;

        info!(entry_id = %released.id, "released hold");
        Ok(released)
    }
}
