//! Balance tally service: fetches an owner's entries and folds them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use ledgerkit_core::{Currency, LedgerContext, Participant};
use ledgerkit_ledger::{BalanceSnapshot, LedgerEntry, Tally};

use crate::error::ServiceError;
use crate::store::{EntryQuery, LedgerStore, LedgerTx, Side, StoreError};

/// Read side of the ledger: `Tally(owner, currency?)`.
#[derive(Debug, Clone)]
pub struct BalanceTally<S> {
    store: S,
}

impl<S> BalanceTally<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: LedgerStore> BalanceTally<S> {
    /// Tally every currency (or just `currency`) for `owner` in the context's
    /// partition.
    pub fn tally(
        &self,
        ctx: &LedgerContext,
        owner: &Participant,
        currency: Option<Currency>,
    ) -> Result<Tally, ServiceError> {
        let tally = fold_owner(
            |query| self.store.query_entries(ctx.tenant_id, query),
            ctx,
            owner,
            currency,
            Utc::now(),
        )?;
        debug!(
            tenant = %ctx.tenant_id,
            test = ctx.test,
            owner = %owner,
            currencies = tally.currencies.len(),
            "tallied ledger entries"
        );
        Ok(tally)
    }

    pub fn snapshot(
        &self,
        ctx: &LedgerContext,
        owner: &Participant,
        currency: Currency,
    ) -> Result<BalanceSnapshot, ServiceError> {
        Ok(self.tally(ctx, owner, Some(currency))?.snapshot(currency))
    }

    pub fn balances(
        &self,
        ctx: &LedgerContext,
        owner: &Participant,
    ) -> Result<BTreeMap<Currency, BalanceSnapshot>, ServiceError> {
        Ok(self.tally(ctx, owner, None)?.balances())
    }
}

/// Tally inside an open transaction, so the read joins its atomic scope.
pub(crate) fn tally_in_tx(
    tx: &dyn LedgerTx,
    ctx: &LedgerContext,
    owner: &Participant,
    currency: Option<Currency>,
    as_of: DateTime<Utc>,
) -> Result<Tally, StoreError> {
    fold_owner(|query| tx.query_entries(query), ctx, owner, currency, as_of)
}

/// Every entry where `owner` is either endpoint, fetched in one read so both
/// sides come from the same committed state, folded into one tally.
fn fold_owner<F>(
    fetch: F,
    ctx: &LedgerContext,
    owner: &Participant,
    currency: Option<Currency>,
    as_of: DateTime<Utc>,
) -> Result<Tally, StoreError>
where
    F: Fn(&EntryQuery) -> Result<Vec<LedgerEntry>, StoreError>,
{
    let query = EntryQuery::new(ctx.test, owner.clone(), Side::Either).in_currency(currency);
    let entries = fetch(&query)?;
    Ok(Tally::fold(owner.clone(), entries, as_of))
}
