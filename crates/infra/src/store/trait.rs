use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ledgerkit_core::{Currency, EntryId, GrantId, Participant, TenantId};
use ledgerkit_credits::CreditGrant;
use ledgerkit_ledger::LedgerEntry;

/// Which side of an entry a query matches the participant against.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Source,
    Destination,
    /// Source or destination; lets one read cover every entry an owner touches.
    Either,
}

/// Filtered entry query. Always scoped to one live/test partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryQuery {
    pub test: bool,
    pub participant: Participant,
    pub side: Side,
    pub currency: Option<Currency>,
}

impl EntryQuery {
    pub fn new(test: bool, participant: Participant, side: Side) -> Self {
        Self {
            test,
            participant,
            side,
            currency: None,
        }
    }

    pub fn in_currency(mut self, currency: Option<Currency>) -> Self {
        self.currency = currency;
        self
    }

    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        if entry.test != self.test {
            return false;
        }
        if self.currency.is_some_and(|c| c != entry.currency) {
            return false;
        }
        let is_owner = |side: &Option<Participant>| side.as_ref() == Some(&self.participant);
        match self.side {
            Side::Source => is_owner(&entry.source),
            Side::Destination => is_owner(&entry.destination),
            Side::Either => is_owner(&entry.source) || is_owner(&entry.destination),
        }
    }
}

/// Store operation error.
///
/// These are **infrastructure errors**; they reach callers unmodified and are
/// never mapped onto the ledger's business error taxonomy.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A concurrent transaction committed first and the retry budget ran out.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Reads and buffered writes inside one atomic transaction.
///
/// Reads observe the transaction's own pending writes. Nothing is visible to
/// other callers until the transaction commits.
pub trait LedgerTx {
    fn query_entries(&self, query: &EntryQuery) -> Result<Vec<LedgerEntry>, StoreError>;
    fn get_entry(&self, id: EntryId) -> Result<Option<LedgerEntry>, StoreError>;
    fn put_entry(&mut self, entry: LedgerEntry) -> Result<(), StoreError>;

    fn grants_for_owner(&self, owner_id: &str) -> Result<Vec<CreditGrant>, StoreError>;
    fn get_grant(&self, id: GrantId) -> Result<Option<CreditGrant>, StoreError>;
    fn put_grant(&mut self, grant: CreditGrant) -> Result<(), StoreError>;
}

/// Tenant-scoped transactional store for ledger entries and credit grants.
///
/// ## Transaction semantics
///
/// `run_in_transaction` executes `f` against a [`LedgerTx`] and commits its
/// writes atomically. Implementations detect conflicting commits within the
/// tenant and re-run `f` from scratch, up to their configured attempt budget,
/// before surfacing [`StoreError::Conflict`]. An error returned by `f` aborts
/// the transaction without retry and discards every pending write.
pub trait LedgerStore: Send + Sync {
    fn query_entries(
        &self,
        tenant_id: TenantId,
        query: &EntryQuery,
    ) -> Result<Vec<LedgerEntry>, StoreError>;

    fn get_entry(
        &self,
        tenant_id: TenantId,
        id: EntryId,
    ) -> Result<Option<LedgerEntry>, StoreError>;

    fn grants_for_owner(
        &self,
        tenant_id: TenantId,
        owner_id: &str,
    ) -> Result<Vec<CreditGrant>, StoreError>;

    fn get_grant(
        &self,
        tenant_id: TenantId,
        id: GrantId,
    ) -> Result<Option<CreditGrant>, StoreError>;

    fn run_in_transaction<T, E, F>(&self, tenant_id: TenantId, f: F) -> Result<T, E>
    where
        F: FnMut(&mut dyn LedgerTx) -> Result<T, E>,
        E: From<StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore,
{
    fn query_entries(
        &self,
        tenant_id: TenantId,
        query: &EntryQuery,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        (**self).query_entries(tenant_id, query)
    }

    fn get_entry(
        &self,
        tenant_id: TenantId,
        id: EntryId,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        (**self).get_entry(tenant_id, id)
    }

    fn grants_for_owner(
        &self,
        tenant_id: TenantId,
        owner_id: &str,
    ) -> Result<Vec<CreditGrant>, StoreError> {
        (**self).grants_for_owner(tenant_id, owner_id)
    }

    fn get_grant(
        &self,
        tenant_id: TenantId,
        id: GrantId,
    ) -> Result<Option<CreditGrant>, StoreError> {
        (**self).get_grant(tenant_id, id)
    }

    fn run_in_transaction<T, E, F>(&self, tenant_id: TenantId, f: F) -> Result<T, E>
    where
        F: FnMut(&mut dyn LedgerTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        (**self).run_in_transaction(tenant_id, f)
    }
}
