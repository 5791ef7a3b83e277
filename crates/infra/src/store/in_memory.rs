use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use ledgerkit_core::{EntryId, GrantId, LedgerConfig, TenantId};
use ledgerkit_credits::CreditGrant;
use ledgerkit_ledger::LedgerEntry;

use super::r#trait::{EntryQuery, LedgerStore, LedgerTx, StoreError};

/// Committed state of one tenant.
///
/// `version` is bumped on every committed write and acts as the optimistic
/// concurrency token for the whole tenant.
#[derive(Debug, Default)]
struct TenantData {
    version: u64,
    entries: Vec<LedgerEntry>,
    entry_index: HashMap<EntryId, usize>,
    grants: Vec<CreditGrant>,
    grant_index: HashMap<GrantId, usize>,
}

impl TenantData {
    fn query_entries(&self, query: &EntryQuery) -> Vec<LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect()
    }

    fn get_entry(&self, id: EntryId) -> Option<LedgerEntry> {
        self.entry_index
            .get(&id)
            .and_then(|idx| self.entries.get(*idx))
            .cloned()
    }

    fn upsert_entry(&mut self, entry: LedgerEntry) {
        match self.entry_index.get(&entry.id).copied() {
            Some(idx) => self.entries[idx] = entry,
            None => {
                self.entry_index.insert(entry.id, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    fn grants_for_owner(&self, owner_id: &str) -> Vec<CreditGrant> {
        self.grants
            .iter()
            .filter(|g| g.owner_id == owner_id)
            .cloned()
            .collect()
    }

    fn get_grant(&self, id: GrantId) -> Option<CreditGrant> {
        self.grant_index
            .get(&id)
            .and_then(|idx| self.grants.get(*idx))
            .cloned()
    }

    fn upsert_grant(&mut self, grant: CreditGrant) {
        match self.grant_index.get(&grant.id).copied() {
            Some(idx) => self.grants[idx] = grant,
            None => {
                self.grant_index.insert(grant.id, self.grants.len());
                self.grants.push(grant);
            }
        }
    }
}

/// In-memory transactional ledger store.
///
/// Intended for tests/dev. Transactions are optimistic: writes are buffered,
/// and commit succeeds only if no other write landed in the same tenant since
/// the transaction began. Conflicting transactions are re-run up to
/// `max_attempts` times.
#[derive(Debug)]
pub struct InMemoryLedgerStore {
    tenants: RwLock<HashMap<TenantId, TenantData>>,
    max_attempts: u32,
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::with_config(&LedgerConfig::default())
    }
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &LedgerConfig) -> Self {
        Self {
            tenants: RwLock::new(HashMap::new()),
            max_attempts: config.max_transaction_attempts.max(1),
        }
    }

    fn read<R>(
        &self,
        tenant_id: TenantId,
        f: impl FnOnce(Option<&TenantData>) -> R,
    ) -> Result<R, StoreError> {
        let tenants = self
            .tenants
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(f(tenants.get(&tenant_id)))
    }

    fn commit(
        &self,
        tenant_id: TenantId,
        base_version: u64,
        writes: PendingWrites,
    ) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut tenants = self
            .tenants
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        let data = tenants.entry(tenant_id).or_default();

        if data.version != base_version {
            return Err(StoreError::Conflict(format!(
                "tenant {tenant_id} moved from version {base_version} to {}",
                data.version
            )));
        }

        for entry in writes.entries {
            data.upsert_entry(entry);
        }
        for grant in writes.grants {
            data.upsert_grant(grant);
        }
        data.version += 1;
        Ok(())
    }
}

/// Buffered writes, last write per id wins.
#[derive(Debug, Default)]
struct PendingWrites {
    entries: Vec<LedgerEntry>,
    grants: Vec<CreditGrant>,
}

impl PendingWrites {
    fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.grants.is_empty()
    }

    fn entry(&self, id: EntryId) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    fn grant(&self, id: GrantId) -> Option<&CreditGrant> {
        self.grants.iter().find(|g| g.id == id)
    }
}

struct InMemoryTx<'a> {
    store: &'a InMemoryLedgerStore,
    tenant_id: TenantId,
    pending: PendingWrites,
}

impl LedgerTx for InMemoryTx<'_> {
    fn query_entries(&self, query: &EntryQuery) -> Result<Vec<LedgerEntry>, StoreError> {
        let committed = self
            .store
            .read(self.tenant_id, |data| data.map(|d| d.query_entries(query)))?
            .unwrap_or_default();

        let mut entries: Vec<LedgerEntry> = committed
            .into_iter()
            .filter(|e| self.pending.entry(e.id).is_none())
            .collect();
        entries.extend(
            self.pending
                .entries
                .iter()
                .filter(|e| query.matches(e))
                .cloned(),
        );
        Ok(entries)
    }

    fn get_entry(&self, id: EntryId) -> Result<Option<LedgerEntry>, StoreError> {
        if let Some(entry) = self.pending.entry(id) {
            return Ok(Some(entry.clone()));
        }
        self.store.get_entry(self.tenant_id, id)
    }

    fn put_entry(&mut self, entry: LedgerEntry) -> Result<(), StoreError> {
        self.pending.entries.retain(|e| e.id != entry.id);
        self.pending.entries.push(entry);
        Ok(())
    }

    fn grants_for_owner(&self, owner_id: &str) -> Result<Vec<CreditGrant>, StoreError> {
        let committed = self.store.grants_for_owner(self.tenant_id, owner_id)?;

        let mut grants: Vec<CreditGrant> = committed
            .into_iter()
            .filter(|g| self.pending.grant(g.id).is_none())
            .collect();
        grants.extend(
            self.pending
                .grants
                .iter()
                .filter(|g| g.owner_id == owner_id)
                .cloned(),
        );
        Ok(grants)
    }

    fn get_grant(&self, id: GrantId) -> Result<Option<CreditGrant>, StoreError> {
        if let Some(grant) = self.pending.grant(id) {
            return Ok(Some(grant.clone()));
        }
        self.store.get_grant(self.tenant_id, id)
    }

    fn put_grant(&mut self, grant: CreditGrant) -> Result<(), StoreError> {
        self.pending.grants.retain(|g| g.id != grant.id);
        self.pending.grants.push(grant);
        Ok(())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn query_entries(
        &self,
        tenant_id: TenantId,
        query: &EntryQuery,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self
            .read(tenant_id, |data| data.map(|d| d.query_entries(query)))?
            .unwrap_or_default())
    }

    fn get_entry(
        &self,
        tenant_id: TenantId,
        id: EntryId,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        self.read(tenant_id, |data| data.and_then(|d| d.get_entry(id)))
    }

    fn grants_for_owner(
        &self,
        tenant_id: TenantId,
        owner_id: &str,
    ) -> Result<Vec<CreditGrant>, StoreError> {
        Ok(self
            .read(tenant_id, |data| data.map(|d| d.grants_for_owner(owner_id)))?
            .unwrap_or_default())
    }

    fn get_grant(
        &self,
        tenant_id: TenantId,
        id: GrantId,
    ) -> Result<Option<CreditGrant>, StoreError> {
        self.read(tenant_id, |data| data.and_then(|d| d.get_grant(id)))
    }

    fn run_in_transaction<T, E, F>(&self, tenant_id: TenantId, mut f: F) -> Result<T, E>
    where
        F: FnMut(&mut dyn LedgerTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        for attempt in 1..=self.max_attempts {
            let base_version = self.read(tenant_id, |data| data.map_or(0, |d| d.version))?;

            let mut tx = InMemoryTx {
                store: self,
                tenant_id,
                pending: PendingWrites::default(),
            };
            let value = f(&mut tx as &mut dyn LedgerTx)?;

            match self.commit(tenant_id, base_version, tx.pending) {
                Ok(()) => return Ok(value),
                Err(StoreError::Conflict(reason)) => {
                    debug!(tenant = %tenant_id, attempt, %reason, "transaction conflict, retrying");
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(StoreError::Conflict(format!(
            "tenant {tenant_id}: gave up after {} attempts",
            self.max_attempts
        ))
        .into())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use chrono::Utc;
    use ledgerkit_core::{Currency, Participant};
    use ledgerkit_credits::NewGrant;
    use ledgerkit_ledger::NewEntry;

    use super::*;
    use crate::store::Side;

    fn alice() -> Participant {
        Participant::new("alice", "user")
    }

    fn deposit(test: bool, amount: i64) -> LedgerEntry {
        NewEntry::deposit(alice(), Currency::Usd, amount)
            .prepare(test, Utc::now())
            .unwrap()
            .entry
    }

    fn insert(store: &InMemoryLedgerStore, tenant_id: TenantId, entry: LedgerEntry) {
        store
            .run_in_transaction(tenant_id, |tx| tx.put_entry(entry.clone()))
            .unwrap();
    }

    #[test]
    fn committed_entries_are_queryable() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let entry = deposit(false, 100);
        insert(&store, tenant_id, entry.clone());

        let query = EntryQuery::new(false, alice(), Side::Destination);
        assert_eq!(store.query_entries(tenant_id, &query).unwrap(), vec![entry.clone()]);
        assert_eq!(store.get_entry(tenant_id, entry.id).unwrap(), Some(entry));
    }

    #[test]
    fn queries_respect_tenant_partition_and_side() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        insert(&store, tenant_id, deposit(false, 100));
        insert(&store, tenant_id, deposit(true, 5));

        let live = EntryQuery::new(false, alice(), Side::Destination);
        let test = EntryQuery::new(true, alice(), Side::Destination);
        let as_source = EntryQuery::new(false, alice(), Side::Source);

        assert_eq!(store.query_entries(tenant_id, &live).unwrap().len(), 1);
        assert_eq!(store.query_entries(tenant_id, &test).unwrap()[0].amount, 5);
        assert!(store.query_entries(tenant_id, &as_source).unwrap().is_empty());
        assert!(store.query_entries(TenantId::new(), &live).unwrap().is_empty());
    }

    #[test]
    fn either_side_query_returns_each_entry_once() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let bob = Participant::new("bob", "user");
        let transfer = NewEntry::transfer(alice(), bob.clone(), Currency::Usd, 30)
            .prepare(false, Utc::now())
            .unwrap()
            .entry;
        insert(&store, tenant_id, deposit(false, 100));
        insert(&store, tenant_id, transfer.clone());

        let alice_any = EntryQuery::new(false, alice(), Side::Either);
        let bob_any = EntryQuery::new(false, bob, Side::Either);
        assert_eq!(store.query_entries(tenant_id, &alice_any).unwrap().len(), 2);
        assert_eq!(store.query_entries(tenant_id, &bob_any).unwrap(), vec![transfer]);
    }

    #[test]
    fn failed_transaction_writes_nothing() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let entry = deposit(false, 100);

        let result: Result<(), StoreError> = store.run_in_transaction(tenant_id, |tx| {
            tx.put_entry(entry.clone())?;
            Err(StoreError::Unavailable("aborted".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(store.get_entry(tenant_id, entry.id).unwrap(), None);
    }

    #[test]
    fn transaction_reads_its_own_writes() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let entry = deposit(false, 100);
        let grant = NewGrant::new("alice", 50)
            .into_grant(Currency::Usd, Utc::now())
            .unwrap();

        store
            .run_in_transaction(tenant_id, |tx| {
                tx.put_entry(entry.clone())?;
                tx.put_grant(grant.clone())?;
                let query = EntryQuery::new(false, alice(), Side::Destination);
                assert_eq!(tx.query_entries(&query)?.len(), 1);
                assert_eq!(tx.get_entry(entry.id)?, Some(entry.clone()));
                assert_eq!(tx.grants_for_owner("alice")?, vec![grant.clone()]);
                Ok::<_, StoreError>(())
            })
            .unwrap();
    }

    #[test]
    fn overwritten_entry_is_not_duplicated_in_queries() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let entry = deposit(false, 100);
        insert(&store, tenant_id, entry.clone());

        let mut updated = entry.clone();
        updated.notes = Some("annotated".to_string());
        store
            .run_in_transaction(tenant_id, |tx| {
                tx.put_entry(updated.clone())?;
                let query = EntryQuery::new(false, alice(), Side::Destination);
                let seen = tx.query_entries(&query)?;
                assert_eq!(seen, vec![updated.clone()]);
                Ok::<_, StoreError>(())
            })
            .unwrap();

        assert_eq!(store.get_entry(tenant_id, entry.id).unwrap(), Some(updated));
    }

    #[test]
    fn conflicting_commit_is_retried() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let attempts = Cell::new(0);
        let ours = deposit(false, 1);

        store
            .run_in_transaction(tenant_id, |tx| {
                attempts.set(attempts.get() + 1);
                if attempts.get() == 1 {
                    // Another writer commits while this transaction is open.
                    insert(&store, tenant_id, deposit(false, 7));
                }
                tx.put_entry(ours.clone())
            })
            .unwrap();

        assert_eq!(attempts.get(), 2);
        let query = EntryQuery::new(false, alice(), Side::Destination);
        assert_eq!(store.query_entries(tenant_id, &query).unwrap().len(), 2);
    }

    #[test]
    fn conflict_surfaces_after_retry_budget() {
        let config = LedgerConfig::default().with_max_transaction_attempts(2);
        let store = InMemoryLedgerStore::with_config(&config);
        let tenant_id = TenantId::new();
        let attempts = Cell::new(0);

        let result = store.run_in_transaction(tenant_id, |tx| {
            attempts.set(attempts.get() + 1);
            insert(&store, tenant_id, deposit(false, 7));
            tx.put_entry(deposit(false, 1))
        });

        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(attempts.get(), 2);
    }

    #[test]
    fn read_only_transactions_never_conflict() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let attempts = Cell::new(0);

        store
            .run_in_transaction(tenant_id, |tx| {
                attempts.set(attempts.get() + 1);
                insert(&store, tenant_id, deposit(false, 7));
                tx.get_entry(EntryId::new()).map(|_| ())
            })
            .unwrap();

        assert_eq!(attempts.get(), 1);
    }
}
