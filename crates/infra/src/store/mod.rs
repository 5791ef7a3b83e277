//! Transactional store boundary for entries and grants.
//!
//! The ledger assumes only what is defined here: filtered queries, single-row
//! lookups and an atomic read-modify-write scope with store-managed retry.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use r#trait::{EntryQuery, LedgerStore, LedgerTx, Side, StoreError};
