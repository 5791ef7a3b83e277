//! Ledger domain: entries, holds and the balance tally.
//!
//! Pure domain logic only: no IO, no persistence concerns. Reading and writing
//! entries happens in `ledgerkit-infra`, which calls into this crate for every
//! decision.

pub mod entry;
pub mod hold;
pub mod tally;

pub use entry::{EntryKind, LedgerEntry, NewEntry, PreparedEntry};
pub use hold::{NewHold, release};
pub use tally::{BalanceSnapshot, CurrencyTally, Tally};
