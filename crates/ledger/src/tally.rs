//! Balance tally: folds an owner's entries into per-currency balance and holds.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use ledgerkit_core::{Currency, LedgerError, LedgerResult, Participant};

use crate::entry::{EntryKind, LedgerEntry};

/// Derived `{balance, holds}` for one owner in one currency. Never persisted.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub balance: i64,
    pub holds: i64,
}

impl BalanceSnapshot {
    /// `balance - holds` without flooring; what a debit is checked against.
    pub fn spendable(&self) -> i64 {
        self.balance.saturating_sub(self.holds)
    }

    /// Presentation value: `max(0, balance - holds)`.
    pub fn available(&self) -> i64 {
        self.spendable().max(0)
    }

    pub fn ensure_covers(&self, amount: i64) -> LedgerResult<()> {
        if self.spendable() < amount {
            return Err(LedgerError::insufficient_funds(self.spendable(), amount));
        }
        Ok(())
    }
}

/// Snapshot plus the entries that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyTally {
    pub snapshot: BalanceSnapshot,
    pub entries: Vec<LedgerEntry>,
}

/// Per-currency tally for one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub owner: Participant,
    pub currencies: BTreeMap<Currency, CurrencyTally>,
}

impl Tally {
    /// Fold `entries` (all entries where `owner` is source or destination).
    ///
    /// - Deposit adds, Withdraw subtracts.
    /// - Transfer adds when the owner is the destination, subtracts when the
    ///   owner is the source; an entry naming the owner on neither side is
    ///   skipped.
    /// - Hold adds to `holds`; HoldRemoved has no effect.
    /// - Entries whose source and destination ids match are skipped.
    /// - Deposits whose `expires_at` is before `as_of` are skipped.
    ///
    /// Negative holds are clamped to zero afterwards.
    pub fn fold<I>(owner: Participant, entries: I, as_of: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = LedgerEntry>,
    {
        let mut currencies: BTreeMap<Currency, CurrencyTally> = BTreeMap::new();

        for entry in entries {
            let source_id = entry.source.as_ref().map(|p| p.id.as_str());
            let destination_id = entry.destination.as_ref().map(|p| p.id.as_str());
            if source_id == destination_id {
                warn!(entry_id = %entry.id, owner = %owner, "skipping self-referencing ledger entry");
                continue;
            }

            if entry.kind == EntryKind::Deposit && entry.is_expired_at(as_of) {
                continue;
            }

            let (balance_delta, holds_delta) = match entry.kind {
                EntryKind::Deposit => (entry.amount, 0),
                EntryKind::Withdraw => (-entry.amount, 0),
                EntryKind::Transfer => {
                    if entry.destination.as_ref() == Some(&owner) {
                        (entry.amount, 0)
                    } else if entry.source.as_ref() == Some(&owner) {
                        (-entry.amount, 0)
                    } else {
                        warn!(
                            entry_id = %entry.id,
                            owner = %owner,
                            "skipping transfer that does not involve the owner"
                        );
                        continue;
                    }
                }
                EntryKind::Hold => (0, entry.amount),
                EntryKind::HoldRemoved => (0, 0),
            };

            let tally = currencies.entry(entry.currency).or_default();
            tally.snapshot.balance = tally.snapshot.balance.saturating_add(balance_delta);
            tally.snapshot.holds = tally.snapshot.holds.saturating_add(holds_delta);
            tally.entries.push(entry);
        }

        for tally in currencies.values_mut() {
            if tally.snapshot.holds < 0 {
                tally.snapshot.holds = 0;
            }
        }

        Self { owner, currencies }
    }

    /// Snapshot for `currency`; zero when the owner has no entries in it.
    pub fn snapshot(&self, currency: Currency) -> BalanceSnapshot {
        self.currencies
            .get(&currency)
            .map(|t| t.snapshot)
            .unwrap_or_default()
    }

    pub fn balances(&self) -> BTreeMap<Currency, BalanceSnapshot> {
        self.currencies
            .iter()
            .map(|(currency, tally)| (*currency, tally.snapshot))
            .collect()
    }
}
