//! Hold reservations: creation requests and in-place release.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use ledgerkit_core::{Currency, EntryId, LedgerError, LedgerResult, Participant};

use crate::entry::{EntryKind, LedgerEntry, PreparedEntry, complete, validate_amount};

/// Request to reserve part of a participant's available balance.
///
/// Holds carry the same endpoint rules as a withdrawal: a source is required
/// and there is never a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHold {
    pub source: Option<Participant>,
    pub currency: Option<Currency>,
    pub amount: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, JsonValue>,
}

impl NewHold {
    pub fn new(source: Participant, currency: Currency, amount: i64) -> Self {
        Self {
            source: Some(source),
            currency: Some(currency),
            amount,
            notes: None,
            tags: Vec::new(),
            metadata: Map::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn validate(&self) -> LedgerResult<()> {
        validate_amount(self.amount)?;
        if self.currency.is_none() {
            return Err(LedgerError::CurrencyRequired);
        }
        Ok(())
    }

    pub fn prepare(self, test: bool, now: DateTime<Utc>) -> LedgerResult<PreparedEntry> {
        self.validate()?;
        let currency = self.currency.ok_or(LedgerError::CurrencyRequired)?;
        let source = complete(&self.source).ok_or(LedgerError::SourceRequired)?;

        Ok(PreparedEntry {
            entry: LedgerEntry {
                id: EntryId::new(),
                kind: EntryKind::Hold,
                source: Some(source.clone()),
                destination: None,
                currency,
                amount: self.amount,
                test,
                notes: self.notes,
                tags: self.tags,
                metadata: self.metadata,
                expires_at: None,
                created_at: now,
                updated_at: now,
            },
            debited: Some(source),
        })
    }
}

/// Release a hold by flipping its kind to `HoldRemoved` in place.
///
/// Releasing an already released hold returns the same state again. Any other
/// kind is rejected.
pub fn release(mut entry: LedgerEntry, now: DateTime<Utc>) -> LedgerResult<LedgerEntry> {
    match entry.kind {
        EntryKind::Hold => {
            entry.kind = EntryKind::HoldRemoved;
            entry.updated_at = now;
            Ok(entry)
        }
        EntryKind::HoldRemoved => Ok(entry),
        other => Err(LedgerError::invalid_type(other)),
    }
}
