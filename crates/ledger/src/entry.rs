use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use ledgerkit_core::{Currency, EntryId, LedgerError, LedgerResult, Participant};

/// Kind of value movement recorded by an entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Deposit,
    Withdraw,
    Transfer,
    Hold,
    HoldRemoved,
}

impl EntryKind {
    /// Kinds a caller may record directly. Holds only come from the hold API.
    pub fn is_recordable(self) -> bool {
        matches!(
            self,
            EntryKind::Deposit | EntryKind::Withdraw | EntryKind::Transfer
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Deposit => "deposit",
            EntryKind::Withdraw => "withdraw",
            EntryKind::Transfer => "transfer",
            EntryKind::Hold => "hold",
            EntryKind::HoldRemoved => "hold_removed",
        }
    }
}

impl core::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted movement of value.
///
/// Entries are immutable once written, except that releasing a hold flips its
/// `kind` to [`EntryKind::HoldRemoved`] in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub kind: EntryKind,
    pub source: Option<Participant>,
    pub destination: Option<Participant>,
    pub currency: Currency,
    /// Positive amount in minor units (e.g. cents).
    pub amount: i64,
    /// Sandbox partition flag; never mixed with live entries.
    pub test: bool,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub metadata: Map<String, JsonValue>,
    /// Deposits only: once passed, the deposit stops counting toward balance.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn is_expired_at(&self, as_of: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < as_of)
    }

    /// True when `participant` is on either side of this entry.
    pub fn involves(&self, participant: &Participant) -> bool {
        self.source.as_ref() == Some(participant) || self.destination.as_ref() == Some(participant)
    }
}

/// Caller-supplied request to record a deposit, withdrawal or transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    pub kind: EntryKind,
    pub source: Option<Participant>,
    pub destination: Option<Participant>,
    pub currency: Option<Currency>,
    pub amount: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, JsonValue>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// An entry whose endpoints have been resolved for its kind, waiting only on
/// the funds check (if any) before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedEntry {
    pub entry: LedgerEntry,
    /// Participant whose `balance - holds` must cover the amount.
    pub debited: Option<Participant>,
}

impl NewEntry {
    fn with_kind(kind: EntryKind, currency: Currency, amount: i64) -> Self {
        Self {
            kind,
            source: None,
            destination: None,
            currency: Some(currency),
            amount,
            notes: None,
            tags: Vec::new(),
            metadata: Map::new(),
            expires_at: None,
        }
    }

    pub fn deposit(destination: Participant, currency: Currency, amount: i64) -> Self {
        Self {
            destination: Some(destination),
            ..Self::with_kind(EntryKind::Deposit, currency, amount)
        }
    }

    pub fn withdraw(source: Participant, currency: Currency, amount: i64) -> Self {
        Self {
            source: Some(source),
            ..Self::with_kind(EntryKind::Withdraw, currency, amount)
        }
    }

    pub fn transfer(
        source: Participant,
        destination: Participant,
        currency: Currency,
        amount: i64,
    ) -> Self {
        Self {
            source: Some(source),
            destination: Some(destination),
            ..Self::with_kind(EntryKind::Transfer, currency, amount)
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Stateless checks, in order: kind, amount, currency, circularity.
    pub fn validate(&self) -> LedgerResult<()> {
        if !self.kind.is_recordable() {
            return Err(LedgerError::invalid_type(self.kind));
        }
        validate_amount(self.amount)?;
        if self.currency.is_none() {
            return Err(LedgerError::CurrencyRequired);
        }
        if endpoint_key(&self.source) == endpoint_key(&self.destination) {
            return Err(LedgerError::CircularTransaction);
        }
        Ok(())
    }

    /// Resolve endpoints for the entry kind and stamp server-side fields.
    ///
    /// Withdraw drops any supplied destination and Deposit drops any supplied
    /// source. Only deposits keep `expires_at`.
    pub fn prepare(self, test: bool, now: DateTime<Utc>) -> LedgerResult<PreparedEntry> {
        self.validate()?;
        let currency = self.currency.ok_or(LedgerError::CurrencyRequired)?;

        let (source, destination, debited) = match self.kind {
            EntryKind::Withdraw => {
                let source = complete(&self.source).ok_or(LedgerError::SourceRequired)?;
                (Some(source.clone()), None, Some(source))
            }
            EntryKind::Transfer => {
                let source = complete(&self.source).ok_or(LedgerError::SourceRequired)?;
                let destination =
                    complete(&self.destination).ok_or(LedgerError::DestinationRequired)?;
                (Some(source.clone()), Some(destination), Some(source))
            }
            EntryKind::Deposit => {
                let destination =
                    complete(&self.destination).ok_or(LedgerError::DestinationRequired)?;
                (None, Some(destination), None)
            }
            EntryKind::Hold | EntryKind::HoldRemoved => {
                return Err(LedgerError::invalid_type(self.kind));
            }
        };

        let expires_at = match self.kind {
            EntryKind::Deposit => self.expires_at,
            _ => None,
        };

        Ok(PreparedEntry {
            entry: LedgerEntry {
                id: EntryId::new(),
                kind: self.kind,
                source,
                destination,
                currency,
                amount: self.amount,
                test,
                notes: self.notes,
                tags: self.tags,
                metadata: self.metadata,
                expires_at,
                created_at: now,
                updated_at: now,
            },
            debited,
        })
    }
}

pub(crate) fn validate_amount(amount: i64) -> LedgerResult<()> {
    if amount == 0 {
        return Err(LedgerError::PointlessTransaction);
    }
    if amount < 0 {
        return Err(LedgerError::NegativeAmount);
    }
    Ok(())
}

/// Raw `(id, kind)` of an endpoint, with a missing one read as `("", "")`.
fn endpoint_key(participant: &Option<Participant>) -> (&str, &str) {
    participant
        .as_ref()
        .map_or(("", ""), |p| (p.id.as_str(), p.kind.as_str()))
}

/// The participant if both its id and kind are set.
pub(crate) fn complete(participant: &Option<Participant>) -> Option<Participant> {
    participant.as_ref().filter(|p| p.is_complete()).cloned()
}
