use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledgerkit_core::{Currency, GrantId, LedgerError, LedgerResult};

/// Lifecycle state of a grant at a given instant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantState {
    /// `effective_at` is still in the future.
    Scheduled,
    Active,
    Exhausted,
    Expired,
    Voided,
}

/// A pool of prepaid credit owned by one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditGrant {
    pub id: GrantId,
    pub owner_id: String,
    pub name: Option<String>,
    /// Original amount in minor units.
    pub amount: i64,
    /// Unspent amount; `0 <= remaining <= amount`, only ever decreases.
    pub remaining: i64,
    pub currency: Currency,
    /// Lower is spent first.
    pub priority: i32,
    pub effective_at: DateTime<Utc>,
    /// `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// Meters this grant may pay for; empty means any meter.
    pub eligibility: Vec<String>,
    pub tags: Vec<String>,
    pub voided: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreditGrant {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> GrantState {
        if self.voided {
            GrantState::Voided
        } else if self.is_expired_at(now) {
            GrantState::Expired
        } else if self.remaining <= 0 {
            GrantState::Exhausted
        } else if self.effective_at > now {
            GrantState::Scheduled
        } else {
            GrantState::Active
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == GrantState::Active
    }

    pub fn is_eligible_for_meter(&self, meter_id: &str) -> bool {
        self.eligibility.is_empty() || self.eligibility.iter().any(|m| m == meter_id)
    }

    /// Take up to `outstanding` from this grant. Returns the amount taken.
    pub fn deduct(&mut self, outstanding: i64, now: DateTime<Utc>) -> i64 {
        let taken = self.remaining.min(outstanding).max(0);
        if taken > 0 {
            self.remaining -= taken;
            self.updated_at = now;
        }
        taken
    }

    /// Irreversibly retire the grant.
    pub fn void(&mut self, now: DateTime<Utc>) -> LedgerResult<()> {
        if self.voided {
            return Err(LedgerError::AlreadyVoided);
        }
        self.voided = true;
        self.updated_at = now;
        Ok(())
    }
}

/// Request to create a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGrant {
    pub owner_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<Currency>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub effective_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub eligibility: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewGrant {
    pub fn new(owner_id: impl Into<String>, amount: i64) -> Self {
        Self {
            owner_id: owner_id.into(),
            name: None,
            amount,
            currency: None,
            priority: 0,
            effective_at: None,
            expires_at: None,
            eligibility: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn in_currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn effective_from(mut self, at: DateTime<Utc>) -> Self {
        self.effective_at = Some(at);
        self
    }

    pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn eligible_for<I, T>(mut self, meters: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.eligibility = meters.into_iter().map(Into::into).collect();
        self
    }

    /// Validate and build the grant with `remaining = amount`.
    pub fn into_grant(self, default_currency: Currency, now: DateTime<Utc>) -> LedgerResult<CreditGrant> {
        let owner_id = self.owner_id.trim().to_string();
        if owner_id.is_empty() {
            return Err(LedgerError::validation("owner id is required"));
        }
        if self.amount <= 0 {
            return Err(LedgerError::validation("grant amount must be positive"));
        }

        Ok(CreditGrant {
            id: GrantId::new(),
            owner_id,
            name: self.name,
            amount: self.amount,
            remaining: self.amount,
            currency: self.currency.unwrap_or(default_currency),
            priority: self.priority,
            effective_at: self.effective_at.unwrap_or(now),
            expires_at: self.expires_at,
            eligibility: self.eligibility,
            tags: self.tags,
            voided: false,
            created_at: now,
            updated_at: now,
        })
    }
}
