//! Ledger configuration.

use anyhow::{Context, bail};

use crate::currency::Currency;

pub const ENV_TX_MAX_ATTEMPTS: &str = "LEDGER_TX_MAX_ATTEMPTS";
pub const ENV_DEFAULT_CURRENCY: &str = "LEDGER_DEFAULT_CURRENCY";

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Optimistic attempts per atomic transaction before a conflict is surfaced.
    pub max_transaction_attempts: u32,
    /// Currency applied to grant requests that omit one.
    pub default_grant_currency: Currency,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_transaction_attempts: 3,
            default_grant_currency: Currency::Usd,
        }
    }
}

impl LedgerConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_TX_MAX_ATTEMPTS) {
            let attempts: u32 = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_TX_MAX_ATTEMPTS} must be a positive integer, got '{raw}'"))?;
            if attempts == 0 {
                bail!("{ENV_TX_MAX_ATTEMPTS} must be at least 1");
            }
            config.max_transaction_attempts = attempts;
        }

        if let Some(raw) = lookup(ENV_DEFAULT_CURRENCY) {
            config.default_grant_currency = raw
                .parse()
                .with_context(|| format!("{ENV_DEFAULT_CURRENCY} is not a supported currency"))?;
        }

        Ok(config)
    }

    pub fn with_max_transaction_attempts(mut self, attempts: u32) -> Self {
        self.max_transaction_attempts = attempts.max(1);
        self
    }

    pub fn with_default_grant_currency(mut self, currency: Currency) -> Self {
        self.default_grant_currency = currency;
        self
    }
}
