//! Credit grant allocator service.
//!
//! Administration (create, list, void, balance) plus the burn-down walk over
//! an owner's active grants. The walk itself lives in `ledgerkit_credits`;
//! this layer adds persistence.
//!
//! A burn persists each grant deduction in its own transaction. There is no
//! transaction spanning grants, so a failure mid-walk keeps the deductions
//! already applied.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use ledgerkit_core::{Currency, GrantId, LedgerConfig, LedgerError, TenantId};
use ledgerkit_credits::{
    BurnOutcome, BurnStep, CreditGrant, NewGrant, order_active, preview, take, walk,
};

use crate::error::ServiceError;
use crate::store::LedgerStore;

#[derive(Debug, Clone)]
pub struct CreditAllocator<S> {
    store: S,
    config: LedgerConfig,
}

impl<S> CreditAllocator<S> {
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}

impl<S: LedgerStore> CreditAllocator<S> {
    #[instrument(skip(self, request), fields(owner = %request.owner_id, amount = request.amount), err)]
    pub fn create_grant(
        &self,
        tenant_id: TenantId,
        request: NewGrant,
    ) -> Result<CreditGrant, ServiceError> {
        let grant = request.into_grant(self.config.default_grant_currency, Utc::now())?;
        self.store.run_in_transaction(tenant_id, |tx| {
            tx.put_grant(grant.clone())?;
            Ok::<_, ServiceError>(())
        })?;

        info!(grant_id = %grant.id, currency = %grant.currency, "created credit grant");
        Ok(grant)
    }

    /// Every grant of the owner in any state, oldest first.
    pub fn list_grants(
        &self,
        tenant_id: TenantId,
        owner_id: &str,
    ) -> Result<Vec<CreditGrant>, ServiceError> {
        let mut grants = self.store.grants_for_owner(tenant_id, owner_id)?;
        grants.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(grants)
    }

    pub fn get_grant(&self, tenant_id: TenantId, id: GrantId) -> Result<CreditGrant, ServiceError> {
        self.store
            .get_grant(tenant_id, id)?
            .ok_or(ServiceError::Ledger(LedgerError::NotFound))
    }

    /// Grants that can be spent right now, in spending order.
    pub fn active_grants(
        &self,
        tenant_id: TenantId,
        owner_id: &str,
    ) -> Result<Vec<CreditGrant>, ServiceError> {
        let grants = self.store.grants_for_owner(tenant_id, owner_id)?;
        Ok(order_active(grants, Utc::now()))
    }

    /// Unspent credit over active grants, per currency.
    pub fn credit_balance(
        &self,
        tenant_id: TenantId,
        owner_id: &str,
    ) -> Result<BTreeMap<Currency, i64>, ServiceError> {
        let mut totals = BTreeMap::new();
        for grant in self.active_grants(tenant_id, owner_id)? {
            let total = totals.entry(grant.currency).or_insert(0_i64);
            *total = total.saturating_add(grant.remaining);
        }
        Ok(totals)
    }

    #[instrument(skip(self), err)]
    pub fn void_grant(&self, tenant_id: TenantId, id: GrantId) -> Result<CreditGrant, ServiceError> {
        let voided = self.store.run_in_transaction(tenant_id, |tx| {
            let mut grant = tx.get_grant(id)?.ok_or(LedgerError::NotFound)?;
            grant.void(Utc::now())?;
            tx.put_grant(grant.clone())?;
            Ok::<_, ServiceError>(grant)
        })?;

        info!(grant_id = %voided.id, remaining = voided.remaining, "voided credit grant");
        Ok(voided)
    }

    /// Consume `amount` from the owner's active grants. `remaining` on the
    /// outcome is the overage no grant could cover.
    ///
    /// With a non-empty `meter_id`, grants whose eligibility excludes it are
    /// skipped. If a grant's transaction fails after earlier grants were
    /// deducted, the error is [`ServiceError::PartialBurn`] carrying those
    /// deductions.
    #[instrument(skip(self), err)]
    pub fn burn_credits(
        &self,
        tenant_id: TenantId,
        owner_id: &str,
        amount: i64,
        meter_id: Option<&str>,
    ) -> Result<BurnOutcome, ServiceError> {
        if amount <= 0 {
            return Ok(BurnOutcome {
                steps: Vec::new(),
                remaining: amount,
            });
        }
        let meter_id = meter_id.filter(|m| !m.is_empty());
        let candidates = self.active_grants(tenant_id, owner_id)?;

        let burn_one = |candidate: CreditGrant, outstanding: i64| -> Result<BurnStep, ServiceError> {
            let deducted = self.store.run_in_transaction(tenant_id, |tx| {
                let Some(mut grant) = tx.get_grant(candidate.id)? else {
                    return Ok::<_, ServiceError>(0);
                };
                let deducted = take(&mut grant, outstanding, meter_id, Utc::now());
                if deducted > 0 {
                    tx.put_grant(grant)?;
                } else {
                    debug!(grant_id = %candidate.id, "grant gave nothing toward burn");
                }
                Ok(deducted)
            })?;
            Ok(BurnStep {
                grant_id: candidate.id,
                deducted,
            })
        };

        match walk(candidates, amount, burn_one) {
            Ok(outcome) => {
                info!(
                    grants = outcome.steps.len(),
                    overage = outcome.remaining,
                    "burned credits"
                );
                Ok(outcome)
            }
            Err((outcome, err)) if outcome.steps.is_empty() => Err(err),
            Err((outcome, err)) => {
                warn!(
                    applied = amount - outcome.remaining,
                    error = %err,
                    "burn stopped part way"
                );
                Err(ServiceError::PartialBurn {
                    outcome,
                    source: Box::new(err),
                })
            }
        }
    }

    /// Overage an unmetered [`burn_credits`](Self::burn_credits) would return
    /// against the current grant state. Writes nothing.
    pub fn burn_credits_preview(
        &self,
        tenant_id: TenantId,
        owner_id: &str,
        amount: i64,
    ) -> Result<i64, ServiceError> {
        let grants = self.active_grants(tenant_id, owner_id)?;
        Ok(preview(&grants, amount))
    }
}
