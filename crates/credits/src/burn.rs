//! Burn-down: consuming ordered credit grants to cover a cost.

use std::cmp::Ordering;
use std::convert::Infallible;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledgerkit_core::GrantId;

use crate::grant::CreditGrant;

/// Amount taken from one grant during a burn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnStep {
    pub grant_id: GrantId,
    pub deducted: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnOutcome {
    pub steps: Vec<BurnStep>,
    /// Amount no grant could cover (overage).
    pub remaining: i64,
}

/// Spending order: priority ascending, then soonest expiry first, with
/// never-expiring grants last within their priority. Ties fall back to
/// creation time and id so the order does not depend on how the store
/// returned the grants.
fn burn_order(a: &CreditGrant, b: &CreditGrant) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| match (a.expires_at, b.expires_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Keep only grants active at `now` and sort them into spending order.
pub fn order_active<I>(grants: I, now: DateTime<Utc>) -> Vec<CreditGrant>
where
    I: IntoIterator<Item = CreditGrant>,
{
    let mut active: Vec<CreditGrant> = grants
        .into_iter()
        .filter(|g| g.is_active_at(now))
        .collect();
    active.sort_by(burn_order);
    active
}

/// One step of the walk: take from `grant` what it can give toward
/// `outstanding`, honouring meter eligibility. An empty meter id counts as no
/// meter. Returns the amount taken.
pub fn take(
    grant: &mut CreditGrant,
    outstanding: i64,
    meter_id: Option<&str>,
    now: DateTime<Utc>,
) -> i64 {
    if outstanding <= 0 || !grant.is_active_at(now) {
        return 0;
    }
    if let Some(meter) = meter_id.filter(|m| !m.is_empty()) {
        if !grant.is_eligible_for_meter(meter) {
            return 0;
        }
    }
    grant.deduct(outstanding, now)
}

/// Drive a burn over `grants` in order. `step` is handed each grant and the
/// amount still outstanding and reports what it deducted. The walk stops once
/// nothing is outstanding.
///
/// When `step` fails the walk stops there and the error comes back with the
/// outcome of the steps already applied.
pub fn walk<I, E, F>(
    grants: I,
    amount: i64,
    mut step: F,
) -> Result<BurnOutcome, (BurnOutcome, E)>
where
    I: IntoIterator,
    F: FnMut(I::Item, i64) -> Result<BurnStep, E>,
{
    let mut outcome = BurnOutcome {
        steps: Vec::new(),
        remaining: amount,
    };

    for grant in grants {
        if outcome.remaining <= 0 {
            break;
        }
        match step(grant, outcome.remaining) {
            Ok(taken) if taken.deducted > 0 => {
                outcome.remaining -= taken.deducted;
                outcome.steps.push(taken);
            }
            Ok(_) => {}
            Err(err) => return Err((outcome, err)),
        }
    }

    Ok(outcome)
}

/// Burn `amount` across `grants`, which must already be in spending order.
pub fn burn(
    grants: &mut [CreditGrant],
    amount: i64,
    meter_id: Option<&str>,
    now: DateTime<Utc>,
) -> BurnOutcome {
    walk(grants.iter_mut(), amount, |grant, outstanding| {
        Ok::<_, Infallible>(BurnStep {
            grant_id: grant.id,
            deducted: take(grant, outstanding, meter_id, now),
        })
    })
    .unwrap_or_else(|(_, never)| match never {})
}

/// What [`burn`] would leave uncovered without a meter, mutating nothing.
pub fn preview(grants: &[CreditGrant], amount: i64) -> i64 {
    let mut remaining = amount;
    for grant in grants {
        if remaining <= 0 {
            break;
        }
        remaining -= grant.remaining.min(remaining).max(0);
    }
    remaining
}
