//! Credit grants: prepaid pools of credit burned down against usage cost.
//!
//! Pure domain logic only: no IO, no persistence concerns.

pub mod burn;
pub mod grant;

pub use burn::{BurnOutcome, BurnStep, burn, order_active, preview, take, walk};
pub use grant::{CreditGrant, GrantState, NewGrant};
