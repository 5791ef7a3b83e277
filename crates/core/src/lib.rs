//! `ledgerkit-core`: shared building blocks for the ledger and credit crates.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod config;
pub mod context;
pub mod currency;
pub mod error;
pub mod id;

pub use config::LedgerConfig;
pub use context::{LedgerContext, Participant};
pub use currency::Currency;
pub use error::{LedgerError, LedgerResult};
pub use id::{EntryId, GrantId, TenantId};
