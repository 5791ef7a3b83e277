//! Explicit request context and ledger participants.

use serde::{Deserialize, Serialize};

use crate::id::TenantId;

/// Partition every ledger operation runs against.
///
/// The tenant namespace and the live/test flag are passed explicitly into each
/// operation. Test entries form a fully separate accounting namespace: no query
/// ever mixes the two.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerContext {
    pub tenant_id: TenantId,
    pub test: bool,
}

impl LedgerContext {
    pub fn live(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            test: false,
        }
    }

    pub fn test(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            test: true,
        }
    }
}

/// One side of a ledger entry: an owner identified by id and kind
/// (e.g. `("u_123", "user")`, `("w_9", "wallet")`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub kind: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
        }
    }

    /// Both id and kind are set.
    pub fn is_complete(&self) -> bool {
        !self.id.trim().is_empty() && !self.kind.trim().is_empty()
    }
}

impl core::fmt::Display for Participant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_incomplete() {
        assert!(Participant::new("u1", "user").is_complete());
        assert!(!Participant::new("", "user").is_complete());
        assert!(!Participant::new("u1", "  ").is_complete());
    }

    #[test]
    fn display_is_kind_then_id() {
        assert_eq!(Participant::new("u1", "user").to_string(), "user/u1");
    }

    #[test]
    fn live_and_test_contexts_differ() {
        let tenant = TenantId::new();
        assert_ne!(LedgerContext::live(tenant), LedgerContext::test(tenant));
    }
}
