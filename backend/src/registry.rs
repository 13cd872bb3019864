//! Contactability Registry
//!
//! Three independent hard blocks consulted per lead, in a fixed order:
//!
//! 1. lead-local consent (`Dnc`)
//! 2. global unsubscribe list (exact email match)
//! 3. suppression list (email / domain / identity hash, active rows only)
//!
//! The fixed order is what lets the engine attribute each skip to exactly
//! one cause in its `skipped_*` counters. All checks are pure reads against
//! append-only tables.

use std::sync::Arc;

use crate::models::lead::{ConsentStatus, Lead};
use crate::store::{BlockListStore, StoreError};

/// Outcome of a contactability check, in blame order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactDecision {
    Contactable,

    /// Lead-local consent is `Dnc`
    Dnc,

    /// Email is on the global unsubscribe list
    Unsubscribed,

    /// An active suppression row matches the email, its domain, or the
    /// lead's identity hash
    Suppressed,
}

impl ContactDecision {
    pub fn is_contactable(self) -> bool {
        self == ContactDecision::Contactable
    }
}

/// Per-lead contactability checks over the block lists
pub struct ContactabilityRegistry {
    block_lists: Arc<dyn BlockListStore>,
}

impl ContactabilityRegistry {
    pub fn new(block_lists: Arc<dyn BlockListStore>) -> Self {
        Self { block_lists }
    }

    /// Evaluate the three blocks in order: DNC, unsubscribe, suppression
    pub fn check(&self, lead: &Lead) -> Result<ContactDecision, StoreError> {
        if lead.consent_status == ConsentStatus::Dnc {
            return Ok(ContactDecision::Dnc);
        }
        if self.block_lists.is_unsubscribed(&lead.email)? {
            return Ok(ContactDecision::Unsubscribed);
        }
        let suppressed = self.block_lists.is_suppressed(
            Some(&lead.email),
            lead.email_domain(),
            Some(&lead.identity_hash),
        )?;
        if suppressed {
            return Ok(ContactDecision::Suppressed);
        }
        Ok(ContactDecision::Contactable)
    }
}
