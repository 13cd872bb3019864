//! Unsubscribe and suppression block-list models
//!
//! Both lists are append-only hard blocks written by operator tooling or
//! bounce/complaint handling, never by the orchestrator. The engine only
//! reads them. The single mutation anywhere is an operator toggling a
//! suppression row's `active` flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Global unsubscribe record, exact-match on email
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsubscribeEntry {
    /// Normalized (lowercased) email address
    pub email: String,

    /// Why the address unsubscribed (link click, reply, operator action)
    pub reason: String,

    pub created_at: DateTime<Utc>,
}

impl UnsubscribeEntry {
    pub fn new(email: &str, reason: &str, now: DateTime<Utc>) -> Self {
        Self {
            email: email.trim().to_ascii_lowercase(),
            reason: reason.to_string(),
            created_at: now,
        }
    }
}

/// What a suppression entry matches against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuppressionKind {
    /// Exact email match
    Email,

    /// Entire email domain
    Domain,

    /// Lead identity hash (covers phone/LinkedIn identities too)
    IdentityHash,
}

/// Suppression record: broader than unsubscribe, independent of per-lead
/// consent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionEntry {
    pub kind: SuppressionKind,

    /// Normalized value matched against (email, domain or hash)
    pub value: String,

    pub reason: String,

    /// Operators may deactivate a row instead of deleting it
    pub active: bool,

    pub created_at: DateTime<Utc>,
}

impl SuppressionEntry {
    pub fn new(kind: SuppressionKind, value: &str, reason: &str, now: DateTime<Utc>) -> Self {
        Self {
            kind,
            value: value.trim().to_ascii_lowercase(),
            reason: reason.to_string(),
            active: true,
            created_at: now,
        }
    }

    /// Whether this entry blocks the given identifiers
    ///
    /// An email is matched both exactly and by its domain part, so a
    /// domain-level suppression blocks every address at that domain.
    pub fn matches(
        &self,
        email: Option<&str>,
        domain: Option<&str>,
        identity_hash: Option<&str>,
    ) -> bool {
        if !self.active {
            return false;
        }
        match self.kind {
            SuppressionKind::Email => email.is_some_and(|e| e == self.value),
            SuppressionKind::Domain => domain.is_some_and(|d| d == self.value),
            SuppressionKind::IdentityHash => identity_hash.is_some_and(|h| h == self.value),
        }
    }
}
