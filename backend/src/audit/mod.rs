//! Audit trail
//!
//! Every state-changing engine action — job created, job transition, lead
//! mutation, lease claim/release — is additionally recorded here for
//! compliance. Appends are fire-and-forget: an audit failure must never
//! block or fail a dispatch, so the sink trait is infallible and
//! implementations swallow (and log) their own errors.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Mutex;

/// Actor recorded for engine-originated writes
pub const SYSTEM_ACTOR: &str = "system";

/// One audit record
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// Entity kind: "job", "lead", "run"
    pub entity_type: String,

    /// Entity identifier (uuid rendered as string)
    pub entity_id: String,

    /// What happened, e.g. "job_created", "lead_contacted", "lease_claimed"
    pub action: String,

    /// Who did it; `"system"` for everything the engine writes
    pub actor: String,

    /// Freeform structured context (old/new status, error text, counters)
    pub context: Value,

    pub at: DateTime<Utc>,
}

impl AuditEntry {
    /// Build a system-actor entry
    pub fn system(
        entity_type: &str,
        entity_id: impl ToString,
        action: &str,
        context: Value,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            action: action.to_string(),
            actor: SYSTEM_ACTOR.to_string(),
            context,
            at,
        }
    }
}

/// Append-only audit sink
pub trait AuditSink: Send + Sync {
    /// Fire-and-forget append
    fn append(&self, entry: AuditEntry);
}

/// In-memory audit log, the reference sink
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries appended so far
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all entries (tests and reporting)
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Entries matching an action name
    pub fn entries_for_action(&self, action: &str) -> Vec<AuditEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.action == action)
            .collect()
    }
}

impl AuditSink for InMemoryAuditLog {
    fn append(&self, entry: AuditEntry) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(_) => tracing::warn!("audit log mutex poisoned; entry dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn appends_are_recorded_in_order() {
        let log = InMemoryAuditLog::new();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        log.append(AuditEntry::system("job", "j1", "job_created", json!({}), now));
        log.append(AuditEntry::system(
            "lead",
            "l1",
            "lead_contacted",
            json!({"step": 0}),
            now,
        ));

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "job_created");
        assert_eq!(entries[1].actor, SYSTEM_ACTOR);
        assert_eq!(log.entries_for_action("lead_contacted").len(), 1);
    }
}
