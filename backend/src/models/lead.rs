//! Lead model
//!
//! One lead per contactable entity per campaign. The orchestrator owns the
//! contact cursor: status, next/last contact timestamps, the routing-sequence
//! pointer and the append-only engagement notes. Lead creation (capture) and
//! reply handling are external.
//!
//! Leads are never deleted. `ConsentStatus::Dnc` is the terminal soft-delete:
//! such a lead is excluded from eligibility queries and must never appear in
//! a distribution job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Per-lead consent state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsentStatus {
    /// No explicit signal either way
    Unknown,

    /// Explicit opt-in
    Consented,

    /// Do Not Contact: terminal hard block on all channels
    Dnc,
}

/// Lead lifecycle status
///
/// The orchestrator only ever moves a lead to `Contacted`; the later states
/// are written by reply handling and qualification (external).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadStatus {
    New,
    Contacted,
    Responded,
    Qualified,
    Won,
    Lost,
}

/// A contactable entity within a campaign
///
/// # Example
/// ```
/// use campaign_orchestrator_core_rs::models::lead::{ConsentStatus, Lead};
/// use uuid::Uuid;
///
/// let lead = Lead::new(
///     Uuid::new_v4(),
///     "ada@example.com",
///     "cold_intro",
/// );
/// assert_eq!(lead.consent_status, ConsentStatus::Unknown);
/// assert_eq!(lead.sequence_cursor, 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    /// Unique lead identifier
    pub id: Uuid,

    /// Owning campaign
    pub campaign_id: Uuid,

    /// Primary contact email (lowercased on construction)
    pub email: String,

    /// Dedup key: SHA-256 over the normalized primary identifier
    pub identity_hash: String,

    /// Consent state; `Dnc` is terminal
    pub consent_status: ConsentStatus,

    /// Name of the message sequence this lead follows
    pub routing_sequence: String,

    /// Position in the routing sequence (next step to send)
    pub sequence_cursor: u32,

    /// Lifecycle status
    pub status: LeadStatus,

    /// When the lead next becomes eligible; `None` = nothing scheduled
    /// (sequence exhausted)
    pub next_action_at: Option<DateTime<Utc>>,

    /// Last successful contact, if any
    pub last_contacted_at: Option<DateTime<Utc>>,

    /// Append-only log of step markers
    pub engagement_notes: String,
}

impl Lead {
    /// Create a fresh lead at the start of `routing_sequence`
    ///
    /// The lead is `New`/`Unknown` with no `next_action_at`; callers schedule
    /// the first action explicitly (see [`Lead::schedule_at`]).
    pub fn new(campaign_id: Uuid, email: &str, routing_sequence: &str) -> Self {
        let email = email.trim().to_ascii_lowercase();
        let identity_hash = identity_hash(&email);
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            email,
            identity_hash,
            consent_status: ConsentStatus::Unknown,
            routing_sequence: routing_sequence.to_string(),
            sequence_cursor: 0,
            status: LeadStatus::New,
            next_action_at: None,
            last_contacted_at: None,
            engagement_notes: String::new(),
        }
    }

    /// Domain part of the lead's email, if well-formed
    pub fn email_domain(&self) -> Option<&str> {
        self.email.split_once('@').map(|(_, d)| d)
    }

    /// Schedule the next action
    pub fn schedule_at(&mut self, at: DateTime<Utc>) {
        self.next_action_at = Some(at);
    }

    /// Whether this lead is due for processing at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        matches!(self.next_action_at, Some(at) if at <= now)
            && self.consent_status != ConsentStatus::Dnc
    }

    /// Record a successful dispatch of `step_index`
    ///
    /// Moves the lead to `Contacted`, stamps `last_contacted_at`, advances the
    /// sequence cursor past the sent step, schedules the next action (or
    /// clears it when the sequence is exhausted) and appends a step marker to
    /// the engagement notes.
    pub fn record_contact(
        &mut self,
        step_index: u32,
        channel: crate::models::campaign::Channel,
        now: DateTime<Utc>,
        next_action_at: Option<DateTime<Utc>>,
    ) {
        self.status = LeadStatus::Contacted;
        self.last_contacted_at = Some(now);
        self.sequence_cursor = step_index + 1;
        self.next_action_at = next_action_at;
        self.append_note(&format!(
            "step {} sent via {} at {}",
            step_index,
            channel,
            now.to_rfc3339()
        ));
    }

    /// Append one marker line to the engagement notes
    pub fn append_note(&mut self, note: &str) {
        if !self.engagement_notes.is_empty() {
            self.engagement_notes.push('\n');
        }
        self.engagement_notes.push_str(note);
    }
}

/// Compute the dedup identity hash for a normalized identifier
///
/// Hex-encoded SHA-256. Callers are responsible for normalization (trim,
/// lowercase); [`Lead::new`] does this for emails.
pub fn identity_hash(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}
