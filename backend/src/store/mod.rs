//! Repository traits over the shared store
//!
//! The engine never touches storage directly; it is constructed with trait
//! objects for each table it needs. The reference implementation is the
//! in-memory [`memory::InMemoryStore`]; a SQL-backed store can satisfy the
//! same contracts as long as it honors the two atomicity requirements:
//!
//! - [`LeaseStore::try_claim`] performs its check-then-insert atomically
//!   (this is the single-writer guarantee)
//! - [`JobLedger::create_job_if_absent`] never persists two jobs with the
//!   same idempotency key
//!
//! All traits are `Send + Sync`: ticks for different campaigns may run from
//! different threads sharing one store.

pub mod memory;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::campaign::{CampaignConfig, Channel};
use crate::models::job::DistributionJob;
use crate::models::lead::Lead;
use crate::models::run::{OrchestrationRun, RunProgress, RunStatus};
use crate::models::suppression::{SuppressionEntry, UnsubscribeEntry};

/// Errors surfaced by store implementations
///
/// Campaign and lead misses are not errors: `get_campaign`/`get_lead`
/// return `Option` and the engine decides what a miss means (a missing
/// campaign is a [`crate::safety::SafetyViolation`], not a store fault).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    JobNotFound(Uuid),

    #[error("run not found: {0}")]
    RunNotFound(Uuid),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Campaign configuration reads (and operator-side writes)
pub trait CampaignStore: Send + Sync {
    /// Fetch a campaign configuration; `None` when unknown
    fn get_campaign(&self, campaign_id: Uuid) -> Result<Option<CampaignConfig>, StoreError>;

    /// Insert or replace a campaign configuration
    ///
    /// Operator/admin surface only. The engine never calls this.
    fn put_campaign(&self, campaign: CampaignConfig) -> Result<(), StoreError>;
}

/// Lead state tracker
pub trait LeadStore: Send + Sync {
    fn get_lead(&self, lead_id: Uuid) -> Result<Option<Lead>, StoreError>;

    /// Insert or replace a lead
    fn put_lead(&self, lead: Lead) -> Result<(), StoreError>;

    /// Up to `limit` leads of `campaign_id` with `next_action_at <= now` and
    /// consent other than DNC, oldest-due first
    ///
    /// DNC leads are excluded here, at the query level, so they never enter
    /// the engine's loop at all.
    fn due_leads(
        &self,
        campaign_id: Uuid,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Lead>, StoreError>;
}

/// Distribution ledger: append-mostly dispatch attempt slots
pub trait JobLedger: Send + Sync {
    /// Create a `Pending` job for the `(lead, message, step)` slot unless a
    /// job with the same idempotency key already exists
    ///
    /// Returns the job plus `created = true` when a new row was inserted, or
    /// the pre-existing row with `created = false`.
    fn create_job_if_absent(
        &self,
        campaign_id: Uuid,
        lead_id: Uuid,
        message_id: &str,
        step_index: u32,
        channel: Channel,
    ) -> Result<(DistributionJob, bool), StoreError>;

    fn get_job(&self, job_id: Uuid) -> Result<Option<DistributionJob>, StoreError>;

    /// Replace a job row (status/retry transitions)
    fn update_job(&self, job: DistributionJob) -> Result<(), StoreError>;

    /// Number of `Sent`/`SentProof` jobs of `campaign_id` executed at or
    /// after `since` — drives the daily quota
    fn count_sent_since(
        &self,
        campaign_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// All jobs for a campaign (reporting and tests)
    fn jobs_for_campaign(&self, campaign_id: Uuid) -> Result<Vec<DistributionJob>, StoreError>;
}

/// Single-writer lease coordination
pub trait LeaseStore: Send + Sync {
    /// Atomically claim the campaign lease
    ///
    /// Returns `None` when another worker holds a live, unexpired run.
    /// Expired leases are claimable (crash recovery).
    fn try_claim(
        &self,
        campaign_id: Uuid,
        worker_id: &str,
        lease_duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<OrchestrationRun>, StoreError>;

    /// Heartbeat: extend the lease
    fn refresh_lease(
        &self,
        run_id: Uuid,
        lease_duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Add monotonic counter increments to the run
    fn update_progress(&self, run_id: Uuid, deltas: RunProgress) -> Result<(), StoreError>;

    /// Finalize the run and release the lease
    fn mark_completed(
        &self,
        run_id: Uuid,
        now: DateTime<Utc>,
        status: RunStatus,
        error: Option<String>,
    ) -> Result<(), StoreError>;

    fn get_run(&self, run_id: Uuid) -> Result<Option<OrchestrationRun>, StoreError>;
}

/// Unsubscribe and suppression reads (and operator-side writes)
pub trait BlockListStore: Send + Sync {
    /// Exact-match check against the unsubscribe list
    fn is_unsubscribed(&self, email: &str) -> Result<bool, StoreError>;

    /// Whether **any** supplied identifier matches an active suppression row
    ///
    /// An email is also checked against domain-level suppressions via its
    /// domain part.
    fn is_suppressed(
        &self,
        email: Option<&str>,
        domain: Option<&str>,
        identity_hash: Option<&str>,
    ) -> Result<bool, StoreError>;

    /// Append an unsubscribe record (operator / bounce handling)
    fn add_unsubscribe(&self, entry: UnsubscribeEntry) -> Result<(), StoreError>;

    /// Append a suppression record (operator / complaint handling)
    fn add_suppression(&self, entry: SuppressionEntry) -> Result<(), StoreError>;
}
