//! Orchestration run model (lease)
//!
//! One run row per tick attempt. The row doubles as the single-writer lease:
//! for a given campaign, at most one run may be live (`Claimed`/`Running`)
//! with an unexpired lease. A lease that expires without being refreshed is
//! assumed abandoned (worker crashed) and becomes claimable again — lease
//! expiry is the system's only crash-recovery mechanism.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Run lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Lease claimed, batch not started
    Claimed,

    /// Batch in progress
    Running,

    /// Halted early by the Safety Gate (pause / kill switch)
    Stopped,

    /// Finalization recorded a fatal error
    Failed,

    /// Batch finished normally
    Completed,
}

impl RunStatus {
    /// Live runs hold the lease
    pub fn is_live(self) -> bool {
        matches!(self, RunStatus::Claimed | RunStatus::Running)
    }
}

/// Monotonic progress counters for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunProgress {
    pub leads_processed: u64,
    pub jobs_created: u64,
    pub attempts_succeeded: u64,
    pub attempts_failed: u64,
}

impl RunProgress {
    /// Add counter deltas (increments only)
    pub fn add(&mut self, deltas: &RunProgress) {
        self.leads_processed += deltas.leads_processed;
        self.jobs_created += deltas.jobs_created;
        self.attempts_succeeded += deltas.attempts_succeeded;
        self.attempts_failed += deltas.attempts_failed;
    }
}

/// A single orchestration run holding the campaign lease
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationRun {
    /// Unique run identifier
    pub id: Uuid,

    /// Campaign this run holds the lease for
    pub campaign_id: Uuid,

    /// Lifecycle status
    pub status: RunStatus,

    /// Worker identity that claimed the lease
    pub claimed_by: String,

    /// Lease expiry; past this instant the campaign is claimable again
    pub lease_expires_at: DateTime<Utc>,

    /// Last heartbeat (claim or refresh)
    pub heartbeat_at: DateTime<Utc>,

    /// Monotonic progress counters
    pub progress: RunProgress,

    /// Error recorded at finalization, if any
    pub last_error: Option<String>,
}

impl OrchestrationRun {
    /// Claim a fresh lease for `campaign_id`
    pub fn claim(
        campaign_id: Uuid,
        worker_id: &str,
        lease_duration: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            status: RunStatus::Claimed,
            claimed_by: worker_id.to_string(),
            lease_expires_at: now + lease_duration,
            heartbeat_at: now,
            progress: RunProgress::default(),
            last_error: None,
        }
    }

    /// Whether this run still holds the lease at `now`
    pub fn holds_lease(&self, now: DateTime<Utc>) -> bool {
        self.status.is_live() && self.lease_expires_at >= now
    }

    /// Heartbeat: extend the lease and mark the run `Running`
    pub fn refresh(&mut self, lease_duration: Duration, now: DateTime<Utc>) {
        self.status = RunStatus::Running;
        self.lease_expires_at = now + lease_duration;
        self.heartbeat_at = now;
    }

    /// Finalize the run, releasing the lease
    pub fn finalize(&mut self, status: RunStatus, error: Option<String>, now: DateTime<Utc>) {
        self.status = status;
        self.last_error = error;
        self.heartbeat_at = now;
        // Expired on purpose so the campaign is immediately claimable
        self.lease_expires_at = now;
    }
}
