//! Distribution job model
//!
//! One job per dispatch *attempt slot*: a ledger entry keyed by a
//! deterministic idempotency key derived from `(lead_id, message_id,
//! step_index)`. The ledger is append-mostly; jobs are never deleted and
//! terminal jobs remain for audit.
//!
//! # State Machine
//!
//! ```text
//! Pending --dispatch success--> Sent | SentProof        (terminal)
//! Pending --dispatch failure, retry_count < max--> RetryScheduled
//! RetryScheduled --retry success--> Sent                (terminal)
//! RetryScheduled --retry failure, retry_count == max--> Failed (terminal)
//! (any non-terminal) --pre-dispatch check fails--> Blocked (terminal)
//! ```
//!
//! # Critical Invariants
//!
//! - No two jobs share an idempotency key (enforced by the ledger)
//! - A terminal job is never re-dispatched
//! - Backoff: `next_retry_at = now + base_delay * 2^(retry_count - 1)`,
//!   exponent capped at [`BACKOFF_EXPONENT_CAP`]

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::models::campaign::Channel;

/// Default retry base delay: 300 seconds
pub const BASE_RETRY_DELAY_SECS: i64 = 300;

/// Default maximum retries before a job is permanently `Failed`
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Cap on the backoff exponent so a raised `max_retries` cannot schedule
/// retries arbitrarily far out
pub const BACKOFF_EXPONENT_CAP: u32 = 10;

/// Job lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Created, not yet attempted
    Pending,

    /// Dispatched via a live channel adapter
    Sent,

    /// Dispatched in proof mode (no external call made)
    SentProof,

    /// Retries exhausted
    Failed,

    /// A safety, contactability or render check failed before dispatch
    Blocked,

    /// Failed transiently; eligible again at `next_retry_at`
    RetryScheduled,
}

impl JobStatus {
    /// Terminal statuses are never re-dispatched
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Sent | JobStatus::SentProof | JobStatus::Failed | JobStatus::Blocked
        )
    }
}

/// Errors from job state transitions
#[derive(Debug, Error, PartialEq)]
pub enum JobError {
    #[error("job is already terminal ({0:?})")]
    AlreadyTerminal(JobStatus),
}

/// Ledger entry for a single dispatch attempt slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionJob {
    /// Unique job identifier
    pub id: Uuid,

    /// Owning campaign
    pub campaign_id: Uuid,

    /// Target lead
    pub lead_id: Uuid,

    /// Channel the step dispatches on
    pub channel: Channel,

    /// Deterministic key over `(lead_id, message_id, step_index)`; unique
    /// across the ledger
    pub idempotency_key: String,

    /// Position in the lead's routing sequence
    pub step_index: u32,

    /// Current status
    pub status: JobStatus,

    /// Number of failed attempts so far
    pub retry_count: u32,

    /// Failure budget before the job is permanently `Failed`
    pub max_retries: u32,

    /// Earliest time a `RetryScheduled` job may be re-attempted
    pub next_retry_at: Option<DateTime<Utc>>,

    /// Provider-side message id returned by the channel adapter
    pub external_message_id: Option<String>,

    /// Last error message, if any
    pub error: Option<String>,

    /// When the job reached `Sent`/`SentProof`
    pub executed_at: Option<DateTime<Utc>>,
}

impl DistributionJob {
    /// Create a `Pending` job for one `(lead, message, step)` slot
    pub fn new(
        campaign_id: Uuid,
        lead_id: Uuid,
        message_id: &str,
        step_index: u32,
        channel: Channel,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            lead_id,
            channel,
            idempotency_key: idempotency_key(lead_id, message_id, step_index),
            step_index,
            status: JobStatus::Pending,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            next_retry_at: None,
            external_message_id: None,
            error: None,
            executed_at: None,
        }
    }

    /// Whether the job may be attempted at `now`
    ///
    /// `Pending` jobs are always attemptable; `RetryScheduled` jobs only once
    /// `next_retry_at` has passed. Terminal jobs never.
    pub fn attemptable(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            JobStatus::Pending => true,
            JobStatus::RetryScheduled => {
                matches!(self.next_retry_at, Some(at) if at <= now)
            }
            _ => false,
        }
    }

    /// Record a successful dispatch
    ///
    /// `proof` selects the `SentProof` terminal status (simulated dispatch).
    pub fn record_success(
        &mut self,
        external_message_id: Option<String>,
        proof: bool,
        now: DateTime<Utc>,
    ) -> Result<(), JobError> {
        if self.status.is_terminal() {
            return Err(JobError::AlreadyTerminal(self.status));
        }
        self.status = if proof {
            JobStatus::SentProof
        } else {
            JobStatus::Sent
        };
        self.external_message_id = external_message_id;
        self.executed_at = Some(now);
        self.next_retry_at = None;
        self.error = None;
        Ok(())
    }

    /// Record a failed dispatch attempt
    ///
    /// Increments `retry_count`; schedules a retry with exponential backoff
    /// while budget remains, otherwise moves to terminal `Failed`.
    pub fn record_failure(&mut self, error: &str, now: DateTime<Utc>) -> Result<(), JobError> {
        if self.status.is_terminal() {
            return Err(JobError::AlreadyTerminal(self.status));
        }
        self.retry_count += 1;
        self.error = Some(error.to_string());
        if self.retry_count >= self.max_retries {
            self.status = JobStatus::Failed;
            self.next_retry_at = None;
        } else {
            self.status = JobStatus::RetryScheduled;
            self.next_retry_at = Some(now + backoff_delay(self.retry_count));
        }
        Ok(())
    }

    /// Terminally block the job before dispatch
    pub fn block(&mut self, reason: &str) -> Result<(), JobError> {
        if self.status.is_terminal() {
            return Err(JobError::AlreadyTerminal(self.status));
        }
        self.status = JobStatus::Blocked;
        self.error = Some(reason.to_string());
        self.next_retry_at = None;
        Ok(())
    }
}

/// Deterministic idempotency key for a `(lead, message, step)` triple
///
/// Hex-encoded SHA-256 over `lead_id:message_id:step_index`. Stable across
/// processes and re-deployed workers, which is what makes re-running a tick
/// after a crash safe.
pub fn idempotency_key(lead_id: Uuid, message_id: &str, step_index: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(lead_id.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(message_id.as_bytes());
    hasher.update(b":");
    hasher.update(step_index.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Exponential backoff delay after the `retry_count`-th failure
///
/// First failure (`retry_count == 1`) waits one base delay; each further
/// failure doubles it, capped at `2^BACKOFF_EXPONENT_CAP`.
pub fn backoff_delay(retry_count: u32) -> Duration {
    let exponent = retry_count.saturating_sub(1).min(BACKOFF_EXPONENT_CAP);
    Duration::seconds(BASE_RETRY_DELAY_SECS * (1i64 << exponent))
}
