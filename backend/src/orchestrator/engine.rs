//! Tick loop implementation
//!
//! One tick, in order:
//!
//! ```text
//! 1. Claim the campaign lease (contention => empty no-op result)
//! 2. Query up to batch_size due leads (DNC excluded at the query)
//! 3. Per lead: Safety Gate — a violation stops the whole loop
//! 4. Per lead: contactability (unsubscribe, suppression) and daily quota
//! 5. Resolve the next sequence step; idempotency check against the ledger
//! 6. Render and dispatch (or simulate in proof mode)
//! 7. Ledger + lead + audit writes
//! 8. Finalize the lease with a progress summary
//! ```
//!
//! # Failure semantics
//!
//! A safety violation is a deliberate full stop for the remainder of the
//! batch. Any other per-lead failure is caught, recorded in
//! [`TickResult::errors`], and processing continues with the next lead.
//! A store failure while claiming or finalizing the lease is fatal and
//! surfaces as [`TickError`].
//!
//! # Crash safety
//!
//! A crash at any point leaves the ledger in a state the next tick resumes
//! from correctly: job creation is idempotent per `(lead, message, step)`,
//! terminal jobs are never re-attempted, and the abandoned lease expires.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditSink};
use crate::core::time::day_start;
use crate::dispatch::sequence::{SequenceError, SequenceResolver, SequenceStep};
use crate::dispatch::{ChannelAdapter, DispatchError, TemplateRenderer};
use crate::models::campaign::CampaignConfig;
use crate::models::job::{DistributionJob, JobError, JobStatus};
use crate::models::lead::Lead;
use crate::models::run::{RunProgress, RunStatus};
use crate::orchestrator::{ConfigError, OrchestratorConfig};
use crate::registry::{ContactDecision, ContactabilityRegistry};
use crate::safety::check_campaign_safety;
use crate::store::{BlockListStore, CampaignStore, JobLedger, LeaseStore, LeadStore, StoreError};

/// Repository handles the engine is constructed with
///
/// All are trait objects so tests and deployments can inject their own
/// implementations; [`crate::store::memory::InMemoryStore`] satisfies every
/// trait at once.
pub struct Stores {
    pub campaigns: Arc<dyn CampaignStore>,
    pub leads: Arc<dyn LeadStore>,
    pub ledger: Arc<dyn JobLedger>,
    pub leases: Arc<dyn LeaseStore>,
    pub block_lists: Arc<dyn BlockListStore>,
}

/// External collaborators at the dispatch boundary
pub struct Collaborators {
    pub resolver: Arc<dyn SequenceResolver>,
    pub renderer: Arc<dyn TemplateRenderer>,

    /// May be `None` in proof mode only
    pub adapter: Option<Arc<dyn ChannelAdapter>>,

    pub audit: Arc<dyn AuditSink>,
}

/// Aggregated outcome of one tick
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickResult {
    /// Run that held the lease; `None` when the claim was contended
    pub run_id: Option<Uuid>,

    /// Leads that entered the loop (skips included, not-yet-attempted
    /// leads after a safety stop excluded)
    pub leads_processed: u64,

    /// New ledger rows created this tick
    pub jobs_created: u64,

    /// Dispatches that ended `Sent`/`SentProof`
    pub attempts_succeeded: u64,

    /// Dispatches that failed (retry scheduled or retries exhausted)
    pub attempts_failed: u64,

    /// Leads whose consent flipped to DNC between query and processing
    pub skipped_dnc: u64,

    /// Leads on the global unsubscribe list
    pub skipped_unsubscribed: u64,

    /// Leads matching an active suppression row
    pub skipped_suppressed: u64,

    /// Leads skipped because the daily send limit was reached
    pub skipped_quota: u64,

    /// Leads whose current step already has a terminal job
    pub skipped_idempotent: u64,

    /// Safety violation that stopped the loop early, if any
    pub halted_by_safety: Option<String>,

    /// Per-lead errors that did not abort the tick
    pub errors: Vec<String>,
}

impl TickResult {
    fn progress(&self) -> RunProgress {
        RunProgress {
            leads_processed: self.leads_processed,
            jobs_created: self.jobs_created,
            attempts_succeeded: self.attempts_succeeded,
            attempts_failed: self.attempts_failed,
        }
    }
}

/// Fatal tick failures
///
/// Everything here means the lease bookkeeping itself failed; per-lead
/// failures never surface this way.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("lease operation failed: {0}")]
    Lease(#[from] StoreError),
}

/// Per-lead failures, caught into [`TickResult::errors`]
#[derive(Debug, Error)]
enum LeadError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error(transparent)]
    Job(#[from] JobError),
}

/// The Campaign Distribution Orchestrator engine
///
/// Invoked synchronously, once per tick, by an external scheduler. Within a
/// tick leads are processed strictly sequentially so the Safety Gate is
/// re-evaluated between every two dispatches. Ticks for different campaigns
/// may run concurrently; all coordination goes through the lease store.
pub struct Orchestrator {
    config: OrchestratorConfig,
    stores: Stores,
    registry: ContactabilityRegistry,
    resolver: Arc<dyn SequenceResolver>,
    renderer: Arc<dyn TemplateRenderer>,
    adapter: Option<Arc<dyn ChannelAdapter>>,
    audit: Arc<dyn AuditSink>,
}

impl Orchestrator {
    /// Construct an engine from injected repositories and collaborators
    pub fn new(
        config: OrchestratorConfig,
        stores: Stores,
        collaborators: Collaborators,
    ) -> Result<Self, ConfigError> {
        if config.worker_id.trim().is_empty() {
            return Err(ConfigError::EmptyWorkerId);
        }
        if config.lease_duration_secs <= 0 {
            return Err(ConfigError::NonPositiveLease);
        }
        if !config.proof_mode && collaborators.adapter.is_none() {
            return Err(ConfigError::MissingAdapter);
        }
        let registry = ContactabilityRegistry::new(Arc::clone(&stores.block_lists));
        Ok(Self {
            config,
            registry,
            resolver: collaborators.resolver,
            renderer: collaborators.renderer,
            adapter: collaborators.adapter,
            audit: collaborators.audit,
            stores,
        })
    }

    fn lease_duration(&self) -> Duration {
        Duration::seconds(self.config.lease_duration_secs)
    }

    /// Execute one tick for `campaign_id`
    ///
    /// Idempotent to invoke repeatedly with overlapping time windows: job
    /// creation is keyed by `(lead, message, step)` and a lead is not
    /// re-processed before its `next_action_at`.
    pub fn tick(
        &self,
        campaign_id: Uuid,
        now: DateTime<Utc>,
        batch_size: usize,
    ) -> Result<TickResult, TickError> {
        let mut result = TickResult::default();

        // STEP 1: claim or bail. Contention is a normal no-op, not an error.
        let Some(run) = self.stores.leases.try_claim(
            campaign_id,
            &self.config.worker_id,
            self.lease_duration(),
            now,
        )?
        else {
            debug!(%campaign_id, "lease contended; skipping tick");
            return Ok(result);
        };
        result.run_id = Some(run.id);
        self.audit.append(AuditEntry::system(
            "run",
            run.id,
            "lease_claimed",
            json!({ "campaign_id": campaign_id, "worker_id": self.config.worker_id }),
            now,
        ));
        self.stores
            .leases
            .refresh_lease(run.id, self.lease_duration(), now)?;

        // STEP 2: candidate selection. DNC leads never enter the loop.
        let candidates = match self.stores.leads.due_leads(campaign_id, now, batch_size) {
            Ok(c) => c,
            Err(e) => {
                let msg = format!("lead query failed: {}", e);
                result.errors.push(msg.clone());
                self.finalize(&run.id, now, RunStatus::Failed, Some(msg), &result)?;
                return Ok(result);
            }
        };
        debug!(%campaign_id, candidates = candidates.len(), "tick batch selected");

        let mut final_status = RunStatus::Completed;
        let mut final_error = None;

        for lead in candidates {
            // STEP 3: safety gate, re-evaluated before every dispatch. A
            // violation stops the loop; remaining leads stay untouched.
            let campaign = match check_campaign_safety(self.stores.campaigns.as_ref(), campaign_id)
            {
                Ok(Ok(campaign)) => campaign,
                Ok(Err(violation)) => {
                    warn!(%campaign_id, %violation, "safety violation; halting batch");
                    result.halted_by_safety = Some(violation.to_string());
                    final_status = RunStatus::Stopped;
                    final_error = Some(violation.to_string());
                    break;
                }
                Err(e) => {
                    result
                        .errors
                        .push(format!("safety check failed for lead {}: {}", lead.id, e));
                    continue;
                }
            };

            // STEPS 4-7 for a single lead; failures are recorded, never fatal
            result.leads_processed += 1;
            let lead_id = lead.id;
            if let Err(e) = self.process_lead(&campaign, lead, now, &mut result) {
                warn!(%campaign_id, %lead_id, error = %e, "lead processing failed");
                result.errors.push(format!("lead {}: {}", lead_id, e));
            }
        }

        // STEP 8: finalize the lease. Failure here is fatal to the caller.
        self.finalize(&run.id, now, final_status, final_error, &result)?;
        info!(
            %campaign_id,
            run_id = %run.id,
            leads = result.leads_processed,
            jobs = result.jobs_created,
            ok = result.attempts_succeeded,
            failed = result.attempts_failed,
            "tick complete"
        );
        Ok(result)
    }

    fn finalize(
        &self,
        run_id: &Uuid,
        now: DateTime<Utc>,
        status: RunStatus,
        error: Option<String>,
        result: &TickResult,
    ) -> Result<(), TickError> {
        self.stores.leases.update_progress(*run_id, result.progress())?;
        self.stores
            .leases
            .mark_completed(*run_id, now, status, error.clone())?;
        self.audit.append(AuditEntry::system(
            "run",
            run_id,
            "lease_released",
            json!({ "status": format!("{:?}", status), "error": error }),
            now,
        ));
        Ok(())
    }

    /// Steps 4-7 of the tick loop for one candidate lead
    fn process_lead(
        &self,
        campaign: &CampaignConfig,
        mut lead: Lead,
        now: DateTime<Utc>,
        result: &mut TickResult,
    ) -> Result<(), LeadError> {
        // STEP 4a: contactability, in fixed blame order
        match self.registry.check(&lead)? {
            ContactDecision::Dnc => {
                // Consent flipped after the query; the query itself excludes
                // DNC, so this only catches a concurrent reply-handler write.
                result.skipped_dnc += 1;
                debug!(lead_id = %lead.id, "skipped: DNC");
                return Ok(());
            }
            ContactDecision::Unsubscribed => {
                result.skipped_unsubscribed += 1;
                debug!(lead_id = %lead.id, "skipped: unsubscribed");
                return Ok(());
            }
            ContactDecision::Suppressed => {
                result.skipped_suppressed += 1;
                debug!(lead_id = %lead.id, "skipped: suppressed");
                return Ok(());
            }
            ContactDecision::Contactable => {}
        }

        // STEP 4b: daily quota (UTC day window), counting this tick's sends
        let sent_today = self
            .stores
            .ledger
            .count_sent_since(campaign.id, day_start(now))?;
        if sent_today >= u64::from(campaign.daily_send_limit) {
            result.skipped_quota += 1;
            debug!(lead_id = %lead.id, sent_today, "skipped: daily quota reached");
            return Ok(());
        }

        // STEP 5a: resolve the next sequence step
        let Some(step) = self
            .resolver
            .next_step(&lead.routing_sequence, lead.sequence_cursor)?
        else {
            // Sequence exhausted: clear the schedule so the lead stops
            // matching the eligibility query.
            lead.next_action_at = None;
            self.stores.leads.put_lead(lead.clone())?;
            self.audit.append(AuditEntry::system(
                "lead",
                lead.id,
                "sequence_exhausted",
                json!({ "routing_sequence": lead.routing_sequence }),
                now,
            ));
            return Ok(());
        };

        // STEP 5b: idempotency check against the ledger
        let (mut job, created) = self.stores.ledger.create_job_if_absent(
            campaign.id,
            lead.id,
            &step.message_id,
            step.step_index,
            step.channel,
        )?;
        if created {
            result.jobs_created += 1;
            self.audit_job(&job, "job_created", now);
        } else if job.status.is_terminal() {
            // This step already went out (or was terminally blocked) in an
            // earlier tick; never dispatch it again.
            result.skipped_idempotent += 1;
            debug!(lead_id = %lead.id, step = step.step_index, "skipped: idempotent");
            return Ok(());
        }
        if !job.attemptable(now) {
            // RetryScheduled with a future next_retry_at; leave it be.
            return Ok(());
        }

        // STEP 6a: channel allowance and rendering guardrails block the job
        // terminally — a job that cannot render is Blocked, never Sent.
        if !campaign.channel_allowed(step.channel) {
            job.block(&format!("channel {} not allowed for campaign", step.channel))?;
            self.stores.ledger.update_job(job.clone())?;
            self.audit_job(&job, "job_blocked", now);
            return Ok(());
        }
        let message = match self.renderer.render(&lead, &step.message_id) {
            Ok(message) => message,
            Err(e) => {
                job.block(&e.to_string())?;
                self.stores.ledger.update_job(job.clone())?;
                self.audit_job(&job, "job_blocked", now);
                return Ok(());
            }
        };

        // STEP 6b: dispatch
        let outcome = self.dispatch(&lead, &message);
        match outcome {
            Ok(external_id) => {
                job.record_success(external_id, self.config.proof_mode, now)?;
                self.stores.ledger.update_job(job.clone())?;
                result.attempts_succeeded += 1;
                self.audit_job(&job, "job_sent", now);

                // STEP 7: advance the lead's contact cursor
                let next_action_at = self.next_action_after(&lead, &step, now)?;
                lead.record_contact(step.step_index, step.channel, now, next_action_at);
                self.stores.leads.put_lead(lead.clone())?;
                self.audit.append(AuditEntry::system(
                    "lead",
                    lead.id,
                    "lead_contacted",
                    json!({
                        "step_index": step.step_index,
                        "channel": step.channel.to_string(),
                        "next_action_at": next_action_at.map(|t| t.to_rfc3339()),
                    }),
                    now,
                ));
            }
            Err(e) => {
                job.record_failure(&e.to_string(), now)?;
                self.stores.ledger.update_job(job.clone())?;
                result.attempts_failed += 1;
                let action = match job.status {
                    JobStatus::Failed => "job_failed",
                    _ => "job_retry_scheduled",
                };
                self.audit_job(&job, action, now);
                // The lead's next_action_at is left unchanged: the retry
                // belongs to the job, not the lead.
            }
        }
        Ok(())
    }

    /// Send via the channel adapter, or simulate in proof mode
    fn dispatch(
        &self,
        lead: &Lead,
        message: &crate::dispatch::RenderedMessage,
    ) -> Result<Option<String>, DispatchError> {
        if self.config.proof_mode {
            return Ok(None);
        }
        match &self.adapter {
            Some(adapter) => adapter.send(lead, message).map(Some),
            // Construction forbids this combination; kept as a data error
            // rather than a panic.
            None => Err(DispatchError::SendFailed(
                "no channel adapter configured".to_string(),
            )),
        }
    }

    /// When the lead's next step becomes due, or `None` when the just-sent
    /// step was the last one
    fn next_action_after(
        &self,
        lead: &Lead,
        step: &SequenceStep,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, SequenceError> {
        let has_next = self
            .resolver
            .next_step(&lead.routing_sequence, step.step_index + 1)?
            .is_some();
        Ok(has_next.then(|| now + step.delay_until_next))
    }

    fn audit_job(&self, job: &DistributionJob, action: &str, now: DateTime<Utc>) {
        self.audit.append(AuditEntry::system(
            "job",
            job.id,
            action,
            json!({
                "campaign_id": job.campaign_id,
                "lead_id": job.lead_id,
                "step_index": job.step_index,
                "status": format!("{:?}", job.status),
                "retry_count": job.retry_count,
                "error": job.error,
            }),
            now,
        ));
    }
}
