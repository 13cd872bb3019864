//! In-memory store
//!
//! Reference implementation of every repository trait, backed by HashMap
//! tables behind a single `Mutex`. One lock keeps the atomicity contracts
//! trivially true:
//!
//! - `try_claim` runs its check-then-insert inside one critical section, so
//!   two racing claims can never both observe "no live lease"
//! - `create_job_if_absent` checks the idempotency-key index and inserts
//!   under the same lock
//!
//! Within a tick the engine is strictly sequential, so lock contention is
//! only between ticks for different campaigns — acceptable for the reference
//! store. A SQL-backed implementation replaces the lock with transactions
//! and a unique constraint on the idempotency key.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::campaign::{CampaignConfig, Channel};
use crate::models::job::{DistributionJob, JobStatus};
use crate::models::lead::Lead;
use crate::models::run::{OrchestrationRun, RunProgress, RunStatus};
use crate::models::suppression::{SuppressionEntry, UnsubscribeEntry};
use crate::store::{BlockListStore, CampaignStore, JobLedger, LeaseStore, LeadStore, StoreError};

#[derive(Default)]
struct Tables {
    campaigns: HashMap<Uuid, CampaignConfig>,
    leads: HashMap<Uuid, Lead>,
    jobs: HashMap<Uuid, DistributionJob>,
    /// idempotency key -> job id; the uniqueness index
    job_keys: HashMap<String, Uuid>,
    runs: HashMap<Uuid, OrchestrationRun>,
    unsubscribes: Vec<UnsubscribeEntry>,
    suppressions: Vec<SuppressionEntry>,
}

/// Thread-safe in-memory store implementing all repository traits
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("store mutex poisoned".to_string()))
    }

    /// Toggle a suppression row's `active` flag (operator surface)
    pub fn set_suppression_active(&self, value: &str, active: bool) -> Result<(), StoreError> {
        let mut t = self.lock()?;
        for entry in t.suppressions.iter_mut().filter(|s| s.value == value) {
            entry.active = active;
        }
        Ok(())
    }
}

impl CampaignStore for InMemoryStore {
    fn get_campaign(&self, campaign_id: Uuid) -> Result<Option<CampaignConfig>, StoreError> {
        Ok(self.lock()?.campaigns.get(&campaign_id).cloned())
    }

    fn put_campaign(&self, campaign: CampaignConfig) -> Result<(), StoreError> {
        self.lock()?.campaigns.insert(campaign.id, campaign);
        Ok(())
    }
}

impl LeadStore for InMemoryStore {
    fn get_lead(&self, lead_id: Uuid) -> Result<Option<Lead>, StoreError> {
        Ok(self.lock()?.leads.get(&lead_id).cloned())
    }

    fn put_lead(&self, lead: Lead) -> Result<(), StoreError> {
        self.lock()?.leads.insert(lead.id, lead);
        Ok(())
    }

    fn due_leads(
        &self,
        campaign_id: Uuid,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Lead>, StoreError> {
        let t = self.lock()?;
        let mut due: Vec<Lead> = t
            .leads
            .values()
            .filter(|l| l.campaign_id == campaign_id && l.is_due(now))
            .cloned()
            .collect();
        // Oldest-due first; lead id breaks ties deterministically
        due.sort_by_key(|l| (l.next_action_at, l.id));
        due.truncate(limit);
        Ok(due)
    }
}

impl JobLedger for InMemoryStore {
    fn create_job_if_absent(
        &self,
        campaign_id: Uuid,
        lead_id: Uuid,
        message_id: &str,
        step_index: u32,
        channel: Channel,
    ) -> Result<(DistributionJob, bool), StoreError> {
        let mut t = self.lock()?;
        let key = crate::models::job::idempotency_key(lead_id, message_id, step_index);
        if let Some(existing_id) = t.job_keys.get(&key) {
            let job = t
                .jobs
                .get(existing_id)
                .cloned()
                .ok_or_else(|| StoreError::Backend("job index out of sync".to_string()))?;
            return Ok((job, false));
        }
        let job = DistributionJob::new(campaign_id, lead_id, message_id, step_index, channel);
        t.job_keys.insert(job.idempotency_key.clone(), job.id);
        t.jobs.insert(job.id, job.clone());
        Ok((job, true))
    }

    fn get_job(&self, job_id: Uuid) -> Result<Option<DistributionJob>, StoreError> {
        Ok(self.lock()?.jobs.get(&job_id).cloned())
    }

    fn update_job(&self, job: DistributionJob) -> Result<(), StoreError> {
        let mut t = self.lock()?;
        if !t.jobs.contains_key(&job.id) {
            return Err(StoreError::JobNotFound(job.id));
        }
        t.jobs.insert(job.id, job);
        Ok(())
    }

    fn count_sent_since(
        &self,
        campaign_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let t = self.lock()?;
        let count = t
            .jobs
            .values()
            .filter(|j| {
                j.campaign_id == campaign_id
                    && matches!(j.status, JobStatus::Sent | JobStatus::SentProof)
                    && matches!(j.executed_at, Some(at) if at >= since)
            })
            .count();
        Ok(count as u64)
    }

    fn jobs_for_campaign(&self, campaign_id: Uuid) -> Result<Vec<DistributionJob>, StoreError> {
        let t = self.lock()?;
        let mut jobs: Vec<DistributionJob> = t
            .jobs
            .values()
            .filter(|j| j.campaign_id == campaign_id)
            .cloned()
            .collect();
        jobs.sort_by_key(|j| (j.lead_id, j.step_index));
        Ok(jobs)
    }
}

impl LeaseStore for InMemoryStore {
    fn try_claim(
        &self,
        campaign_id: Uuid,
        worker_id: &str,
        lease_duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<OrchestrationRun>, StoreError> {
        // Single critical section: the check and the insert cannot interleave
        // with another worker's claim.
        let mut t = self.lock()?;
        let live = t
            .runs
            .values()
            .any(|r| r.campaign_id == campaign_id && r.holds_lease(now));
        if live {
            return Ok(None);
        }
        let run = OrchestrationRun::claim(campaign_id, worker_id, lease_duration, now);
        t.runs.insert(run.id, run.clone());
        Ok(Some(run))
    }

    fn refresh_lease(
        &self,
        run_id: Uuid,
        lease_duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut t = self.lock()?;
        let run = t
            .runs
            .get_mut(&run_id)
            .ok_or(StoreError::RunNotFound(run_id))?;
        run.refresh(lease_duration, now);
        Ok(())
    }

    fn update_progress(&self, run_id: Uuid, deltas: RunProgress) -> Result<(), StoreError> {
        let mut t = self.lock()?;
        let run = t
            .runs
            .get_mut(&run_id)
            .ok_or(StoreError::RunNotFound(run_id))?;
        run.progress.add(&deltas);
        Ok(())
    }

    fn mark_completed(
        &self,
        run_id: Uuid,
        now: DateTime<Utc>,
        status: RunStatus,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        let mut t = self.lock()?;
        let run = t
            .runs
            .get_mut(&run_id)
            .ok_or(StoreError::RunNotFound(run_id))?;
        run.finalize(status, error, now);
        Ok(())
    }

    fn get_run(&self, run_id: Uuid) -> Result<Option<OrchestrationRun>, StoreError> {
        Ok(self.lock()?.runs.get(&run_id).cloned())
    }
}

impl BlockListStore for InMemoryStore {
    fn is_unsubscribed(&self, email: &str) -> Result<bool, StoreError> {
        let email = email.trim().to_ascii_lowercase();
        Ok(self
            .lock()?
            .unsubscribes
            .iter()
            .any(|u| u.email == email))
    }

    fn is_suppressed(
        &self,
        email: Option<&str>,
        domain: Option<&str>,
        identity_hash: Option<&str>,
    ) -> Result<bool, StoreError> {
        // An email implies its domain for domain-level suppressions
        let derived = email.and_then(|e| e.split_once('@').map(|(_, d)| d));
        let domain = domain.or(derived);
        let t = self.lock()?;
        Ok(t.suppressions
            .iter()
            .any(|s| s.matches(email, domain, identity_hash)))
    }

    fn add_unsubscribe(&self, entry: UnsubscribeEntry) -> Result<(), StoreError> {
        self.lock()?.unsubscribes.push(entry);
        Ok(())
    }

    fn add_suppression(&self, entry: SuppressionEntry) -> Result<(), StoreError> {
        self.lock()?.suppressions.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn duplicate_idempotency_key_returns_existing_row() {
        let store = InMemoryStore::new();
        let campaign = Uuid::new_v4();
        let lead = Uuid::new_v4();

        let (first, created) = store
            .create_job_if_absent(campaign, lead, "msg", 0, Channel::Email)
            .unwrap();
        assert!(created);

        let (second, created) = store
            .create_job_if_absent(campaign, lead, "msg", 0, Channel::Email)
            .unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(store.jobs_for_campaign(campaign).unwrap().len(), 1);
    }

    #[test]
    fn second_claim_is_rejected_until_lease_expires() {
        let store = InMemoryStore::new();
        let campaign = Uuid::new_v4();
        let t0 = now();

        let run = store
            .try_claim(campaign, "worker-a", Duration::seconds(60), t0)
            .unwrap();
        assert!(run.is_some());

        let contended = store
            .try_claim(campaign, "worker-b", Duration::seconds(60), t0)
            .unwrap();
        assert!(contended.is_none());

        // Past expiry the abandoned lease is claimable again
        let reclaimed = store
            .try_claim(campaign, "worker-b", Duration::seconds(60), t0 + Duration::seconds(61))
            .unwrap();
        assert!(reclaimed.is_some());
    }

    #[test]
    fn due_leads_orders_oldest_first_and_excludes_dnc() {
        let store = InMemoryStore::new();
        let campaign = Uuid::new_v4();
        let t0 = now();

        let mut early = Lead::new(campaign, "early@x.com", "intro");
        early.schedule_at(t0 - Duration::hours(2));
        let mut late = Lead::new(campaign, "late@x.com", "intro");
        late.schedule_at(t0 - Duration::hours(1));
        let mut dnc = Lead::new(campaign, "dnc@x.com", "intro");
        dnc.schedule_at(t0 - Duration::hours(3));
        dnc.consent_status = crate::models::lead::ConsentStatus::Dnc;

        store.put_lead(early.clone()).unwrap();
        store.put_lead(late.clone()).unwrap();
        store.put_lead(dnc).unwrap();

        let due = store.due_leads(campaign, t0, 10).unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].id, early.id);
        assert_eq!(due[1].id, late.id);
    }
}
