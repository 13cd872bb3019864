//! Distribution ledger: idempotent job creation and the retry state machine
//!
//! The idempotency key over `(lead, message, step)` is the mechanism that
//! makes re-running a tick safe; the retry path walks
//! `Pending -> RetryScheduled -> ... -> Failed` with exponential backoff.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use campaign_orchestrator_core_rs::models::job::idempotency_key;
use campaign_orchestrator_core_rs::{
    CampaignConfig, CampaignStatus, Channel, ChannelAdapter, Collaborators, ConsentStatus,
    DispatchError, EchoRenderer, InMemoryAuditLog, InMemoryStore, JobLedger, JobStatus, Lead,
    LeadStore, Orchestrator, OrchestratorConfig, RenderedMessage, StaticSequenceResolver,
    StepSpec, Stores, CampaignStore,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
}

fn resolver() -> StaticSequenceResolver {
    StaticSequenceResolver::new().with_sequence(
        "intro",
        vec![StepSpec {
            message_id: "msg_1".into(),
            channel: Channel::Email,
            delay_secs: 86_400,
        }],
    )
}

fn running_campaign(store: &InMemoryStore) -> Uuid {
    let campaign = CampaignConfig::new(Uuid::new_v4(), 100)
        .with_status(CampaignStatus::Running)
        .with_channel(Channel::Email);
    let id = campaign.id;
    store.put_campaign(campaign).unwrap();
    id
}

fn add_lead(store: &InMemoryStore, campaign_id: Uuid) -> Uuid {
    let mut lead = Lead::new(campaign_id, "lead@x.com", "intro");
    lead.consent_status = ConsentStatus::Consented;
    lead.schedule_at(t0());
    let id = lead.id;
    store.put_lead(lead).unwrap();
    id
}

/// Adapter that always fails with a transient error
struct AlwaysFailAdapter {
    calls: AtomicU32,
}

impl AlwaysFailAdapter {
    fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
        }
    }
}

impl ChannelAdapter for AlwaysFailAdapter {
    fn send(&self, _lead: &Lead, _message: &RenderedMessage) -> Result<String, DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DispatchError::SendFailed("smtp 451 try again".to_string()))
    }
}

fn live_engine(store: Arc<InMemoryStore>, adapter: Arc<dyn ChannelAdapter>) -> Orchestrator {
    Orchestrator::new(
        OrchestratorConfig::new("test-worker"),
        Stores {
            campaigns: store.clone(),
            leads: store.clone(),
            ledger: store.clone(),
            leases: store.clone(),
            block_lists: store,
        },
        Collaborators {
            resolver: Arc::new(resolver()),
            renderer: Arc::new(EchoRenderer),
            adapter: Some(adapter),
            audit: Arc::new(InMemoryAuditLog::new()),
        },
    )
    .unwrap()
}

#[test]
fn create_job_if_absent_is_idempotent() {
    let store = InMemoryStore::new();
    let campaign = Uuid::new_v4();
    let lead = Uuid::new_v4();

    let (first, created) = store
        .create_job_if_absent(campaign, lead, "msg_1", 0, Channel::Email)
        .unwrap();
    assert!(created);
    assert_eq!(first.status, JobStatus::Pending);

    let (again, created) = store
        .create_job_if_absent(campaign, lead, "msg_1", 0, Channel::Email)
        .unwrap();
    assert!(!created);
    assert_eq!(again.id, first.id);
    assert_eq!(again.idempotency_key, first.idempotency_key);

    let fetched = store.get_job(first.id).unwrap().unwrap();
    assert_eq!(fetched.status, JobStatus::Pending);

    // A different step is a different slot
    let (_other, created) = store
        .create_job_if_absent(campaign, lead, "msg_1", 1, Channel::Email)
        .unwrap();
    assert!(created);
}

#[test]
fn first_failure_schedules_retry_at_now_plus_base_delay() {
    let store = Arc::new(InMemoryStore::new());
    let campaign_id = running_campaign(&store);
    add_lead(&store, campaign_id);

    let adapter = Arc::new(AlwaysFailAdapter::new());
    let engine = live_engine(store.clone(), adapter);

    let result = engine.tick(campaign_id, t0(), 25).unwrap();
    assert_eq!(result.jobs_created, 1);
    assert_eq!(result.attempts_failed, 1);
    assert_eq!(result.attempts_succeeded, 0);

    let jobs = store.jobs_for_campaign(campaign_id).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::RetryScheduled);
    assert_eq!(jobs[0].retry_count, 1);
    assert_eq!(jobs[0].next_retry_at, Some(t0() + Duration::seconds(300)));
    assert!(jobs[0].error.as_deref().is_some_and(|e| e.contains("451")));
}

#[test]
fn retries_exhaust_into_failed_and_are_never_reattempted() {
    let store = Arc::new(InMemoryStore::new());
    let campaign_id = running_campaign(&store);
    let lead_id = add_lead(&store, campaign_id);

    let adapter = Arc::new(AlwaysFailAdapter::new());
    let engine = live_engine(store.clone(), adapter.clone());

    // Attempt 1 fails; retry due at +300s
    engine.tick(campaign_id, t0(), 25).unwrap();

    // A tick before the backoff elapses must not re-attempt
    let early = engine.tick(campaign_id, t0() + Duration::seconds(10), 25).unwrap();
    assert_eq!(early.attempts_failed, 0);
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 1);

    // Attempt 2 at +301s; retry due 600s later
    engine
        .tick(campaign_id, t0() + Duration::seconds(301), 25)
        .unwrap();
    let jobs = store.jobs_for_campaign(campaign_id).unwrap();
    assert_eq!(jobs[0].retry_count, 2);
    assert_eq!(jobs[0].status, JobStatus::RetryScheduled);

    // Attempt 3 exhausts the budget: terminal Failed
    engine
        .tick(campaign_id, t0() + Duration::seconds(1000), 25)
        .unwrap();
    let jobs = store.jobs_for_campaign(campaign_id).unwrap();
    assert_eq!(jobs[0].status, JobStatus::Failed);
    assert_eq!(jobs[0].retry_count, 3);
    assert_eq!(jobs[0].next_retry_at, None);
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 3);

    // Further ticks see a terminal job: skipped, not re-sent
    let after = engine
        .tick(campaign_id, t0() + Duration::seconds(2000), 25)
        .unwrap();
    assert_eq!(after.skipped_idempotent, 1);
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 3);

    // The lead was never marked contacted by the failing job
    let lead = store.get_lead(lead_id).unwrap().unwrap();
    assert_eq!(lead.last_contacted_at, None);
}

proptest! {
    #[test]
    fn idempotency_key_is_stable(message in "[a-z_]{1,16}", step in 0u32..64) {
        let lead = Uuid::from_u128(0x42);
        prop_assert_eq!(
            idempotency_key(lead, &message, step),
            idempotency_key(lead, &message, step)
        );
    }

    #[test]
    fn distinct_triples_produce_distinct_keys(
        message in "[a-z_]{1,16}",
        step_a in 0u32..64,
        step_b in 0u32..64,
    ) {
        prop_assume!(step_a != step_b);
        let lead = Uuid::from_u128(0x42);
        prop_assert_ne!(
            idempotency_key(lead, &message, step_a),
            idempotency_key(lead, &message, step_b)
        );
    }
}
