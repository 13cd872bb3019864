//! Safety Gate behavior through the engine
//!
//! The gate is re-evaluated before every individual dispatch, so a paused
//! campaign never dispatches and a kill switch flipped mid-batch halts the
//! remainder of that same tick.

use std::sync::Arc;

use campaign_orchestrator_core_rs::{
    CampaignConfig, CampaignStatus, Channel, ChannelAdapter, Collaborators, ConsentStatus,
    DispatchError, EchoRenderer, InMemoryAuditLog, InMemoryStore, JobLedger, Lead, LeadStatus,
    LeadStore, Orchestrator, OrchestratorConfig, RenderedMessage, RunStatus, StaticSequenceResolver,
    StepSpec, Stores, CampaignStore, LeaseStore,
};
use chrono::{DateTime, TimeZone, Utc};
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

fn campaign_with_status(store: &InMemoryStore, status: CampaignStatus) -> Uuid {
    let campaign = CampaignConfig::new(Uuid::new_v4(), 100)
        .with_status(status)
        .with_channel(Channel::Email);
    let id = campaign.id;
    store.put_campaign(campaign).unwrap();
    id
}

fn add_lead(store: &InMemoryStore, campaign_id: Uuid, email: &str) -> Uuid {
    let mut lead = Lead::new(campaign_id, email, "intro");
    lead.consent_status = ConsentStatus::Consented;
    lead.schedule_at(t0());
    let id = lead.id;
    store.put_lead(lead).unwrap();
    id
}

fn proof_engine(store: Arc<InMemoryStore>) -> Orchestrator {
    Orchestrator::new(
        OrchestratorConfig::proof("test-worker"),
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
            adapter: None,
            audit: Arc::new(InMemoryAuditLog::new()),
        },
    )
    .unwrap()
}

/// Adapter that engages the campaign kill switch during its first send
struct KillSwitchAdapter {
    store: Arc<InMemoryStore>,
    campaign_id: Uuid,
}

impl ChannelAdapter for KillSwitchAdapter {
    fn send(&self, _lead: &Lead, _message: &RenderedMessage) -> Result<String, DispatchError> {
        let mut campaign = self
            .store
            .get_campaign(self.campaign_id)
            .unwrap()
            .unwrap();
        campaign.kill_switch = true;
        self.store.put_campaign(campaign).unwrap();
        Ok("ext-1".to_string())
    }
}

#[test]
fn paused_campaign_creates_no_jobs() {
    let store = Arc::new(InMemoryStore::new());
    let campaign_id = campaign_with_status(&store, CampaignStatus::Paused);
    for i in 0..5 {
        add_lead(&store, campaign_id, &format!("lead{}@x.com", i));
    }

    let engine = proof_engine(store.clone());
    let result = engine.tick(campaign_id, t0(), 25).unwrap();

    assert_eq!(result.jobs_created, 0);
    assert_eq!(result.leads_processed, 0);
    assert!(result.halted_by_safety.is_some());
    assert!(store.jobs_for_campaign(campaign_id).unwrap().is_empty());

    // All leads stay untouched
    let due = store.due_leads(campaign_id, t0(), 25).unwrap();
    assert_eq!(due.len(), 5);
    assert!(due.iter().all(|l| l.status == LeadStatus::New));
}

#[test]
fn draft_and_stopped_campaigns_are_blocked_too() {
    for status in [CampaignStatus::Draft, CampaignStatus::Stopped, CampaignStatus::Completed] {
        let store = Arc::new(InMemoryStore::new());
        let campaign_id = campaign_with_status(&store, status);
        add_lead(&store, campaign_id, "lead@x.com");

        let engine = proof_engine(store.clone());
        let result = engine.tick(campaign_id, t0(), 25).unwrap();
        assert_eq!(result.jobs_created, 0, "status {:?} must block", status);
    }
}

#[test]
fn missing_campaign_config_halts_the_tick() {
    let store = Arc::new(InMemoryStore::new());
    let ghost = Uuid::new_v4();
    // A lead for a campaign with no configuration row
    add_lead(&store, ghost, "lead@x.com");

    let engine = proof_engine(store.clone());
    let result = engine.tick(ghost, t0(), 25).unwrap();

    assert_eq!(result.jobs_created, 0);
    assert!(result
        .halted_by_safety
        .as_deref()
        .is_some_and(|v| v.contains("missing")));
}

#[test]
fn kill_switch_flipped_mid_batch_halts_remaining_sends() {
    let store = Arc::new(InMemoryStore::new());
    let campaign_id = campaign_with_status(&store, CampaignStatus::Running);
    for i in 0..5 {
        add_lead(&store, campaign_id, &format!("lead{}@x.com", i));
    }

    let adapter = Arc::new(KillSwitchAdapter {
        store: store.clone(),
        campaign_id,
    });
    let engine = Orchestrator::new(
        OrchestratorConfig::new("test-worker"),
        Stores {
            campaigns: store.clone(),
            leads: store.clone(),
            ledger: store.clone(),
            leases: store.clone(),
            block_lists: store.clone(),
        },
        Collaborators {
            resolver: Arc::new(resolver()),
            renderer: Arc::new(EchoRenderer),
            adapter: Some(adapter),
            audit: Arc::new(InMemoryAuditLog::new()),
        },
    )
    .unwrap();

    let result = engine.tick(campaign_id, t0(), 5).unwrap();

    // The switch engages during the first dispatch; the gate check before
    // the second lead stops the loop.
    assert!(result.leads_processed <= 2);
    assert!(result.jobs_created < 5);
    assert_eq!(result.attempts_succeeded, 1);
    assert!(result.halted_by_safety.is_some());
    assert!(store.jobs_for_campaign(campaign_id).unwrap().len() < 5);

    // The run was finalized as Stopped with the violation recorded
    let run = store.get_run(result.run_id.unwrap()).unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Stopped);
    assert!(run.last_error.is_some());
}
