//! Scenario loading
//!
//! A scenario is a serde-deserializable snapshot of everything a proof-mode
//! run needs: one campaign, its leads, the routing sequences and the block
//! lists. The CLI reads scenarios from JSON files; the Python FFI passes
//! them as JSON strings. Production deployments do not use scenarios — they
//! run against a live store.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeSet;
use thiserror::Error;
use uuid::Uuid;

use crate::dispatch::sequence::{StaticSequenceResolver, StepSpec};
use crate::models::campaign::{CampaignConfig, CampaignStatus, Channel};
use crate::models::lead::{ConsentStatus, Lead};
use crate::models::suppression::{SuppressionEntry, SuppressionKind, UnsubscribeEntry};
use crate::store::memory::InMemoryStore;
use crate::store::{BlockListStore, CampaignStore, LeadStore, StoreError};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("invalid scenario: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("scenario references unknown sequence: {0}")]
    UnknownSequence(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Campaign section of a scenario
#[derive(Debug, Deserialize)]
pub struct CampaignSpec {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub status: CampaignStatus,
    #[serde(default)]
    pub kill_switch: bool,
    pub allowed_channels: BTreeSet<Channel>,
    pub daily_send_limit: u32,
}

/// Lead section of a scenario
#[derive(Debug, Deserialize)]
pub struct LeadSpec {
    pub email: String,
    pub routing_sequence: String,
    #[serde(default = "default_consent")]
    pub consent_status: ConsentStatus,
    /// Due immediately when omitted
    pub next_action_at: Option<DateTime<Utc>>,
}

fn default_consent() -> ConsentStatus {
    ConsentStatus::Consented
}

#[derive(Debug, Deserialize)]
pub struct SuppressionSpec {
    pub kind: SuppressionKind,
    pub value: String,
    #[serde(default)]
    pub reason: String,
}

/// Complete proof-run scenario
#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub campaign: CampaignSpec,
    pub leads: Vec<LeadSpec>,
    /// sequence name -> ordered steps
    pub sequences: std::collections::HashMap<String, Vec<StepSpec>>,
    #[serde(default)]
    pub unsubscribed_emails: Vec<String>,
    #[serde(default)]
    pub suppressions: Vec<SuppressionSpec>,
}

impl Scenario {
    /// Parse a scenario from JSON
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Seed a fresh in-memory store and sequence resolver from this scenario
    ///
    /// Leads without an explicit `next_action_at` are scheduled at `now`, so
    /// the first tick picks them up.
    pub fn seed(
        &self,
        now: DateTime<Utc>,
    ) -> Result<(InMemoryStore, StaticSequenceResolver, Uuid), ScenarioError> {
        let store = InMemoryStore::new();

        let campaign = CampaignConfig {
            id: self.campaign.id,
            status: self.campaign.status,
            kill_switch: self.campaign.kill_switch,
            allowed_channels: self.campaign.allowed_channels.clone(),
            daily_send_limit: self.campaign.daily_send_limit,
        };
        let campaign_id = campaign.id;
        store.put_campaign(campaign)?;

        for spec in &self.leads {
            if !self.sequences.contains_key(&spec.routing_sequence) {
                return Err(ScenarioError::UnknownSequence(spec.routing_sequence.clone()));
            }
            let mut lead = Lead::new(campaign_id, &spec.email, &spec.routing_sequence);
            lead.consent_status = spec.consent_status;
            lead.schedule_at(spec.next_action_at.unwrap_or(now));
            store.put_lead(lead)?;
        }

        for email in &self.unsubscribed_emails {
            store.add_unsubscribe(UnsubscribeEntry::new(email, "scenario", now))?;
        }
        for spec in &self.suppressions {
            store.add_suppression(SuppressionEntry::new(
                spec.kind,
                &spec.value,
                &spec.reason,
                now,
            ))?;
        }

        let mut resolver = StaticSequenceResolver::new();
        for (name, steps) in &self.sequences {
            resolver = resolver.with_sequence(name, steps.clone());
        }

        Ok((store, resolver, campaign_id))
    }
}
