//! Campaign configuration model
//!
//! A campaign is the unit of orchestration: one operator-owned configuration
//! that governs whether any dispatch may happen at all, which channels may be
//! used, and how many sends are allowed per day.
//!
//! The orchestrator never mutates a campaign. Status and kill-switch changes
//! come exclusively from operator tooling; the engine only reads them (and
//! re-reads them before every individual dispatch).
//!
//! # Critical Invariants
//!
//! - Dispatch is permitted **iff** `status == Running && !kill_switch`
//! - `allowed_channels` is consulted for every resolved sequence step

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Lifecycle status of a campaign
///
/// Only `Running` permits dispatch. Every other status is a hard block that
/// the Safety Gate reports as a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampaignStatus {
    /// Being configured, never dispatched
    Draft,

    /// Active: dispatch permitted (subject to kill switch)
    Running,

    /// Temporarily halted by an operator
    Paused,

    /// Halted, not expected to resume
    Stopped,

    /// Finished; kept for reporting
    Completed,
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CampaignStatus::Draft => "Draft",
            CampaignStatus::Running => "Running",
            CampaignStatus::Paused => "Paused",
            CampaignStatus::Stopped => "Stopped",
            CampaignStatus::Completed => "Completed",
        };
        f.write_str(s)
    }
}

/// Outreach channel
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Channel {
    Email,
    LinkedIn,
    Sms,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Channel::Email => "email",
            Channel::LinkedIn => "linkedin",
            Channel::Sms => "sms",
        };
        f.write_str(s)
    }
}

/// Operator-owned campaign configuration
///
/// # Example
/// ```
/// use campaign_orchestrator_core_rs::models::campaign::{
///     CampaignConfig, CampaignStatus, Channel,
/// };
/// use uuid::Uuid;
///
/// let campaign = CampaignConfig::new(Uuid::new_v4(), 100)
///     .with_status(CampaignStatus::Running)
///     .with_channel(Channel::Email);
///
/// assert!(campaign.dispatch_permitted());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Unique campaign identifier
    pub id: Uuid,

    /// Lifecycle status; only `Running` permits dispatch
    pub status: CampaignStatus,

    /// Operator kill switch; `true` halts all further dispatch immediately,
    /// including mid-batch
    pub kill_switch: bool,

    /// Channels this campaign may dispatch on
    pub allowed_channels: BTreeSet<Channel>,

    /// Maximum `Sent`/`SentProof` jobs per UTC day
    pub daily_send_limit: u32,
}

impl CampaignConfig {
    /// Create a new campaign in `Draft` with the kill switch disengaged
    pub fn new(id: Uuid, daily_send_limit: u32) -> Self {
        Self {
            id,
            status: CampaignStatus::Draft,
            kill_switch: false,
            allowed_channels: BTreeSet::new(),
            daily_send_limit,
        }
    }

    /// Builder-style status override
    pub fn with_status(mut self, status: CampaignStatus) -> Self {
        self.status = status;
        self
    }

    /// Builder-style channel allowance
    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.allowed_channels.insert(channel);
        self
    }

    /// The dispatch invariant: `Running` and kill switch disengaged
    pub fn dispatch_permitted(&self) -> bool {
        self.status == CampaignStatus::Running && !self.kill_switch
    }

    /// Whether the campaign may dispatch on `channel`
    pub fn channel_allowed(&self, channel: Channel) -> bool {
        self.allowed_channels.contains(&channel)
    }
}
