//! Safety Gate
//!
//! Stateless predicate over the campaign configuration. The engine calls it
//! once per candidate lead, immediately before dispatch, so an operator
//! flipping the kill switch mid-batch halts further sends within the same
//! tick.
//!
//! Pure read; on violation **no state changes occur** — the violation is a
//! `Result` value the engine branches on, never an unwind.

use thiserror::Error;
use uuid::Uuid;

use crate::models::campaign::{CampaignConfig, CampaignStatus};
use crate::store::{CampaignStore, StoreError};

/// Why dispatch is forbidden for a campaign
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SafetyViolation {
    #[error("campaign configuration missing: {0}")]
    MissingConfig(Uuid),

    #[error("campaign is not running (status: {0})")]
    NotRunning(CampaignStatus),

    #[error("kill switch engaged")]
    KillSwitchEngaged,
}

/// Check whether `campaign_id` may dispatch right now
///
/// Fails when the configuration is missing, the campaign is not `Running`,
/// or the kill switch is engaged. Returns the (fresh) configuration on
/// success so callers act on the same snapshot they validated.
pub fn check_campaign_safety(
    campaigns: &dyn CampaignStore,
    campaign_id: Uuid,
) -> Result<Result<CampaignConfig, SafetyViolation>, StoreError> {
    let Some(campaign) = campaigns.get_campaign(campaign_id)? else {
        return Ok(Err(SafetyViolation::MissingConfig(campaign_id)));
    };
    if campaign.status != CampaignStatus::Running {
        return Ok(Err(SafetyViolation::NotRunning(campaign.status)));
    }
    if campaign.kill_switch {
        return Ok(Err(SafetyViolation::KillSwitchEngaged));
    }
    Ok(Ok(campaign))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::campaign::CampaignConfig;
    use crate::store::memory::InMemoryStore;

    #[test]
    fn missing_config_is_a_violation() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        let result = check_campaign_safety(&store, id).unwrap();
        assert_eq!(result, Err(SafetyViolation::MissingConfig(id)));
    }

    #[test]
    fn paused_campaign_is_a_violation() {
        let store = InMemoryStore::new();
        let campaign =
            CampaignConfig::new(Uuid::new_v4(), 10).with_status(CampaignStatus::Paused);
        let id = campaign.id;
        store.put_campaign(campaign).unwrap();

        let result = check_campaign_safety(&store, id).unwrap();
        assert_eq!(
            result,
            Err(SafetyViolation::NotRunning(CampaignStatus::Paused))
        );
    }

    #[test]
    fn kill_switch_overrides_running_status() {
        let store = InMemoryStore::new();
        let mut campaign =
            CampaignConfig::new(Uuid::new_v4(), 10).with_status(CampaignStatus::Running);
        campaign.kill_switch = true;
        let id = campaign.id;
        store.put_campaign(campaign).unwrap();

        let result = check_campaign_safety(&store, id).unwrap();
        assert_eq!(result, Err(SafetyViolation::KillSwitchEngaged));
    }

    #[test]
    fn running_campaign_passes_and_returns_config() {
        let store = InMemoryStore::new();
        let campaign =
            CampaignConfig::new(Uuid::new_v4(), 10).with_status(CampaignStatus::Running);
        let id = campaign.id;
        store.put_campaign(campaign).unwrap();

        let config = check_campaign_safety(&store, id).unwrap().unwrap();
        assert_eq!(config.id, id);
    }
}
