// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Campaign registrar: the catalog of registered campaigns and the
//! re-entry decision for fresh triggers.

use nuxie_campaign::{Campaign, CampaignDef, FrequencyPolicy, WorkflowError};
use nuxie_core::CampaignId;
use nuxie_storage::JourneySummary;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of the re-entry check for one `(campaign, user)` trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReentryDecision {
    Spawn,
    Blocked(&'static str),
}

impl ReentryDecision {
    pub fn permits(self) -> bool {
        self == ReentryDecision::Spawn
    }
}

/// Catalog of compiled campaigns, indexed by trigger event name.
#[derive(Debug, Default)]
pub struct CampaignRegistrar {
    campaigns: HashMap<CampaignId, Arc<Campaign>>,
    by_trigger: HashMap<SmolStr, Vec<CampaignId>>,
}

impl CampaignRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile, validate, and register a campaign definition. A
    /// malformed definition is rejected here and never executes.
    /// Re-registering a campaign id replaces the prior version.
    pub fn register(&mut self, def: CampaignDef) -> Result<CampaignId, WorkflowError> {
        let campaign = Campaign::compile(def)?;
        let id = campaign.id;
        self.remove(id);
        self.by_trigger.entry(campaign.trigger.event.clone()).or_default().push(id);
        tracing::info!(
            campaign = %id,
            name = %campaign.name,
            version = campaign.version,
            trigger = %campaign.trigger.event,
            "campaign registered"
        );
        self.campaigns.insert(id, Arc::new(campaign));
        Ok(id)
    }

    /// Drop a campaign from the catalog. Running journeys keep going.
    pub fn remove(&mut self, id: CampaignId) {
        if let Some(old) = self.campaigns.remove(&id) {
            if let Some(ids) = self.by_trigger.get_mut(&old.trigger.event) {
                ids.retain(|c| *c != id);
                if ids.is_empty() {
                    self.by_trigger.remove(&old.trigger.event);
                }
            }
        }
    }

    pub fn get(&self, id: CampaignId) -> Option<Arc<Campaign>> {
        self.campaigns.get(&id).cloned()
    }

    /// Campaigns whose trigger event matches, in registration order.
    pub fn triggered_by(&self, event_name: &str) -> Vec<Arc<Campaign>> {
        self.by_trigger
            .get(event_name)
            .map(|ids| ids.iter().filter_map(|id| self.campaigns.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    /// All campaigns carrying a goal predicate.
    pub fn with_goals(&self) -> Vec<Arc<Campaign>> {
        self.campaigns.values().filter(|c| c.goal.is_some()).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.campaigns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.campaigns.is_empty()
    }
}

/// Decide whether a fresh trigger may spawn a journey, given every
/// journey ever created for the `(campaign, user)` pair.
///
/// `message_limit` caps lifetime spawns regardless of policy.
pub fn reentry_decision(
    campaign: &Campaign,
    history: &[JourneySummary],
    now_ms: u64,
) -> ReentryDecision {
    if let Some(limit) = campaign.message_limit {
        if history.len() as u32 >= limit {
            return ReentryDecision::Blocked("message_limit");
        }
    }

    match campaign.frequency_policy {
        FrequencyPolicy::Once => {
            if history.is_empty() {
                ReentryDecision::Spawn
            } else {
                ReentryDecision::Blocked("once")
            }
        }
        FrequencyPolicy::OneTimePerInterval => {
            let interval_ms = campaign
                .frequency_interval_seconds
                .unwrap_or(0)
                .saturating_mul(1000);
            let last_start = history.iter().map(|s| s.created_at_ms).max();
            match last_start {
                Some(last) if now_ms.saturating_sub(last) < interval_ms => {
                    ReentryDecision::Blocked("interval")
                }
                _ => ReentryDecision::Spawn,
            }
        }
        FrequencyPolicy::EveryRematch => ReentryDecision::Spawn,
        FrequencyPolicy::UntilConverted => {
            if history.iter().any(|s| s.is_converted()) {
                ReentryDecision::Blocked("converted")
            } else {
                ReentryDecision::Spawn
            }
        }
    }
}

#[cfg(test)]
#[path = "registrar_tests.rs"]
mod tests;
