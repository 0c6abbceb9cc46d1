// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Internal analytics events the engine emits through the analytics
//! adapter.
//!
//! Serializes with `{"type": "$event_name", ...fields}` so the wire
//! name doubles as the serde tag.

use crate::context::Properties;
use crate::id::CampaignId;
use crate::journey::{ExitReason, JourneyId};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TrackedEvent {
    #[serde(rename = "$journey_started")]
    JourneyStarted {
        journey_id: JourneyId,
        campaign_id: CampaignId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin_event_id: Option<Uuid>,
    },

    #[serde(rename = "$journey_completed")]
    JourneyCompleted {
        journey_id: JourneyId,
        campaign_id: CampaignId,
        exit_reason: ExitReason,
    },

    #[serde(rename = "$journey_errored")]
    JourneyErrored {
        journey_id: JourneyId,
        campaign_id: CampaignId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
        error: String,
    },

    /// One per executed node, for observability.
    #[serde(rename = "$journey_node_executed")]
    NodeExecuted {
        journey_id: JourneyId,
        campaign_id: CampaignId,
        node_id: String,
        node_kind: String,
        result: String,
        context_snapshot: Properties,
    },

    #[serde(rename = "$flow_shown")]
    FlowShown {
        journey_id: JourneyId,
        campaign_id: CampaignId,
        node_id: String,
        flow_id: SmolStr,
    },

    #[serde(rename = "$flow_dismissed")]
    FlowDismissed {
        journey_id: JourneyId,
        campaign_id: CampaignId,
        flow_id: SmolStr,
        reason: String,
    },

    #[serde(rename = "$delegate_called")]
    DelegateCalled {
        journey_id: JourneyId,
        campaign_id: CampaignId,
        node_id: String,
        message: String,
    },

    #[serde(rename = "$customer_updated")]
    CustomerUpdated {
        journey_id: JourneyId,
        campaign_id: CampaignId,
        node_id: String,
        attributes: Vec<String>,
    },

    #[serde(rename = "$event_sent")]
    EventSent {
        journey_id: JourneyId,
        campaign_id: CampaignId,
        node_id: String,
        event_name: SmolStr,
    },

    #[serde(rename = "$experiment_exposure")]
    ExperimentExposure {
        journey_id: JourneyId,
        campaign_id: CampaignId,
        node_id: String,
        variant_id: String,
    },

    #[serde(rename = "$purchase_completed")]
    PurchaseCompleted {
        journey_id: JourneyId,
        campaign_id: CampaignId,
        product_id: String,
    },

    #[serde(rename = "$purchase_failed")]
    PurchaseFailed {
        journey_id: JourneyId,
        campaign_id: CampaignId,
        product_id: String,
        reason: String,
    },

    #[serde(rename = "$restore_completed")]
    RestoreCompleted {
        journey_id: JourneyId,
        campaign_id: CampaignId,
    },

    #[serde(rename = "$restore_failed")]
    RestoreFailed {
        journey_id: JourneyId,
        campaign_id: CampaignId,
        reason: String,
    },

    /// Conversion observed for a goal-bearing campaign.
    #[serde(rename = "$journey_converted")]
    JourneyConverted {
        journey_id: JourneyId,
        campaign_id: CampaignId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        anchor: Option<SmolStr>,
    },
}

impl TrackedEvent {
    /// Wire name of the event (the serde tag).
    pub fn name(&self) -> &'static str {
        match self {
            TrackedEvent::JourneyStarted { .. } => "$journey_started",
            TrackedEvent::JourneyCompleted { .. } => "$journey_completed",
            TrackedEvent::JourneyErrored { .. } => "$journey_errored",
            TrackedEvent::NodeExecuted { .. } => "$journey_node_executed",
            TrackedEvent::FlowShown { .. } => "$flow_shown",
            TrackedEvent::FlowDismissed { .. } => "$flow_dismissed",
            TrackedEvent::DelegateCalled { .. } => "$delegate_called",
            TrackedEvent::CustomerUpdated { .. } => "$customer_updated",
            TrackedEvent::EventSent { .. } => "$event_sent",
            TrackedEvent::ExperimentExposure { .. } => "$experiment_exposure",
            TrackedEvent::PurchaseCompleted { .. } => "$purchase_completed",
            TrackedEvent::PurchaseFailed { .. } => "$purchase_failed",
            TrackedEvent::RestoreCompleted { .. } => "$restore_completed",
            TrackedEvent::RestoreFailed { .. } => "$restore_failed",
            TrackedEvent::JourneyConverted { .. } => "$journey_converted",
        }
    }

    pub fn journey_id(&self) -> JourneyId {
        match self {
            TrackedEvent::JourneyStarted { journey_id, .. }
            | TrackedEvent::JourneyCompleted { journey_id, .. }
            | TrackedEvent::JourneyErrored { journey_id, .. }
            | TrackedEvent::NodeExecuted { journey_id, .. }
            | TrackedEvent::FlowShown { journey_id, .. }
            | TrackedEvent::FlowDismissed { journey_id, .. }
            | TrackedEvent::DelegateCalled { journey_id, .. }
            | TrackedEvent::CustomerUpdated { journey_id, .. }
            | TrackedEvent::EventSent { journey_id, .. }
            | TrackedEvent::ExperimentExposure { journey_id, .. }
            | TrackedEvent::PurchaseCompleted { journey_id, .. }
            | TrackedEvent::PurchaseFailed { journey_id, .. }
            | TrackedEvent::RestoreCompleted { journey_id, .. }
            | TrackedEvent::RestoreFailed { journey_id, .. }
            | TrackedEvent::JourneyConverted { journey_id, .. } => *journey_id,
        }
    }

    pub fn campaign_id(&self) -> CampaignId {
        match self {
            TrackedEvent::JourneyStarted { campaign_id, .. }
            | TrackedEvent::JourneyCompleted { campaign_id, .. }
            | TrackedEvent::JourneyErrored { campaign_id, .. }
            | TrackedEvent::NodeExecuted { campaign_id, .. }
            | TrackedEvent::FlowShown { campaign_id, .. }
            | TrackedEvent::FlowDismissed { campaign_id, .. }
            | TrackedEvent::DelegateCalled { campaign_id, .. }
            | TrackedEvent::CustomerUpdated { campaign_id, .. }
            | TrackedEvent::EventSent { campaign_id, .. }
            | TrackedEvent::ExperimentExposure { campaign_id, .. }
            | TrackedEvent::PurchaseCompleted { campaign_id, .. }
            | TrackedEvent::PurchaseFailed { campaign_id, .. }
            | TrackedEvent::RestoreCompleted { campaign_id, .. }
            | TrackedEvent::RestoreFailed { campaign_id, .. }
            | TrackedEvent::JourneyConverted { campaign_id, .. } => *campaign_id,
        }
    }

    /// Payload fields as a property map (tag stripped).
    pub fn properties(&self) -> Properties {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(mut map)) => {
                map.remove("type");
                map
            }
            _ => Properties::new(),
        }
    }
}

#[cfg(test)]
#[path = "tracking_tests.rs"]
mod tests;
