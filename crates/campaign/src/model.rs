// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Campaign wire format, as published by the dashboard.
//!
//! Everything here mirrors the JSON shape one-to-one; semantic checks
//! (successor resolution, cycle detection, time parsing) happen when a
//! definition compiles into a [`crate::Workflow`].

use indexmap::IndexMap;
use nuxie_core::{CampaignId, PredicateIr, Properties};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;
use std::collections::BTreeSet;

/// Re-entry rule for a `(campaign, user)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyPolicy {
    /// At most one journey ever.
    Once,
    /// Next journey allowed once `frequency_interval` elapsed since the
    /// last start.
    OneTimePerInterval,
    /// Every matching trigger starts a journey.
    EveryRematch,
    /// No new journeys once the goal was observed.
    UntilConverted,
}

nuxie_core::simple_display! {
    FrequencyPolicy {
        Once => "once",
        OneTimePerInterval => "one_time_per_interval",
        EveryRematch => "every_rematch",
        UntilConverted => "until_converted",
    }
}

/// What happens to active journeys when the campaign goal is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitPolicy {
    None,
    ExitOnGoal,
}

/// Campaign trigger: an event name plus an optional audience predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDef {
    pub event: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<PredicateIr>,
}

/// A campaign as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignDef {
    pub campaign_id: CampaignId,
    pub name: String,
    pub version: u32,
    pub published_at_ms: u64,
    pub trigger: TriggerDef,
    pub entry_node_id: String,
    /// Node id → node. Declaration order is preserved (IndexMap) but
    /// only wait-path order inside a node is semantic.
    pub workflow: IndexMap<String, NodeDef>,
    pub frequency_policy: FrequencyPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_interval_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<PredicateIr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_policy: Option<ExitPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_anchor: Option<SmolStr>,
}

/// One workflow node on the wire. The map key is the canonical id; an
/// inline `id` field, when present, must agree with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Ordered successors. Meaning depends on kind: branch is
    /// `[true, false]`, purchase/restore are `[success, failure]`,
    /// most others take a single successor.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next: Vec<String>,
    #[serde(flatten)]
    pub kind: NodeKindDef,
}

/// Node payloads, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKindDef {
    Branch {
        condition: PredicateIr,
    },
    TimeDelay {
        duration_seconds: i64,
    },
    TimeWindow {
        /// "HH:mm" local time in `timezone`.
        start_time: String,
        end_time: String,
        /// IANA zone name, e.g. "America/Chicago".
        timezone: String,
        /// 1–7 with Sunday = 1. Absent means all days.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        days_of_week: Option<BTreeSet<u8>>,
    },
    WaitUntil {
        paths: Vec<WaitPathDef>,
    },
    ShowFlow {
        flow_id: SmolStr,
        #[serde(default, skip_serializing_if = "Properties::is_empty")]
        parameters: Properties,
    },
    CallDelegate {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    Purchase {
        product_id: String,
    },
    Restore,
    UpdateCustomer {
        attributes: Properties,
    },
    SendEvent {
        event_name: SmolStr,
        #[serde(default, skip_serializing_if = "Properties::is_empty")]
        properties: Properties,
    },
    Exit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Remote-action extension: the server runs the action against the
    /// journey's context and may return context updates.
    RemoteAction {
        action: String,
    },
    Experiment {
        variants: Vec<VariantDef>,
    },
}

/// One path of a wait-until node. Declaration order is semantic: when
/// several paths match simultaneously, the earliest-declared wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitPathDef {
    pub id: String,
    #[serde(flatten)]
    pub condition: WaitConditionDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time_seconds: Option<u64>,
    pub next: String,
}

/// What a wait path waits on, discriminated by `on`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "on", rename_all = "snake_case")]
pub enum WaitConditionDef {
    /// An IR expression over the current context, checked on entry and
    /// re-checked whenever the journey wakes.
    Expression { condition: PredicateIr },
    /// An ingested event by name, optionally filtered.
    Event {
        event: SmolStr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        predicate: Option<PredicateIr>,
    },
    /// Segment membership change for the journey's user.
    Segment { segment_id: String },
    /// Pure timeout path; requires `max_time_seconds`.
    Timeout,
}

/// One arm of an experiment node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDef {
    pub id: String,
    pub weight: u32,
    pub next: String,
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
