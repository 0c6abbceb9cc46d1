// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for node tests.

use super::{execute, ExecCtx, NodeOutcome, ResumeCause};
use nuxie_campaign::{Campaign, CampaignDef};
use nuxie_core::{Journey, Properties, Snapshot, UserEvent};

/// Compile a campaign around the given workflow, entering at `entry`.
pub(crate) fn campaign(workflow: serde_json::Value, entry: &str) -> Campaign {
    let def: CampaignDef = serde_json::from_value(serde_json::json!({
        "campaign_id": "cmp-node-test",
        "name": "node test",
        "version": 1,
        "published_at_ms": 0,
        "trigger": { "event": "t" },
        "entry_node_id": entry,
        "frequency_policy": "every_rematch",
        "workflow": workflow
    }))
    .expect("test campaign must parse");
    Campaign::compile(def).expect("test campaign must compile")
}

/// A journey positioned at the campaign entry node.
pub(crate) fn journey_at_entry(campaign: &Campaign) -> Journey {
    Journey::builder()
        .campaign_id(campaign.id.as_str())
        .current_node_id(campaign.entry_node_id.clone())
        .build()
}

pub(crate) fn start() -> ResumeCause {
    ResumeCause::Start { origin: None }
}

pub(crate) fn event(name: &str, path: usize, props: serde_json::Value) -> ResumeCause {
    let mut event = UserEvent::new(name, "user-1", 0);
    if let serde_json::Value::Object(map) = props {
        event.properties = map;
    }
    ResumeCause::Event { event, path }
}

/// Execute the journey's current node against the given cause.
pub(crate) fn run(
    campaign: &Campaign,
    journey: &Journey,
    user_props: &Properties,
    cause: &ResumeCause,
    now_ms: u64,
) -> NodeOutcome {
    let ix = campaign
        .workflow
        .resolve(&journey.current_node_id)
        .expect("current node must exist");
    let node = campaign.workflow.node(ix);
    let mut snapshot = Snapshot::new().layer(&journey.context).layer(user_props);
    if let Some(props) = cause.event_properties() {
        snapshot = snapshot.layer(props);
    }
    let ctx = ExecCtx {
        journey,
        campaign,
        node,
        snapshot,
        events: &[],
        now_ms,
        cause,
    };
    execute(&ctx)
}

/// Node id a `Continue`/`Skip` verdict lands on.
pub(crate) fn next_id(campaign: &Campaign, outcome: &NodeOutcome) -> String {
    match outcome.verdict {
        super::Verdict::Continue(next) | super::Verdict::Skip(next) => {
            campaign.workflow.node(next).id.clone()
        }
        _ => panic!("expected continue/skip, got {:?}", outcome.verdict),
    }
}
