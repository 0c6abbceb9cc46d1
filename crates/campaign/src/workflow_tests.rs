// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

fn campaign(workflow: serde_json::Value, entry: &str) -> Result<Campaign, WorkflowError> {
    let def: CampaignDef = serde_json::from_value(json!({
        "campaign_id": "cmp-t",
        "name": "t",
        "version": 1,
        "published_at_ms": 0,
        "trigger": { "event": "t" },
        "entry_node_id": entry,
        "frequency_policy": "every_rematch",
        "workflow": workflow
    }))
    .unwrap_or_else(|e| panic!("test campaign must parse: {e}"));
    Campaign::compile(def)
}

#[test]
fn compiles_and_resolves_indices() {
    let campaign = campaign(
        json!({
            "a": { "kind": "time_delay", "duration_seconds": 60, "next": ["b"] },
            "b": { "kind": "exit" }
        }),
        "a",
    )
    .unwrap();

    let workflow = &campaign.workflow;
    assert_eq!(workflow.len(), 2);
    let a = workflow.resolve("a").unwrap();
    assert_eq!(workflow.entry(), a);
    let node = workflow.node(a);
    assert_eq!(node.id, "a");
    assert_eq!(node.kind_name(), "time_delay");

    let b = node.next[0];
    assert_eq!(workflow.node(b).id, "b");
    assert!(matches!(workflow.node(b).kind, NodeKind::Exit { reason: nuxie_core::ExitReason::Completed }));
}

#[test]
fn missing_entry_rejected() {
    let err = campaign(json!({ "a": { "kind": "exit" } }), "nope").unwrap_err();
    assert_eq!(err, WorkflowError::MissingEntry("nope".into()));
}

#[test]
fn empty_workflow_rejected() {
    let err = campaign(json!({}), "a").unwrap_err();
    assert_eq!(err, WorkflowError::EmptyWorkflow);
}

#[test]
fn unknown_successor_rejected() {
    let err = campaign(
        json!({ "a": { "kind": "time_delay", "duration_seconds": 1, "next": ["ghost"] } }),
        "a",
    )
    .unwrap_err();
    assert_eq!(
        err,
        WorkflowError::UnknownSuccessor { node: "a".into(), successor: "ghost".into() }
    );
}

#[test]
fn branch_requires_two_successors() {
    let err = campaign(
        json!({
            "a": {
                "kind": "branch",
                "condition": { "root": { "op": "bool", "value": true } },
                "next": ["b"]
            },
            "b": { "kind": "exit" }
        }),
        "a",
    )
    .unwrap_err();
    assert_eq!(err, WorkflowError::SuccessorArity { node: "a".into(), expected: 2, found: 1 });
}

#[test]
fn inline_id_must_match_key() {
    let err = campaign(
        json!({ "a": { "id": "other", "kind": "exit" } }),
        "a",
    )
    .unwrap_err();
    assert_eq!(err, WorkflowError::IdMismatch { node: "a".into(), inline: "other".into() });
}

#[test]
fn exit_with_successor_rejected() {
    let err = campaign(
        json!({
            "a": { "kind": "exit", "next": ["a"] }
        }),
        "a",
    )
    .unwrap_err();
    assert!(matches!(err, WorkflowError::SuccessorArity { .. }));
}

#[test]
fn cycle_without_pause_rejected() {
    let err = campaign(
        json!({
            "a": {
                "kind": "branch",
                "condition": { "root": { "op": "bool", "value": true } },
                "next": ["b", "c"]
            },
            "b": { "kind": "send_event", "event_name": "loop", "next": ["a"] },
            "c": { "kind": "exit" }
        }),
        "a",
    )
    .unwrap_err();
    assert!(matches!(err, WorkflowError::CycleWithoutWait { .. }));
}

#[test]
fn cycle_through_delay_allowed() {
    // Same shape, but the back-edge passes a positive delay.
    let campaign = campaign(
        json!({
            "a": {
                "kind": "branch",
                "condition": { "root": { "op": "bool", "value": true } },
                "next": ["b", "c"]
            },
            "b": { "kind": "time_delay", "duration_seconds": 3600, "next": ["a"] },
            "c": { "kind": "exit" }
        }),
        "a",
    );
    assert!(campaign.is_ok());
}

#[test]
fn zero_delay_does_not_break_cycles() {
    // duration ≤ 0 continues synchronously, so it cannot legalize a cycle.
    let err = campaign(
        json!({
            "a": { "kind": "time_delay", "duration_seconds": 0, "next": ["b"] },
            "b": { "kind": "time_delay", "duration_seconds": -5, "next": ["a"] }
        }),
        "a",
    )
    .unwrap_err();
    assert!(matches!(err, WorkflowError::CycleWithoutWait { .. }));
}

#[test]
fn wait_until_cycle_allowed() {
    let campaign = campaign(
        json!({
            "w": {
                "kind": "wait_until",
                "paths": [
                    { "id": "again", "on": "event", "event": "retry", "next": "w" },
                    { "id": "out", "on": "timeout", "max_time_seconds": 60, "next": "x" }
                ]
            },
            "x": { "kind": "exit" }
        }),
        "w",
    );
    assert!(campaign.is_ok());
}

#[test]
fn bad_timezone_rejected() {
    let err = campaign(
        json!({
            "w": {
                "kind": "time_window",
                "start_time": "09:00",
                "end_time": "17:00",
                "timezone": "Mars/Olympus",
                "next": ["x"]
            },
            "x": { "kind": "exit" }
        }),
        "w",
    )
    .unwrap_err();
    assert!(matches!(err, WorkflowError::UnknownTimezone { .. }));
}

#[parameterized(
    hour_out_of_range = { "25:00" },
    minute_out_of_range = { "12:71" },
    not_a_time = { "noon" },
    missing_minutes = { "12" },
)]
fn bad_time_of_day_rejected(bad: &str) {
    let err = campaign(
        json!({
            "w": {
                "kind": "time_window",
                "start_time": bad,
                "end_time": "17:00",
                "timezone": "UTC",
                "next": ["x"]
            },
            "x": { "kind": "exit" }
        }),
        "w",
    )
    .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTimeOfDay { .. }), "{bad}");
}

#[test]
fn day_of_week_range_checked() {
    let err = campaign(
        json!({
            "w": {
                "kind": "time_window",
                "start_time": "09:00",
                "end_time": "17:00",
                "timezone": "UTC",
                "days_of_week": [0],
                "next": ["x"]
            },
            "x": { "kind": "exit" }
        }),
        "w",
    )
    .unwrap_err();
    assert_eq!(err, WorkflowError::InvalidDayOfWeek { node: "w".into(), value: 0 });
}

#[test]
fn timeout_path_requires_max_time() {
    let err = campaign(
        json!({
            "w": {
                "kind": "wait_until",
                "paths": [ { "id": "t", "on": "timeout", "next": "x" } ]
            },
            "x": { "kind": "exit" }
        }),
        "w",
    )
    .unwrap_err();
    assert!(matches!(err, WorkflowError::TimeoutWithoutMaxTime { .. }));
}

#[test]
fn experiment_needs_positive_weight() {
    let err = campaign(
        json!({
            "e": {
                "kind": "experiment",
                "variants": [
                    { "id": "a", "weight": 0, "next": "x" },
                    { "id": "b", "weight": 0, "next": "x" }
                ]
            },
            "x": { "kind": "exit" }
        }),
        "e",
    )
    .unwrap_err();
    assert_eq!(err, WorkflowError::NoVariants { node: "e".into() });
}

#[parameterized(
    completed = { "completed", nuxie_core::ExitReason::Completed },
    converted = { "converted", nuxie_core::ExitReason::Converted },
    exited_by_policy = { "exited_by_policy", nuxie_core::ExitReason::ExitedByPolicy },
    errored = { "errored", nuxie_core::ExitReason::Errored },
    superseded = { "superseded", nuxie_core::ExitReason::Superseded },
    user_dismissed = { "user_dismissed", nuxie_core::ExitReason::UserDismissed },
    other = { "other", nuxie_core::ExitReason::Other },
)]
fn exit_reason_literals_compile_to_their_variant(wire: &str, expected: nuxie_core::ExitReason) {
    let campaign = campaign(
        json!({ "done": { "kind": "exit", "reason": wire } }),
        "done",
    )
    .unwrap();
    let node = campaign.workflow.node(campaign.workflow.entry());
    assert!(matches!(node.kind, NodeKind::Exit { reason } if reason == expected));
}

#[test]
fn missing_exit_reason_defaults_to_completed() {
    let campaign = campaign(json!({ "done": { "kind": "exit" } }), "done").unwrap();
    let node = campaign.workflow.node(campaign.workflow.entry());
    assert!(matches!(
        node.kind,
        NodeKind::Exit { reason: nuxie_core::ExitReason::Completed }
    ));
}

#[test]
fn unrecognized_exit_reason_maps_to_other() {
    let campaign = campaign(
        json!({ "done": { "kind": "exit", "reason": "abducted" } }),
        "done",
    )
    .unwrap();
    let node = campaign.workflow.node(campaign.workflow.entry());
    assert!(matches!(node.kind, NodeKind::Exit { reason: nuxie_core::ExitReason::Other }));
}

#[test]
fn purchase_uses_success_failure_edges() {
    let campaign = campaign(
        json!({
            "p": { "kind": "purchase", "product_id": "pro_monthly", "next": ["ok", "no"] },
            "ok": { "kind": "exit", "reason": "converted" },
            "no": { "kind": "exit" }
        }),
        "p",
    )
    .unwrap();
    let workflow = &campaign.workflow;
    let p = workflow.node(workflow.entry());
    assert_eq!(workflow.node(p.next[0]).id, "ok");
    assert_eq!(workflow.node(p.next[1]).id, "no");
    assert!(matches!(
        workflow.node(p.next[0]).kind,
        NodeKind::Exit { reason: nuxie_core::ExitReason::Converted }
    ));
}

#[test]
fn successors_include_payload_edges() {
    let campaign = campaign(
        json!({
            "w": {
                "kind": "wait_until",
                "paths": [ { "id": "e", "on": "event", "event": "go", "next": "x" } ]
            },
            "x": { "kind": "exit" }
        }),
        "w",
    )
    .unwrap();
    let workflow = &campaign.workflow;
    let node = workflow.node(workflow.entry());
    assert_eq!(node.successors().len(), 1);
    assert!(node.can_pause());
}
