// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::nodes::test_support::{campaign, event, journey_at_entry, next_id, run, start};
use crate::nodes::{ResumeCause, Verdict};
use nuxie_core::{Properties, WaitKind};
use serde_json::json;

fn wait_campaign(paths: serde_json::Value) -> nuxie_campaign::Campaign {
    campaign(
        json!({
            "w": { "kind": "wait_until", "paths": paths },
            "a": { "kind": "exit", "reason": "converted" },
            "b": { "kind": "exit" },
            "c": { "kind": "exit" }
        }),
        "w",
    )
}

#[test]
fn registers_waits_and_earliest_timeout() {
    let campaign = wait_campaign(json!([
        { "id": "bought", "on": "event", "event": "purchase", "next": "a" },
        { "id": "slow", "on": "timeout", "max_time_seconds": 7200, "next": "b" },
        { "id": "fast", "on": "timeout", "max_time_seconds": 3600, "next": "c" }
    ]));
    let journey = journey_at_entry(&campaign);
    let outcome = run(&campaign, &journey, &Properties::new(), &start(), 1_000_000);

    let Verdict::Async { resume_at_ms, waits } = &outcome.verdict else {
        panic!("expected async, got {:?}", outcome.verdict);
    };
    // Earliest timeout wins the deadline.
    assert_eq!(*resume_at_ms, Some(1_000_000 + 3_600_000));
    assert_eq!(waits.len(), 1);
    assert_eq!(waits[0].path, 0);
    assert!(matches!(&waits[0].kind, WaitKind::Event { name, .. } if name == "purchase"));
}

#[test]
fn true_expression_path_continues_immediately() {
    let campaign = wait_campaign(json!([
        { "id": "already", "on": "expression",
          "condition": { "root": { "op": "has", "path": "done" } }, "next": "a" },
        { "id": "out", "on": "timeout", "max_time_seconds": 60, "next": "b" }
    ]));
    let journey = journey_at_entry(&campaign);

    let mut user_props = Properties::new();
    user_props.insert("done".into(), json!(true));
    let outcome = run(&campaign, &journey, &user_props, &start(), 0);
    assert_eq!(next_id(&campaign, &outcome), "a");
}

#[test]
fn earliest_declared_true_expression_wins() {
    let campaign = wait_campaign(json!([
        { "id": "first", "on": "expression",
          "condition": { "root": { "op": "bool", "value": true } }, "next": "a" },
        { "id": "second", "on": "expression",
          "condition": { "root": { "op": "bool", "value": true } }, "next": "b" }
    ]));
    let journey = journey_at_entry(&campaign);
    let outcome = run(&campaign, &journey, &Properties::new(), &start(), 0);
    assert_eq!(next_id(&campaign, &outcome), "a");
}

#[test]
fn false_expression_registers_wildcard_wait() {
    let campaign = wait_campaign(json!([
        { "id": "later", "on": "expression",
          "condition": { "root": { "op": "has", "path": "done" } }, "next": "a" }
    ]));
    let journey = journey_at_entry(&campaign);
    let outcome = run(&campaign, &journey, &Properties::new(), &start(), 0);

    let Verdict::Async { resume_at_ms, waits } = &outcome.verdict else {
        panic!("expected async");
    };
    // Indefinite wait is legal with conditions registered.
    assert_eq!(*resume_at_ms, None);
    assert_eq!(waits.len(), 1);
    assert!(matches!(&waits[0].kind, WaitKind::Event { name, predicate: Some(_) } if name.is_empty()));
}

#[test]
fn event_resume_takes_matched_path() {
    let campaign = wait_campaign(json!([
        { "id": "bought", "on": "event", "event": "purchase", "next": "a" },
        { "id": "out", "on": "timeout", "max_time_seconds": 3600, "next": "b" }
    ]));
    let mut journey = journey_at_entry(&campaign);
    journey.pause(Some(3_600_000), vec![], 0);

    let outcome = run(
        &campaign,
        &journey,
        &Properties::new(),
        &event("purchase", 0, json!({})),
        60_000,
    );
    assert_eq!(next_id(&campaign, &outcome), "a");
}

#[test]
fn timer_resume_takes_earliest_timeout_path() {
    let campaign = wait_campaign(json!([
        { "id": "bought", "on": "event", "event": "purchase", "next": "a" },
        { "id": "slow", "on": "timeout", "max_time_seconds": 7200, "next": "b" },
        { "id": "fast", "on": "timeout", "max_time_seconds": 3600, "next": "c" }
    ]));
    let mut journey = journey_at_entry(&campaign);
    journey.pause(Some(3_600_000), vec![], 0);

    let outcome = run(&campaign, &journey, &Properties::new(), &ResumeCause::Timer, 3_600_001);
    assert_eq!(next_id(&campaign, &outcome), "c");
}

#[test]
fn early_timer_fire_repauses() {
    let campaign = wait_campaign(json!([
        { "id": "out", "on": "timeout", "max_time_seconds": 3600, "next": "b" },
        { "id": "bought", "on": "event", "event": "purchase", "next": "a" }
    ]));
    let mut journey = journey_at_entry(&campaign);
    let waits = vec![nuxie_core::WaitCondition {
        path: 1,
        kind: WaitKind::Event { name: "purchase".into(), predicate: None },
    }];
    journey.pause(Some(3_600_000), waits.clone(), 0);

    // Clock skew: the scheduler fired 10 minutes early.
    let outcome = run(&campaign, &journey, &Properties::new(), &ResumeCause::Timer, 3_000_000);
    assert_eq!(
        outcome.verdict,
        Verdict::Async { resume_at_ms: Some(3_600_000), waits }
    );
}

#[test]
fn stale_path_index_reenters_wait() {
    // The workflow shrank under a persisted journey: path 9 no longer
    // exists. The node falls back to waiting again.
    let campaign = wait_campaign(json!([
        { "id": "bought", "on": "event", "event": "purchase", "next": "a" }
    ]));
    let journey = journey_at_entry(&campaign);
    let outcome = run(
        &campaign,
        &journey,
        &Properties::new(),
        &event("purchase", 9, json!({})),
        0,
    );
    assert!(matches!(outcome.verdict, Verdict::Async { .. }));
}

#[test]
fn segment_path_registers_segment_wait() {
    let campaign = wait_campaign(json!([
        { "id": "joined", "on": "segment", "segment_id": "seg-vip", "next": "a" }
    ]));
    let journey = journey_at_entry(&campaign);
    let outcome = run(&campaign, &journey, &Properties::new(), &start(), 0);

    let Verdict::Async { waits, .. } = &outcome.verdict else {
        panic!("expected async");
    };
    assert!(matches!(&waits[0].kind, WaitKind::SegmentChange { segment_id } if segment_id == "seg-vip"));
}
