// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wait-until scenarios: event wins, timeout wins.

use crate::prelude::*;
use nuxie_core::{DistinctId, ExitReason, JourneyStatus};
use serde_json::json;
use std::time::Duration;

fn show_wait_campaign() -> serde_json::Value {
    campaign(
        "cmp-s3",
        "t",
        "every_rematch",
        "show",
        json!({
            "show": { "kind": "show_flow", "flow_id": "f1", "next": ["wait"] },
            "wait": { "kind": "wait_until", "paths": [
                { "id": "bought", "on": "event", "event": "purchase", "next": "a" },
                { "id": "expired", "on": "timeout", "max_time_seconds": 3600, "next": "b" }
            ]},
            "a": { "kind": "exit", "reason": "converted" },
            "b": { "kind": "exit" }
        }),
    )
}

#[tokio::test]
async fn purchase_event_resumes_to_converted() {
    let h = harness();
    h.register(show_wait_campaign());

    h.engine.track(h.event("t", "user-1")).await;
    h.engine.settle().await;
    assert_eq!(h.engine.store().list_paused().len(), 1);

    h.clock.advance(Duration::from_secs(60));
    h.engine.track(h.event("purchase", "user-1")).await;

    let history = h
        .engine
        .store()
        .list_for_campaign(&DistinctId::new("user-1"), "cmp-s3".into());
    let journey = h.engine.store().load(history[0].journey_id).unwrap().unwrap();
    assert_eq!(journey.status, JourneyStatus::Completed);
    assert_eq!(journey.exit_reason, Some(ExitReason::Converted));
    assert_eq!(
        h.executed_path(),
        vec!["show".to_string(), "wait".to_string(), "wait".to_string(), "a".to_string()]
    );
}

#[tokio::test]
async fn timeout_resumes_to_completed() {
    let h = harness();
    h.register(show_wait_campaign());

    h.engine.track(h.event("t", "user-1")).await;
    h.engine.settle().await;

    // No purchase arrives; the deadline passes.
    h.clock.advance(Duration::from_secs(3601));
    h.engine.poll_timers().await;

    let history = h
        .engine
        .store()
        .list_for_campaign(&DistinctId::new("user-1"), "cmp-s3".into());
    let journey = h.engine.store().load(history[0].journey_id).unwrap().unwrap();
    assert_eq!(journey.status, JourneyStatus::Completed);
    assert_eq!(journey.exit_reason, Some(ExitReason::Completed));
    assert_eq!(journey.current_node_id, "b");
}

#[tokio::test]
async fn each_journey_sees_the_event_exactly_once() {
    // Two journeys of different campaigns waiting on the same event
    // both resume, independently.
    let h = harness();
    for id in ["cmp-w1", "cmp-w2"] {
        h.register(campaign(
            id,
            "t",
            "every_rematch",
            "wait",
            json!({
                "wait": { "kind": "wait_until", "paths": [
                    { "id": "go", "on": "event", "event": "signal", "next": "done" }
                ]},
                "done": { "kind": "exit" }
            }),
        ));
    }

    h.engine.track(h.event("t", "user-1")).await;
    assert_eq!(h.engine.store().list_paused().len(), 2);

    h.engine.track(h.event("signal", "user-1")).await;
    assert!(h.engine.store().list_paused().is_empty());

    for id in ["cmp-w1", "cmp-w2"] {
        let history = h
            .engine
            .store()
            .list_for_campaign(&DistinctId::new("user-1"), id.into());
        assert_eq!(history[0].status, JourneyStatus::Completed, "{id}");
    }
}

#[tokio::test]
async fn wait_predicate_filters_events() {
    let h = harness();
    let mut def = campaign(
        "cmp-pred",
        "t",
        "every_rematch",
        "wait",
        json!({
            "wait": { "kind": "wait_until", "paths": [
                { "id": "big", "on": "event", "event": "purchase",
                  "predicate": { "root": {
                      "op": "compare", "cmp": ">=",
                      "left": { "op": "var", "path": "amount" },
                      "right": { "op": "number", "value": 50.0 }
                  }},
                  "next": "done" }
            ]},
            "done": { "kind": "exit", "reason": "converted" }
        }),
    );
    def["message_limit"] = json!(1);
    h.register(def);

    h.engine.track(h.event("t", "user-1")).await;

    // Too small: journey stays paused.
    h.engine
        .track(h.event("purchase", "user-1").property("amount", 10))
        .await;
    assert_eq!(h.engine.store().list_paused().len(), 1);

    h.engine
        .track(h.event("purchase", "user-1").property("amount", 99))
        .await;
    assert!(h.engine.store().list_paused().is_empty());
}
