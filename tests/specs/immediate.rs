// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronous journeys: trigger to terminal state in one advance.

use crate::prelude::*;
use nuxie_core::{DistinctId, ExitReason, JourneyStatus};
use serde_json::json;

#[tokio::test]
async fn immediate_branch_completes_in_one_advance() {
    let h = harness();
    h.register(campaign(
        "cmp-s1",
        "t",
        "every_rematch",
        "branch",
        json!({
            "branch": {
                "kind": "branch",
                "condition": { "root": { "op": "bool", "value": true } },
                "next": ["a", "b"]
            },
            "a": { "kind": "exit" },
            "b": { "kind": "exit", "reason": "exited_by_policy" }
        }),
    ));

    h.engine.track(h.event("t", "user-1")).await;

    let history = h
        .engine
        .store()
        .list_for_campaign(&DistinctId::new("user-1"), "cmp-s1".into());
    assert_eq!(history.len(), 1);

    let journey = h.engine.store().load(history[0].journey_id).unwrap().unwrap();
    assert_eq!(journey.status, JourneyStatus::Completed);
    assert_eq!(journey.exit_reason, Some(ExitReason::Completed));
    assert_eq!(h.executed_path(), vec!["branch".to_string(), "a".to_string()]);
}

#[tokio::test]
async fn false_condition_takes_second_branch() {
    let h = harness();
    h.register(campaign(
        "cmp-s1b",
        "t",
        "every_rematch",
        "branch",
        json!({
            "branch": {
                "kind": "branch",
                "condition": { "root": { "op": "bool", "value": false } },
                "next": ["a", "b"]
            },
            "a": { "kind": "exit" },
            "b": { "kind": "exit", "reason": "exited_by_policy" }
        }),
    ));

    h.engine.track(h.event("t", "user-1")).await;

    let history = h
        .engine
        .store()
        .list_for_campaign(&DistinctId::new("user-1"), "cmp-s1b".into());
    let journey = h.engine.store().load(history[0].journey_id).unwrap().unwrap();
    assert_eq!(journey.exit_reason, Some(ExitReason::ExitedByPolicy));
    assert_eq!(h.executed_path(), vec!["branch".to_string(), "b".to_string()]);
}
