// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Frequency and re-entry policy scenarios.

use crate::prelude::*;
use nuxie_core::{DistinctId, JourneyStatus};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn once_policy_ignores_second_trigger() {
    let h = harness();
    h.register(campaign(
        "cmp-s5",
        "t",
        "once",
        "done",
        json!({ "done": { "kind": "exit" } }),
    ));

    h.engine.track(h.event("t", "user-1")).await;
    h.engine.track(h.event("t", "user-1")).await;

    let history = h
        .engine
        .store()
        .list_for_campaign(&DistinctId::new("user-1"), "cmp-s5".into());
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn every_rematch_spawns_isolated_journeys() {
    let h = harness();
    h.register(campaign(
        "cmp-s6",
        "t",
        "every_rematch",
        "tag",
        json!({
            "tag": { "kind": "experiment", "variants": [
                { "id": "x", "weight": 1, "next": "done" }
            ]},
            "done": { "kind": "exit" }
        }),
    ));

    for _ in 0..3 {
        h.engine.track(h.event("t", "user-1")).await;
    }

    let history = h
        .engine
        .store()
        .list_for_campaign(&DistinctId::new("user-1"), "cmp-s6".into());
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|s| s.status == JourneyStatus::Completed));

    // Context maps are per-journey: each recorded its own assignment,
    // none bled into another record.
    for summary in &history {
        let journey = h.engine.store().load(summary.journey_id).unwrap().unwrap();
        assert_eq!(journey.context.get("experiment.tag"), Some(&json!("x")));
        assert_eq!(journey.context.len(), 1);
    }
}

#[tokio::test]
async fn interval_policy_allows_after_cooldown() {
    let h = harness();
    let mut def = campaign(
        "cmp-interval",
        "t",
        "one_time_per_interval",
        "done",
        json!({ "done": { "kind": "exit" } }),
    );
    def["frequency_interval_seconds"] = json!(86_400);
    h.register(def);

    h.engine.track(h.event("t", "user-1")).await;
    h.clock.advance(Duration::from_secs(3600));
    h.engine.track(h.event("t", "user-1")).await;

    let user = DistinctId::new("user-1");
    assert_eq!(h.engine.store().list_for_campaign(&user, "cmp-interval".into()).len(), 1);

    h.clock.advance(Duration::from_secs(86_400));
    h.engine.track(h.event("t", "user-1")).await;
    assert_eq!(h.engine.store().list_for_campaign(&user, "cmp-interval".into()).len(), 2);
}

#[tokio::test]
async fn policies_are_scoped_per_user() {
    let h = harness();
    h.register(campaign(
        "cmp-s5",
        "t",
        "once",
        "done",
        json!({ "done": { "kind": "exit" } }),
    ));

    h.engine.track(h.event("t", "user-1")).await;
    h.engine.track(h.event("t", "user-2")).await;

    for user in ["user-1", "user-2"] {
        let history = h
            .engine
            .store()
            .list_for_campaign(&DistinctId::new(user), "cmp-s5".into());
        assert_eq!(history.len(), 1, "{user}");
    }
}
