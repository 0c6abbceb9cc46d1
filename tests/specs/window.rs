// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time-window scenario: outside hours pauses until the window opens.

use crate::prelude::*;
use nuxie_core::{DistinctId, JourneyStatus};
use serde_json::json;
use std::time::Duration;

// 2023-11-15 12:00:00 UTC (a Wednesday).
const WED_NOON_UTC: u64 = 1_700_049_600_000;

#[tokio::test]
async fn outside_hours_pauses_until_next_open() {
    let h = harness();
    h.clock.set_epoch_ms(WED_NOON_UTC);
    h.register(campaign(
        "cmp-s7",
        "t",
        "every_rematch",
        "window",
        json!({
            "window": {
                "kind": "time_window",
                "start_time": "22:00",
                "end_time": "06:00",
                "timezone": "UTC",
                "next": ["show"]
            },
            "show": { "kind": "show_flow", "flow_id": "night_owl", "next": ["done"] },
            "done": { "kind": "exit" }
        }),
    ));

    // Trigger at noon: 22:00–06:00 is closed.
    h.engine.track(h.event("t", "user-1")).await;
    let paused = h.engine.store().list_paused();
    assert_eq!(paused.len(), 1);
    assert_eq!(paused[0].resume_at_ms, Some(WED_NOON_UTC + 10 * 3_600_000));

    // 22:00 arrives.
    h.clock.advance(Duration::from_secs(10 * 3600));
    h.engine.poll_timers().await;
    h.engine.settle().await;

    let journey = h.engine.store().load(paused[0].journey_id).unwrap().unwrap();
    assert_eq!(journey.status, JourneyStatus::Completed);
    assert_eq!(h.flows.requests().len(), 1);
    assert_eq!(h.flows.requests()[0].flow_id, "night_owl");
}

#[tokio::test]
async fn inside_window_continues_straight_through() {
    let h = harness();
    // 03:00 UTC: inside the overnight window.
    h.clock.set_epoch_ms(WED_NOON_UTC - 9 * 3_600_000);
    h.register(campaign(
        "cmp-s7b",
        "t",
        "every_rematch",
        "window",
        json!({
            "window": {
                "kind": "time_window",
                "start_time": "22:00",
                "end_time": "06:00",
                "timezone": "UTC",
                "next": ["done"]
            },
            "done": { "kind": "exit" }
        }),
    ));

    h.engine.track(h.event("t", "user-1")).await;
    let history = h
        .engine
        .store()
        .list_for_campaign(&DistinctId::new("user-1"), "cmp-s7b".into());
    assert_eq!(history[0].status, JourneyStatus::Completed);
}
