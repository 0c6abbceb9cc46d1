// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash-consistent recovery: paused journeys survive a process
//! restart and wake at the right instant.

use crate::prelude::*;
use nuxie_core::{JourneyStatus, UserEvent};
use serde_json::json;
use std::time::Duration;

fn delay_show_exit() -> serde_json::Value {
    campaign(
        "cmp-s2",
        "t",
        "every_rematch",
        "delay",
        json!({
            "delay": { "kind": "time_delay", "duration_seconds": 3600, "next": ["show"] },
            "show": { "kind": "show_flow", "flow_id": "f1", "next": ["done"] },
            "done": { "kind": "exit" }
        }),
    )
}

#[tokio::test]
async fn paused_journey_survives_restart_and_resumes_on_time() {
    let dir = tempfile::TempDir::new().expect("tempdir");

    // Process one: trigger at T0, pause at the delay, die at T0+10s.
    let t0 = {
        let h = harness_at(dir.path());
        h.register(delay_show_exit());
        let t0 = h.now();
        h.engine.track(h.event("t", "user-1")).await;

        let paused = h.engine.store().list_paused();
        assert_eq!(paused.len(), 1);
        assert_eq!(paused[0].resume_at_ms, Some(t0 + 3_600_000));

        h.clock.advance(Duration::from_secs(10));
        h.engine.shutdown();
        t0
    };

    // Process two: restart at T0+3605s, past the deadline.
    let h = harness_at(dir.path());
    h.register(delay_show_exit());
    h.clock.set_epoch_ms(t0 + 3_605_000);
    h.engine.recover().await;
    h.engine.settle().await;

    let paused = h.engine.store().list_paused();
    assert!(paused.is_empty(), "journey should have woken");

    let shown = h.analytics.with_name("$flow_shown");
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].properties.get("flow_id"), Some(&json!("f1")));
    assert_eq!(h.flows.requests().len(), 1);

    let history = h
        .engine
        .store()
        .list_for_campaign(&nuxie_core::DistinctId::new("user-1"), "cmp-s2".into());
    let journey = h.engine.store().load(history[0].journey_id).unwrap().unwrap();
    assert_eq!(journey.status, JourneyStatus::Completed);
}

#[tokio::test]
async fn persisted_journey_roundtrips_exactly() {
    // R1: save then load returns an equal record, across a reopen.
    let dir = tempfile::TempDir::new().expect("tempdir");
    let (id, saved) = {
        let h = harness_at(dir.path());
        h.register(delay_show_exit());
        h.engine.track(h.event("t", "user-1")).await;
        let id = h.engine.store().list_paused()[0].journey_id;
        let saved = h.engine.store().load(id).unwrap().unwrap();
        h.engine.shutdown();
        (id, saved)
    };

    let h = harness_at(dir.path());
    let reloaded = h.engine.store().load(id).unwrap().unwrap();
    assert_eq!(reloaded, saved);
}

#[tokio::test]
async fn ingestion_assigns_clock_timestamp_when_unset() {
    let h = harness();
    h.register(campaign(
        "cmp-ts",
        "t",
        "every_rematch",
        "done",
        json!({ "done": { "kind": "exit" } }),
    ));

    let event = UserEvent::new("t", "user-1", 0);
    h.engine.track(event).await;

    let history = h
        .engine
        .store()
        .list_for_campaign(&nuxie_core::DistinctId::new("user-1"), "cmp-ts".into());
    assert_eq!(history.len(), 1);
}
