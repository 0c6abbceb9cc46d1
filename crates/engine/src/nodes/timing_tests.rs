// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::nodes::test_support::{campaign, journey_at_entry, next_id, run, start};
use crate::nodes::{ResumeCause, Verdict};
use nuxie_core::Properties;
use serde_json::json;
use yare::parameterized;

fn delay_campaign(duration: i64) -> nuxie_campaign::Campaign {
    campaign(
        json!({
            "wait": { "kind": "time_delay", "duration_seconds": duration, "next": ["done"] },
            "done": { "kind": "exit" }
        }),
        "wait",
    )
}

fn window_campaign(start: &str, end: &str, tz: &str, days: Option<Vec<u8>>) -> nuxie_campaign::Campaign {
    let mut node = json!({
        "kind": "time_window",
        "start_time": start,
        "end_time": end,
        "timezone": tz,
        "next": ["done"]
    });
    if let Some(days) = days {
        node["days_of_week"] = json!(days);
    }
    campaign(json!({ "w": node, "done": { "kind": "exit" } }), "w")
}

// 2023-11-15 (a Wednesday) 12:00:00 UTC.
const WED_NOON_UTC: u64 = 1_700_049_600_000;

#[parameterized(
    zero = { 0 },
    negative = { -30 },
)]
fn non_positive_delay_continues_immediately(duration: i64) {
    let campaign = delay_campaign(duration);
    let journey = journey_at_entry(&campaign);
    let outcome = run(&campaign, &journey, &Properties::new(), &start(), 5_000);
    assert_eq!(next_id(&campaign, &outcome), "done");
}

#[test]
fn positive_delay_pauses_until_deadline() {
    let campaign = delay_campaign(3600);
    let journey = journey_at_entry(&campaign);
    let outcome = run(&campaign, &journey, &Properties::new(), &start(), 10_000);
    assert_eq!(
        outcome.verdict,
        Verdict::Async { resume_at_ms: Some(10_000 + 3_600_000), waits: vec![] }
    );
}

#[test]
fn delay_deadline_computed_once() {
    // A journey paused with a stored deadline keeps it on re-execution;
    // the node never recomputes from "now".
    let campaign = delay_campaign(3600);
    let mut journey = journey_at_entry(&campaign);
    journey.pause(Some(500_000), vec![], 10_000);

    let outcome = run(&campaign, &journey, &Properties::new(), &ResumeCause::Timer, 400_000);
    // Early fire: re-pause at the stored deadline, not now + duration.
    assert_eq!(
        outcome.verdict,
        Verdict::Async { resume_at_ms: Some(500_000), waits: vec![] }
    );

    let outcome = run(&campaign, &journey, &Properties::new(), &ResumeCause::Timer, 500_001);
    assert_eq!(next_id(&campaign, &outcome), "done");
}

#[test]
fn window_open_continues() {
    let campaign = window_campaign("09:00", "17:00", "UTC", None);
    let journey = journey_at_entry(&campaign);
    let outcome = run(&campaign, &journey, &Properties::new(), &start(), WED_NOON_UTC);
    assert_eq!(next_id(&campaign, &outcome), "done");
}

#[test]
fn window_closed_pauses_until_next_open() {
    // 22:00–06:00 UTC overnight window, currently noon: next open is
    // 22:00 the same day.
    let campaign = window_campaign("22:00", "06:00", "UTC", None);
    let journey = journey_at_entry(&campaign);
    let outcome = run(&campaign, &journey, &Properties::new(), &start(), WED_NOON_UTC);

    let expected_open = WED_NOON_UTC + 10 * 3_600_000;
    assert_eq!(
        outcome.verdict,
        Verdict::Async { resume_at_ms: Some(expected_open), waits: vec![] }
    );
}

#[test]
fn overnight_window_open_before_dawn() {
    // 03:00 UTC is inside a 22:00–06:00 wrap.
    let three_am = WED_NOON_UTC - 9 * 3_600_000;
    let campaign = window_campaign("22:00", "06:00", "UTC", None);
    let journey = journey_at_entry(&campaign);
    let outcome = run(&campaign, &journey, &Properties::new(), &start(), three_am);
    assert_eq!(next_id(&campaign, &outcome), "done");
}

#[test]
fn equal_start_end_is_always_open() {
    let campaign = window_campaign("07:30", "07:30", "UTC", None);
    let journey = journey_at_entry(&campaign);
    let outcome = run(&campaign, &journey, &Properties::new(), &start(), WED_NOON_UTC);
    assert_eq!(next_id(&campaign, &outcome), "done");
}

#[test]
fn day_filter_skips_to_allowed_day() {
    // Wednesday noon; window allows Sunday (wire day 1) only, all-day
    // hours. Next open is Sunday 00:00, four days out.
    let campaign = window_campaign("00:00", "23:59", "UTC", Some(vec![1]));
    let journey = journey_at_entry(&campaign);
    let outcome = run(&campaign, &journey, &Properties::new(), &start(), WED_NOON_UTC);

    let sunday_midnight = WED_NOON_UTC - 12 * 3_600_000 + 4 * 24 * 3_600_000;
    assert_eq!(
        outcome.verdict,
        Verdict::Async { resume_at_ms: Some(sunday_midnight), waits: vec![] }
    );
}

#[test]
fn day_filter_applies_to_current_local_date() {
    // Wednesday is wire day 4 (Sunday = 1); an open-hours window gated
    // to Wednesday continues.
    let campaign = window_campaign("09:00", "17:00", "UTC", Some(vec![4]));
    let journey = journey_at_entry(&campaign);
    let outcome = run(&campaign, &journey, &Properties::new(), &start(), WED_NOON_UTC);
    assert_eq!(next_id(&campaign, &outcome), "done");
}

#[test]
fn window_respects_timezone() {
    // Noon UTC is 07:00 in New York (UTC-5 in November): a 09:00–17:00
    // New York window is still closed and opens at 09:00 local,
    // 14:00 UTC.
    let campaign = window_campaign("09:00", "17:00", "America/New_York", None);
    let journey = journey_at_entry(&campaign);
    let outcome = run(&campaign, &journey, &Properties::new(), &start(), WED_NOON_UTC);
    assert_eq!(
        outcome.verdict,
        Verdict::Async { resume_at_ms: Some(WED_NOON_UTC + 2 * 3_600_000), waits: vec![] }
    );
}
