// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time-delay and time-window nodes.
//!
//! Both recompute their verdict from the current wall clock on every
//! execution, so an early or late scheduler fire just re-pauses
//! (clock-skew tolerance). The delay deadline is computed once and
//! stored on the journey; restarts never reset it.

use super::{ExecCtx, NodeOutcome};
use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveTime, TimeZone, Timelike, Utc};
use nuxie_campaign::TimeWindowSpec;

pub(super) fn execute_delay(ctx: &ExecCtx<'_>, duration_seconds: i64) -> NodeOutcome {
    if duration_seconds <= 0 {
        return NodeOutcome::advance(ctx.node.next[0]);
    }

    // First execution computes the deadline; re-executions (timer fire,
    // restart) reuse the one stored on the journey.
    let deadline = ctx
        .journey
        .resume_at_ms
        .unwrap_or(ctx.now_ms + duration_seconds as u64 * 1000);

    if ctx.now_ms >= deadline {
        NodeOutcome::advance(ctx.node.next[0])
    } else {
        NodeOutcome::pause(Some(deadline), Vec::new())
    }
}

pub(super) fn execute_window(ctx: &ExecCtx<'_>, spec: &TimeWindowSpec) -> NodeOutcome {
    let now = match Utc.timestamp_millis_opt(ctx.now_ms as i64).single() {
        Some(now) => now,
        None => return NodeOutcome::advance(ctx.node.next[0]),
    };
    let local = now.with_timezone(&spec.timezone);

    if is_open(spec, &local) {
        return NodeOutcome::advance(ctx.node.next[0]);
    }

    match next_open_instant(spec, &local) {
        Some(open_at) => NodeOutcome::pause(Some(open_at.timestamp_millis() as u64), Vec::new()),
        None => {
            // Unresolvable opening (pathological DST layout); re-check
            // in an hour rather than wedging the journey.
            tracing::warn!(
                journey = %ctx.journey.id,
                node = %ctx.node.id,
                "no window opening found within 7 days, re-checking in 1h"
            );
            NodeOutcome::pause(Some(ctx.now_ms + 3_600_000), Vec::new())
        }
    }
}

/// Day-of-week in the campaign wire convention: 1–7 with Sunday = 1.
fn wire_weekday<Tz: chrono::TimeZone>(at: &DateTime<Tz>) -> u8 {
    at.weekday().num_days_from_sunday() as u8 + 1
}

fn day_allowed(spec: &TimeWindowSpec, day: u8) -> bool {
    spec.days_of_week.as_ref().is_none_or(|days| days.contains(&day))
}

fn is_open(spec: &TimeWindowSpec, local: &DateTime<chrono_tz::Tz>) -> bool {
    if !day_allowed(spec, wire_weekday(local)) {
        return false;
    }
    let minute = local.hour() * 60 + local.minute();
    match spec.start_minute.cmp(&spec.end_minute) {
        // start == end: always open.
        std::cmp::Ordering::Equal => true,
        std::cmp::Ordering::Less => minute >= spec.start_minute && minute < spec.end_minute,
        // Overnight wrap.
        std::cmp::Ordering::Greater => minute >= spec.start_minute || minute < spec.end_minute,
    }
}

/// Earliest future instant satisfying time-of-day and weekday filters.
/// Scans forward up to 7 days; each allowed day opens at `start`.
fn next_open_instant(
    spec: &TimeWindowSpec,
    local_now: &DateTime<chrono_tz::Tz>,
) -> Option<DateTime<Utc>> {
    let start = NaiveTime::from_hms_opt(spec.start_minute / 60, spec.start_minute % 60, 0)?;
    for offset in 0..=7i64 {
        let date = local_now.date_naive() + ChronoDuration::days(offset);
        let candidate_naive = date.and_time(start);
        let Some(candidate) = resolve_local(spec.timezone, candidate_naive) else {
            continue;
        };
        if candidate <= *local_now {
            continue;
        }
        if !day_allowed(spec, wire_weekday(&candidate)) {
            continue;
        }
        return Some(candidate.with_timezone(&Utc));
    }
    None
}

/// Map a naive local datetime into the zone, tolerating DST edges:
/// ambiguous times take the earlier instant, gap times shift forward an
/// hour.
fn resolve_local(
    tz: chrono_tz::Tz,
    naive: chrono::NaiveDateTime,
) -> Option<DateTime<chrono_tz::Tz>> {
    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(t) => Some(t),
        chrono::LocalResult::Ambiguous(earlier, _) => Some(earlier),
        chrono::LocalResult::None => tz
            .from_local_datetime(&(naive + ChronoDuration::hours(1)))
            .earliest(),
    }
}

#[cfg(test)]
#[path = "timing_tests.rs"]
mod tests;
