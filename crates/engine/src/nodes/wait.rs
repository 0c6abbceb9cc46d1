// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wait-until node: race between declared paths.
//!
//! On entry, expression paths are checked against the current context —
//! the earliest-declared true path wins immediately. Otherwise every
//! event/segment/expression condition registers with the router, the
//! earliest timeout (min `max_time`) arms the scheduler, and the
//! journey pauses. Resume takes the matched path (event) or the
//! earliest-deadline timeout path (timer).

use super::{ExecCtx, NodeOutcome, ResumeCause};
use nuxie_campaign::{WaitConditionDef, WaitPath};
use nuxie_core::{evaluate_predicate, WaitCondition, WaitKind};

pub(super) fn execute(ctx: &ExecCtx<'_>, paths: &[WaitPath]) -> NodeOutcome {
    match ctx.cause {
        ResumeCause::Event { path, .. } => resume_from_event(ctx, paths, *path),
        ResumeCause::Timer => resume_from_timer(ctx, paths),
        ResumeCause::Start { .. } => first_execution(ctx, paths),
    }
}

fn first_execution(ctx: &ExecCtx<'_>, paths: &[WaitPath]) -> NodeOutcome {
    // Expression paths may already hold; earliest declared wins.
    for path in paths {
        if let WaitConditionDef::Expression { condition } = &path.condition {
            if evaluate_predicate(condition, &ctx.eval_ctx()) {
                return NodeOutcome::advance(path.next);
            }
        }
    }

    let mut waits = Vec::new();
    for (index, path) in paths.iter().enumerate() {
        match &path.condition {
            WaitConditionDef::Event { event, predicate } => waits.push(WaitCondition {
                path: index,
                kind: WaitKind::Event { name: event.clone(), predicate: predicate.clone() },
            }),
            WaitConditionDef::Segment { segment_id } => waits.push(WaitCondition {
                path: index,
                kind: WaitKind::SegmentChange { segment_id: segment_id.clone() },
            }),
            // A false expression re-checks on every event of the user:
            // empty name is the router's wildcard key.
            WaitConditionDef::Expression { condition } => waits.push(WaitCondition {
                path: index,
                kind: WaitKind::Event { name: "".into(), predicate: Some(condition.clone()) },
            }),
            WaitConditionDef::Timeout => {}
        }
    }

    let deadline = earliest_timeout(ctx.now_ms, paths);
    // With neither waits nor a timeout the workflow compiler would have
    // rejected the node; an indefinite wait (deadline None) is legal.
    NodeOutcome::pause(deadline, waits)
}

fn resume_from_event(ctx: &ExecCtx<'_>, paths: &[WaitPath], path_index: usize) -> NodeOutcome {
    match paths.get(path_index) {
        Some(path) => NodeOutcome::advance(path.next),
        None => {
            // Workflow changed shape under a persisted journey; fall
            // back to re-waiting.
            tracing::warn!(
                journey = %ctx.journey.id,
                node = %ctx.node.id,
                path = path_index,
                "matched wait path no longer exists, re-entering wait"
            );
            first_execution(ctx, paths)
        }
    }
}

fn resume_from_timer(ctx: &ExecCtx<'_>, paths: &[WaitPath]) -> NodeOutcome {
    // Scheduler fired early (clock skew): keep waiting for the stored
    // deadline.
    if let Some(deadline) = ctx.journey.resume_at_ms {
        if ctx.now_ms < deadline {
            return NodeOutcome::pause(Some(deadline), ctx.journey.wait_conditions.clone());
        }
    }

    // The deadline that fired is the minimum max_time; ties take the
    // earliest-declared path.
    let timed_out = paths
        .iter()
        .filter(|p| p.max_time_seconds.is_some())
        .min_by_key(|p| p.max_time_seconds);
    match timed_out {
        Some(path) => NodeOutcome::advance(path.next),
        None => {
            tracing::warn!(
                journey = %ctx.journey.id,
                node = %ctx.node.id,
                "timer fired for a wait with no timeout paths, re-entering wait"
            );
            first_execution(ctx, paths)
        }
    }
}

fn earliest_timeout(now_ms: u64, paths: &[WaitPath]) -> Option<u64> {
    paths
        .iter()
        .filter_map(|p| p.max_time_seconds)
        .min()
        .map(|seconds| now_ms + seconds * 1000)
}

#[cfg(test)]
#[path = "wait_tests.rs"]
mod tests;
