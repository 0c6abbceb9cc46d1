// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Purchase, restore, and remote-action nodes.
//!
//! All three record an intent effect, release the journey via an async
//! verdict, and wait on the internal completion events the adapter
//! tasks post. The wait predicates pin `journey_id` so one user's
//! concurrent journeys never consume each other's outcomes.

use super::{Effect, ExecCtx, NodeOutcome, ResumeCause};
use nuxie_core::event::internal;
use nuxie_core::{
    CmpOp, IrExpr, JourneyId, PredicateIr, Properties, TrackedEvent, WaitCondition, WaitKind,
};
use serde_json::Value;

const SUCCESS_PATH: usize = 0;
const FAILURE_PATH: usize = 1;

/// `journey_id == <id>` over the internal event's properties.
fn own_journey(journey_id: JourneyId) -> PredicateIr {
    PredicateIr::new(IrExpr::Compare {
        cmp: CmpOp::Eq,
        left: Box::new(IrExpr::Var { path: "journey_id".into() }),
        right: Box::new(IrExpr::Str { value: journey_id.to_string() }),
    })
}

fn outcome_waits(journey_id: JourneyId, success: &str, failure: &str) -> Vec<WaitCondition> {
    vec![
        WaitCondition {
            path: SUCCESS_PATH,
            kind: WaitKind::Event {
                name: success.into(),
                predicate: Some(own_journey(journey_id)),
            },
        },
        WaitCondition {
            path: FAILURE_PATH,
            kind: WaitKind::Event {
                name: failure.into(),
                predicate: Some(own_journey(journey_id)),
            },
        },
    ]
}

fn event_reason(cause: &ResumeCause) -> String {
    cause
        .event()
        .and_then(|e| e.properties.get("reason"))
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string()
}

pub(super) fn execute_purchase(ctx: &ExecCtx<'_>, product_id: &str) -> NodeOutcome {
    match ctx.cause {
        ResumeCause::Event { path: SUCCESS_PATH, .. } => NodeOutcome::advance(ctx.node.next[0])
            .with_effect(Effect::Track(TrackedEvent::PurchaseCompleted {
                journey_id: ctx.journey.id,
                campaign_id: ctx.campaign.id,
                product_id: product_id.to_string(),
            })),
        ResumeCause::Event { .. } => NodeOutcome::advance(ctx.node.next[1]).with_effect(
            Effect::Track(TrackedEvent::PurchaseFailed {
                journey_id: ctx.journey.id,
                campaign_id: ctx.campaign.id,
                product_id: product_id.to_string(),
                reason: event_reason(ctx.cause),
            }),
        ),
        ResumeCause::Timer => {
            // No deadline is armed for purchases; a stray fire re-waits.
            NodeOutcome::pause(
                None,
                outcome_waits(
                    ctx.journey.id,
                    internal::PURCHASE_COMPLETED,
                    internal::PURCHASE_FAILED,
                ),
            )
        }
        ResumeCause::Start { .. } => NodeOutcome::pause(
            None,
            outcome_waits(
                ctx.journey.id,
                internal::PURCHASE_COMPLETED,
                internal::PURCHASE_FAILED,
            ),
        )
        .with_effect(Effect::StartPurchase { product_id: product_id.to_string() }),
    }
}

pub(super) fn execute_restore(ctx: &ExecCtx<'_>) -> NodeOutcome {
    match ctx.cause {
        ResumeCause::Event { path: SUCCESS_PATH, .. } => NodeOutcome::advance(ctx.node.next[0])
            .with_effect(Effect::Track(TrackedEvent::RestoreCompleted {
                journey_id: ctx.journey.id,
                campaign_id: ctx.campaign.id,
            })),
        ResumeCause::Event { .. } => NodeOutcome::advance(ctx.node.next[1]).with_effect(
            Effect::Track(TrackedEvent::RestoreFailed {
                journey_id: ctx.journey.id,
                campaign_id: ctx.campaign.id,
                reason: event_reason(ctx.cause),
            }),
        ),
        ResumeCause::Timer => NodeOutcome::pause(
            None,
            outcome_waits(
                ctx.journey.id,
                internal::RESTORE_COMPLETED,
                internal::RESTORE_FAILED,
            ),
        ),
        ResumeCause::Start { .. } => NodeOutcome::pause(
            None,
            outcome_waits(
                ctx.journey.id,
                internal::RESTORE_COMPLETED,
                internal::RESTORE_FAILED,
            ),
        )
        .with_effect(Effect::StartRestore),
    }
}

pub(crate) const REMOTE_ACTION_COMPLETED: &str = "$remote_action_completed";
pub(crate) const REMOTE_ACTION_FAILED: &str = "$remote_action_failed";

pub(super) fn execute_remote_action(ctx: &ExecCtx<'_>, action: &str) -> NodeOutcome {
    match ctx.cause {
        ResumeCause::Event { path: SUCCESS_PATH, event } => {
            let mut outcome = NodeOutcome::advance(ctx.node.next[0]);
            if let Some(Value::Object(updates)) = event.properties.get("context_updates") {
                for (key, value) in updates {
                    outcome = outcome.with_context(key.clone(), value.clone());
                }
            }
            outcome
        }
        ResumeCause::Event { event, .. } => {
            // Remote actions have a single edge; a failed action
            // continues without context updates.
            tracing::warn!(
                journey = %ctx.journey.id,
                node = %ctx.node.id,
                reason = ?event.properties.get("reason"),
                "remote action failed, continuing without updates"
            );
            NodeOutcome::advance(ctx.node.next[0])
        }
        ResumeCause::Timer => NodeOutcome::pause(
            None,
            outcome_waits(ctx.journey.id, REMOTE_ACTION_COMPLETED, REMOTE_ACTION_FAILED),
        ),
        ResumeCause::Start { .. } => NodeOutcome::pause(
            None,
            outcome_waits(ctx.journey.id, REMOTE_ACTION_COMPLETED, REMOTE_ACTION_FAILED),
        )
        .with_effect(Effect::StartRemoteAction { action: action.to_string() }),
    }
}

/// Properties for an internal outcome event targeted at one journey.
pub(crate) fn outcome_properties(journey_id: JourneyId, extra: &[(&str, Value)]) -> Properties {
    let mut properties = Properties::new();
    properties.insert("journey_id".into(), Value::String(journey_id.to_string()));
    for (key, value) in extra {
        properties.insert((*key).to_string(), value.clone());
    }
    properties
}

#[cfg(test)]
#[path = "commerce_tests.rs"]
mod tests;
