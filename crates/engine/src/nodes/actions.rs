// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action nodes: show-flow, call-delegate, update-customer, send-event,
//! experiment. All complete synchronously; their side effects are
//! recorded as [`Effect`]s for the executor.

use super::{Effect, ExecCtx, NodeOutcome};
use nuxie_campaign::Variant;
use nuxie_core::{Properties, TrackedEvent};
use serde_json::Value;
use sha2::{Digest, Sha256};
use smol_str::SmolStr;

pub(super) fn execute_show_flow(
    ctx: &ExecCtx<'_>,
    flow_id: &SmolStr,
    parameters: &Properties,
) -> NodeOutcome {
    // Presentation does not gate advancement: flow outcomes come back
    // as events in their own right.
    NodeOutcome::advance(ctx.node.next[0])
        .with_effect(Effect::ShowFlow { flow_id: flow_id.clone(), parameters: parameters.clone() })
        .with_effect(Effect::Track(TrackedEvent::FlowShown {
            journey_id: ctx.journey.id,
            campaign_id: ctx.campaign.id,
            node_id: ctx.node.id.clone(),
            flow_id: flow_id.clone(),
        }))
}

pub(super) fn execute_call_delegate(
    ctx: &ExecCtx<'_>,
    message: &str,
    payload: Option<&Value>,
) -> NodeOutcome {
    NodeOutcome::advance(ctx.node.next[0])
        .with_effect(Effect::CallDelegate {
            message: message.to_string(),
            payload: payload.cloned(),
        })
        .with_effect(Effect::Track(TrackedEvent::DelegateCalled {
            journey_id: ctx.journey.id,
            campaign_id: ctx.campaign.id,
            node_id: ctx.node.id.clone(),
            message: message.to_string(),
        }))
}

pub(super) fn execute_update_customer(
    ctx: &ExecCtx<'_>,
    attributes: &Properties,
) -> NodeOutcome {
    NodeOutcome::advance(ctx.node.next[0])
        .with_effect(Effect::UpdateCustomer { attributes: attributes.clone() })
        .with_effect(Effect::Track(TrackedEvent::CustomerUpdated {
            journey_id: ctx.journey.id,
            campaign_id: ctx.campaign.id,
            node_id: ctx.node.id.clone(),
            attributes: attributes.keys().cloned().collect(),
        }))
}

pub(super) fn execute_send_event(
    ctx: &ExecCtx<'_>,
    event_name: &SmolStr,
    properties: &Properties,
) -> NodeOutcome {
    let mut annotated = properties.clone();
    annotated.insert("journey_id".into(), Value::String(ctx.journey.id.to_string()));
    annotated.insert("campaign_id".into(), Value::String(ctx.campaign.id.to_string()));

    NodeOutcome::advance(ctx.node.next[0])
        .with_effect(Effect::SendEvent { event_name: event_name.clone(), properties: annotated })
        .with_effect(Effect::Track(TrackedEvent::EventSent {
            journey_id: ctx.journey.id,
            campaign_id: ctx.campaign.id,
            node_id: ctx.node.id.clone(),
            event_name: event_name.clone(),
        }))
}

/// Deterministic weighted pick: the same `(journey, node)` always lands
/// on the same variant, so re-execution after a crash is sticky without
/// extra persistence.
pub(super) fn execute_experiment(ctx: &ExecCtx<'_>, variants: &[Variant]) -> NodeOutcome {
    let variant = pick_variant(ctx.journey.id.as_str(), &ctx.node.id, variants);
    NodeOutcome::advance(variant.next)
        .with_context(
            format!("experiment.{}", ctx.node.id),
            Value::String(variant.id.clone()),
        )
        .with_effect(Effect::Track(TrackedEvent::ExperimentExposure {
            journey_id: ctx.journey.id,
            campaign_id: ctx.campaign.id,
            node_id: ctx.node.id.clone(),
            variant_id: variant.id.clone(),
        }))
}

fn pick_variant<'a>(journey_id: &str, node_id: &str, variants: &'a [Variant]) -> &'a Variant {
    let total: u64 = variants.iter().map(|v| v.weight as u64).sum();
    let mut hasher = Sha256::new();
    hasher.update(journey_id.as_bytes());
    hasher.update(b":");
    hasher.update(node_id.as_bytes());
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    // total > 0 enforced at compile time (NoVariants).
    let mut roll = u64::from_be_bytes(prefix) % total.max(1);

    for variant in variants {
        let weight = variant.weight as u64;
        if roll < weight {
            return variant;
        }
        roll -= weight;
    }
    // Unreachable with a positive total; the last variant is a safe
    // fallback either way.
    &variants[variants.len() - 1]
}

#[cfg(test)]
#[path = "actions_tests.rs"]
mod tests;
