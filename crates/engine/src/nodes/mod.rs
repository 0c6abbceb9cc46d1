// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The node library: one implementation per workflow node kind.
//!
//! Nodes are pure: `execute` reads an [`ExecCtx`] and returns a
//! [`NodeOutcome`] — a verdict plus the side effects the executor
//! should perform and the context keys to merge. Nothing here touches
//! adapters, storage, or clocks directly.

mod actions;
mod branch;
mod commerce;
mod timing;
mod wait;

pub(crate) use commerce::{outcome_properties, REMOTE_ACTION_COMPLETED, REMOTE_ACTION_FAILED};

#[cfg(test)]
pub(crate) mod test_support;

use nuxie_campaign::{Campaign, Node, NodeKind};
use nuxie_core::{
    EvalContext, ExitReason, Journey, LoggedEvent, Properties, Snapshot, TrackedEvent,
    UserEvent, WaitCondition,
};
use nuxie_campaign::NodeIx;
use serde_json::Value;
use smol_str::SmolStr;

/// Why this advance is executing the current node.
#[derive(Debug, Clone)]
pub enum ResumeCause {
    /// First execution (journey spawn, or a successor within the same
    /// advance). Carries the event that put the journey here, so event
    /// properties stay visible to the whole advance.
    Start { origin: Option<UserEvent> },
    /// The scheduler fired `resume_at`.
    Timer,
    /// The router matched a registered wait condition.
    Event { event: UserEvent, path: usize },
}

impl ResumeCause {
    /// Event properties to layer into the node's snapshot, if any.
    pub fn event_properties(&self) -> Option<&Properties> {
        match self {
            ResumeCause::Start { origin: Some(event) } => Some(&event.properties),
            ResumeCause::Event { event, .. } => Some(&event.properties),
            _ => None,
        }
    }

    /// The event carried by this cause, if any.
    pub fn event(&self) -> Option<&UserEvent> {
        match self {
            ResumeCause::Start { origin } => origin.as_ref(),
            ResumeCause::Event { event, .. } => Some(event),
            ResumeCause::Timer => None,
        }
    }
}

/// What a node decided.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Advance to the named successor (index-selected inside the node
    /// for branch/experiment kinds).
    Continue(NodeIx),
    /// Pause; the scheduler and/or router will wake the journey.
    Async {
        resume_at_ms: Option<u64>,
        waits: Vec<WaitCondition>,
    },
    /// Advance, flagging the node as skipped.
    Skip(NodeIx),
    /// Terminate the journey.
    Complete(ExitReason),
}

impl Verdict {
    /// Verdict tag for `$journey_node_executed`.
    pub fn name(&self) -> &'static str {
        match self {
            Verdict::Continue(_) => "continue",
            Verdict::Async { .. } => "async",
            Verdict::Skip(_) => "skip",
            Verdict::Complete(_) => "complete",
        }
    }
}

/// Side effects for the executor to perform after the node returns.
/// Emission/enqueueing is the executor's job; nodes only record intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Track(TrackedEvent),
    ShowFlow {
        flow_id: SmolStr,
        parameters: Properties,
    },
    CallDelegate {
        message: String,
        payload: Option<Value>,
    },
    UpdateCustomer {
        attributes: Properties,
    },
    SendEvent {
        event_name: SmolStr,
        properties: Properties,
    },
    StartPurchase {
        product_id: String,
    },
    StartRestore,
    StartRemoteAction {
        action: String,
    },
}

/// Verdict + effects + context mutations from one node execution.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutcome {
    pub verdict: Verdict,
    pub effects: Vec<Effect>,
    /// Merged atomically into the journey context after the node
    /// returns (the executor's working buffer).
    pub context_updates: Vec<(String, Value)>,
}

impl NodeOutcome {
    pub fn advance(next: NodeIx) -> Self {
        Self { verdict: Verdict::Continue(next), effects: Vec::new(), context_updates: Vec::new() }
    }

    pub fn pause(resume_at_ms: Option<u64>, waits: Vec<WaitCondition>) -> Self {
        Self {
            verdict: Verdict::Async { resume_at_ms, waits },
            effects: Vec::new(),
            context_updates: Vec::new(),
        }
    }

    pub fn complete(reason: ExitReason) -> Self {
        Self {
            verdict: Verdict::Complete(reason),
            effects: Vec::new(),
            context_updates: Vec::new(),
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context_updates.push((key.into(), value));
        self
    }
}

/// Everything a node execution can see. Borrowed for the duration of
/// one step; the executor applies the outcome after the borrow ends.
pub struct ExecCtx<'a> {
    pub journey: &'a Journey,
    pub campaign: &'a Campaign,
    pub node: &'a Node,
    /// journey context ∪ user properties ∪ event properties.
    pub snapshot: Snapshot<'a>,
    pub events: &'a [LoggedEvent],
    pub now_ms: u64,
    pub cause: &'a ResumeCause,
}

impl<'a> ExecCtx<'a> {
    pub fn eval_ctx(&self) -> EvalContext<'_> {
        EvalContext::new(self.snapshot.clone(), self.events, self.now_ms)
    }
}

/// Execute the current node. Infallible by design: evaluation errors
/// fall back to documented defaults inside each node, and structural
/// problems are rejected at campaign registration.
pub fn execute(ctx: &ExecCtx<'_>) -> NodeOutcome {
    match &ctx.node.kind {
        NodeKind::Branch { condition } => branch::execute(ctx, condition),
        NodeKind::TimeDelay { duration_seconds } => timing::execute_delay(ctx, *duration_seconds),
        NodeKind::TimeWindow(spec) => timing::execute_window(ctx, spec),
        NodeKind::WaitUntil { paths } => wait::execute(ctx, paths),
        NodeKind::ShowFlow { flow_id, parameters } => {
            actions::execute_show_flow(ctx, flow_id, parameters)
        }
        NodeKind::CallDelegate { message, payload } => {
            actions::execute_call_delegate(ctx, message, payload.as_ref())
        }
        NodeKind::UpdateCustomer { attributes } => {
            actions::execute_update_customer(ctx, attributes)
        }
        NodeKind::SendEvent { event_name, properties } => {
            actions::execute_send_event(ctx, event_name, properties)
        }
        NodeKind::Exit { reason } => NodeOutcome::complete(*reason),
        NodeKind::Experiment { variants } => actions::execute_experiment(ctx, variants),
        NodeKind::Purchase { product_id } => commerce::execute_purchase(ctx, product_id),
        NodeKind::Restore => commerce::execute_restore(ctx),
        NodeKind::RemoteAction { action } => commerce::execute_remote_action(ctx, action),
    }
}
