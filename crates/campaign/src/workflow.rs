// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compiled workflow graph: contiguous node arena with dense indices.
//!
//! Node ids on the wire are strings; after compilation every successor
//! reference is a [`NodeIx`] into the arena. Compilation is also where
//! malformed campaigns are rejected (unknown successor, bad timezone,
//! cycle with no pause-capable node on it) — execution never sees them.

use crate::model::{
    CampaignDef, ExitPolicy, FrequencyPolicy, NodeDef, NodeKindDef, TriggerDef, VariantDef,
    WaitConditionDef, WaitPathDef,
};
use nuxie_core::{CampaignId, ExitReason, PredicateIr, Properties};
use serde_json::Value;
use smol_str::SmolStr;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Rejection reasons for a campaign definition.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    #[error("workflow has no nodes")]
    EmptyWorkflow,
    #[error("entry node not found: {0}")]
    MissingEntry(String),
    #[error("node {node}: inline id {inline} does not match key")]
    IdMismatch { node: String, inline: String },
    #[error("node {node}: unknown successor {successor}")]
    UnknownSuccessor { node: String, successor: String },
    #[error("node {node}: expected {expected} successors, found {found}")]
    SuccessorArity {
        node: String,
        expected: usize,
        found: usize,
    },
    #[error("node {node}: invalid time of day {value:?} (expected HH:mm)")]
    InvalidTimeOfDay { node: String, value: String },
    #[error("node {node}: unknown timezone {value:?}")]
    UnknownTimezone { node: String, value: String },
    #[error("node {node}: day of week {value} out of range 1-7")]
    InvalidDayOfWeek { node: String, value: u8 },
    #[error("node {node}: timeout path {path} has no max_time")]
    TimeoutWithoutMaxTime { node: String, path: String },
    #[error("node {node}: wait_until declares no paths")]
    EmptyWaitUntil { node: String },
    #[error("node {node}: experiment has no positive-weight variants")]
    NoVariants { node: String },
    #[error("cycle through {node} never passes a node that can pause")]
    CycleWithoutWait { node: String },
}

/// Dense index of a node within its workflow's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIx(pub u32);

impl NodeIx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A compiled node: shared header + kind-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub next: Vec<NodeIx>,
    pub kind: NodeKind,
}

impl Node {
    /// Kind tag as emitted in `$journey_node_executed`.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Branch { .. } => "branch",
            NodeKind::TimeDelay { .. } => "time_delay",
            NodeKind::TimeWindow(_) => "time_window",
            NodeKind::WaitUntil { .. } => "wait_until",
            NodeKind::ShowFlow { .. } => "show_flow",
            NodeKind::CallDelegate { .. } => "call_delegate",
            NodeKind::Purchase { .. } => "purchase",
            NodeKind::Restore => "restore",
            NodeKind::UpdateCustomer { .. } => "update_customer",
            NodeKind::SendEvent { .. } => "send_event",
            NodeKind::Exit { .. } => "exit",
            NodeKind::RemoteAction { .. } => "remote_action",
            NodeKind::Experiment { .. } => "experiment",
        }
    }

    /// Whether executing this node can return an async verdict. Every
    /// cycle in the graph must pass through at least one such node.
    pub fn can_pause(&self) -> bool {
        match &self.kind {
            NodeKind::TimeDelay { duration_seconds } => *duration_seconds > 0,
            NodeKind::TimeWindow(_)
            | NodeKind::WaitUntil { .. }
            | NodeKind::Purchase { .. }
            | NodeKind::Restore
            | NodeKind::RemoteAction { .. } => true,
            _ => false,
        }
    }

    /// All outgoing edges, including those embedded in payloads.
    pub fn successors(&self) -> Vec<NodeIx> {
        let mut out = self.next.clone();
        match &self.kind {
            NodeKind::WaitUntil { paths } => out.extend(paths.iter().map(|p| p.next)),
            NodeKind::Experiment { variants } => out.extend(variants.iter().map(|v| v.next)),
            _ => {}
        }
        out
    }
}

/// Compiled node payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// `next[0]` on true, `next[1]` on false.
    Branch { condition: PredicateIr },
    TimeDelay { duration_seconds: i64 },
    TimeWindow(TimeWindowSpec),
    WaitUntil { paths: Vec<WaitPath> },
    ShowFlow { flow_id: SmolStr, parameters: Properties },
    CallDelegate { message: String, payload: Option<Value> },
    /// `next[0]` on success, `next[1]` on failure.
    Purchase { product_id: String },
    /// `next[0]` on success, `next[1]` on failure.
    Restore,
    UpdateCustomer { attributes: Properties },
    SendEvent { event_name: SmolStr, properties: Properties },
    Exit { reason: ExitReason },
    RemoteAction { action: String },
    Experiment { variants: Vec<Variant> },
}

/// Compiled time-window: minutes-of-day in a parsed IANA zone.
///
/// `start == end` is treated as always-open (the documented default for
/// the degenerate window). `start > end` wraps overnight.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeWindowSpec {
    pub start_minute: u32,
    pub end_minute: u32,
    pub timezone: chrono_tz::Tz,
    /// 1–7 with Sunday = 1; `None` means every day.
    pub days_of_week: Option<BTreeSet<u8>>,
}

/// Compiled wait path.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitPath {
    pub id: String,
    pub condition: WaitConditionDef,
    pub max_time_seconds: Option<u64>,
    pub next: NodeIx,
}

/// Compiled experiment variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub id: String,
    pub weight: u32,
    pub next: NodeIx,
}

/// The compiled workflow graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    nodes: Vec<Node>,
    entry: NodeIx,
    by_id: HashMap<String, NodeIx>,
}

impl Workflow {
    pub fn entry(&self) -> NodeIx {
        self.entry
    }

    pub fn node(&self, ix: NodeIx) -> &Node {
        &self.nodes[ix.index()]
    }

    pub fn resolve(&self, id: &str) -> Option<NodeIx> {
        self.by_id.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A validated campaign, ready for the registrar.
#[derive(Debug, Clone, PartialEq)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub version: u32,
    pub published_at_ms: u64,
    pub trigger: TriggerDef,
    pub entry_node_id: String,
    pub workflow: Workflow,
    pub frequency_policy: FrequencyPolicy,
    pub frequency_interval_seconds: Option<u64>,
    pub message_limit: Option<u32>,
    pub goal: Option<PredicateIr>,
    pub exit_policy: ExitPolicy,
    pub conversion_anchor: Option<SmolStr>,
}

impl Campaign {
    /// Compile and validate a wire definition.
    pub fn compile(def: CampaignDef) -> Result<Campaign, WorkflowError> {
        let workflow = compile_workflow(&def)?;
        Ok(Campaign {
            id: def.campaign_id,
            name: def.name,
            version: def.version,
            published_at_ms: def.published_at_ms,
            trigger: def.trigger,
            entry_node_id: def.entry_node_id,
            workflow,
            frequency_policy: def.frequency_policy,
            frequency_interval_seconds: def.frequency_interval_seconds,
            message_limit: def.message_limit,
            goal: def.goal,
            exit_policy: def.exit_policy.unwrap_or(ExitPolicy::None),
            conversion_anchor: def.conversion_anchor,
        })
    }
}

fn compile_workflow(def: &CampaignDef) -> Result<Workflow, WorkflowError> {
    if def.workflow.is_empty() {
        return Err(WorkflowError::EmptyWorkflow);
    }

    let mut by_id = HashMap::with_capacity(def.workflow.len());
    for (position, (id, node)) in def.workflow.iter().enumerate() {
        if let Some(inline) = &node.id {
            if inline != id {
                return Err(WorkflowError::IdMismatch {
                    node: id.clone(),
                    inline: inline.clone(),
                });
            }
        }
        by_id.insert(id.clone(), NodeIx(position as u32));
    }

    let entry = by_id
        .get(&def.entry_node_id)
        .copied()
        .ok_or_else(|| WorkflowError::MissingEntry(def.entry_node_id.clone()))?;

    let mut nodes = Vec::with_capacity(def.workflow.len());
    for (id, node_def) in def.workflow.iter() {
        nodes.push(compile_node(id, node_def, &by_id)?);
    }

    let workflow = Workflow { nodes, entry, by_id };
    check_cycles(&workflow)?;
    Ok(workflow)
}

fn compile_node(
    id: &str,
    def: &NodeDef,
    by_id: &HashMap<String, NodeIx>,
) -> Result<Node, WorkflowError> {
    let resolve = |successor: &str| -> Result<NodeIx, WorkflowError> {
        by_id
            .get(successor)
            .copied()
            .ok_or_else(|| WorkflowError::UnknownSuccessor {
                node: id.to_string(),
                successor: successor.to_string(),
            })
    };

    let next = def
        .next
        .iter()
        .map(|successor| resolve(successor))
        .collect::<Result<Vec<_>, _>>()?;

    let expect_arity = |expected: usize| -> Result<(), WorkflowError> {
        if next.len() == expected {
            Ok(())
        } else {
            Err(WorkflowError::SuccessorArity {
                node: id.to_string(),
                expected,
                found: next.len(),
            })
        }
    };

    let kind = match &def.kind {
        NodeKindDef::Branch { condition } => {
            expect_arity(2)?;
            NodeKind::Branch { condition: condition.clone() }
        }
        NodeKindDef::TimeDelay { duration_seconds } => {
            expect_arity(1)?;
            NodeKind::TimeDelay { duration_seconds: *duration_seconds }
        }
        NodeKindDef::TimeWindow { start_time, end_time, timezone, days_of_week } => {
            expect_arity(1)?;
            NodeKind::TimeWindow(compile_time_window(
                id,
                start_time,
                end_time,
                timezone,
                days_of_week.as_ref(),
            )?)
        }
        NodeKindDef::WaitUntil { paths } => {
            if paths.is_empty() {
                return Err(WorkflowError::EmptyWaitUntil { node: id.to_string() });
            }
            let paths = paths
                .iter()
                .map(|path| compile_wait_path(id, path, &resolve))
                .collect::<Result<Vec<_>, _>>()?;
            NodeKind::WaitUntil { paths }
        }
        NodeKindDef::ShowFlow { flow_id, parameters } => {
            expect_arity(1)?;
            NodeKind::ShowFlow { flow_id: flow_id.clone(), parameters: parameters.clone() }
        }
        NodeKindDef::CallDelegate { message, payload } => {
            expect_arity(1)?;
            NodeKind::CallDelegate { message: message.clone(), payload: payload.clone() }
        }
        NodeKindDef::Purchase { product_id } => {
            expect_arity(2)?;
            NodeKind::Purchase { product_id: product_id.clone() }
        }
        NodeKindDef::Restore => {
            expect_arity(2)?;
            NodeKind::Restore
        }
        NodeKindDef::UpdateCustomer { attributes } => {
            expect_arity(1)?;
            NodeKind::UpdateCustomer { attributes: attributes.clone() }
        }
        NodeKindDef::SendEvent { event_name, properties } => {
            expect_arity(1)?;
            NodeKind::SendEvent { event_name: event_name.clone(), properties: properties.clone() }
        }
        NodeKindDef::Exit { reason } => {
            // Exit takes no successors.
            expect_arity(0)?;
            NodeKind::Exit { reason: parse_exit_reason(reason.as_deref()) }
        }
        NodeKindDef::RemoteAction { action } => {
            expect_arity(1)?;
            NodeKind::RemoteAction { action: action.clone() }
        }
        NodeKindDef::Experiment { variants } => {
            let variants = variants
                .iter()
                .map(|variant| compile_variant(variant, &resolve))
                .collect::<Result<Vec<_>, _>>()?;
            if variants.iter().all(|v| v.weight == 0) {
                return Err(WorkflowError::NoVariants { node: id.to_string() });
            }
            NodeKind::Experiment { variants }
        }
    };

    Ok(Node { id: id.to_string(), next, kind })
}

fn compile_time_window(
    node: &str,
    start: &str,
    end: &str,
    timezone: &str,
    days: Option<&BTreeSet<u8>>,
) -> Result<TimeWindowSpec, WorkflowError> {
    let timezone: chrono_tz::Tz = timezone.parse().map_err(|_| WorkflowError::UnknownTimezone {
        node: node.to_string(),
        value: timezone.to_string(),
    })?;
    if let Some(days) = days {
        for &day in days {
            if !(1..=7).contains(&day) {
                return Err(WorkflowError::InvalidDayOfWeek {
                    node: node.to_string(),
                    value: day,
                });
            }
        }
    }
    Ok(TimeWindowSpec {
        start_minute: parse_minute_of_day(node, start)?,
        end_minute: parse_minute_of_day(node, end)?,
        timezone,
        days_of_week: days.cloned(),
    })
}

fn parse_minute_of_day(node: &str, value: &str) -> Result<u32, WorkflowError> {
    let invalid = || WorkflowError::InvalidTimeOfDay {
        node: node.to_string(),
        value: value.to_string(),
    };
    let (hours, minutes) = value.split_once(':').ok_or_else(invalid)?;
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

fn compile_wait_path(
    node: &str,
    path: &WaitPathDef,
    resolve: &impl Fn(&str) -> Result<NodeIx, WorkflowError>,
) -> Result<WaitPath, WorkflowError> {
    if matches!(path.condition, WaitConditionDef::Timeout) && path.max_time_seconds.is_none() {
        return Err(WorkflowError::TimeoutWithoutMaxTime {
            node: node.to_string(),
            path: path.id.clone(),
        });
    }
    Ok(WaitPath {
        id: path.id.clone(),
        condition: path.condition.clone(),
        max_time_seconds: path.max_time_seconds,
        next: resolve(&path.next)?,
    })
}

fn compile_variant(
    variant: &VariantDef,
    resolve: &impl Fn(&str) -> Result<NodeIx, WorkflowError>,
) -> Result<Variant, WorkflowError> {
    Ok(Variant {
        id: variant.id.clone(),
        weight: variant.weight,
        next: resolve(&variant.next)?,
    })
}

fn parse_exit_reason(reason: Option<&str>) -> ExitReason {
    match reason {
        None | Some("completed") => ExitReason::Completed,
        Some("converted") => ExitReason::Converted,
        Some("exited_by_policy") => ExitReason::ExitedByPolicy,
        Some("errored") => ExitReason::Errored,
        Some("superseded") => ExitReason::Superseded,
        Some("user_dismissed") => ExitReason::UserDismissed,
        Some("other") => ExitReason::Other,
        Some(other) => {
            tracing::warn!(reason = other, "unknown exit reason, mapping to other");
            ExitReason::Other
        }
    }
}

/// Reject any cycle made only of nodes that cannot pause. Edges leaving
/// a pause-capable node are cut; a cycle in what remains would spin the
/// executor forever.
fn check_cycles(workflow: &Workflow) -> Result<(), WorkflowError> {
    const UNSEEN: u8 = 0;
    const IN_STACK: u8 = 1;
    const DONE: u8 = 2;

    let mut state = vec![UNSEEN; workflow.len()];
    for start in 0..workflow.len() {
        if state[start] != UNSEEN {
            continue;
        }
        // Iterative DFS: (node, next-successor-cursor).
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        state[start] = IN_STACK;
        while let Some((node, cursor)) = stack.last().copied() {
            let successors = if workflow.nodes[node].can_pause() {
                Vec::new()
            } else {
                workflow.nodes[node].successors()
            };
            if cursor >= successors.len() {
                state[node] = DONE;
                stack.pop();
                continue;
            }
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            let target = successors[cursor].index();
            match state[target] {
                IN_STACK => {
                    return Err(WorkflowError::CycleWithoutWait {
                        node: workflow.nodes[target].id.clone(),
                    });
                }
                UNSEEN => {
                    state[target] = IN_STACK;
                    stack.push((target, 0));
                }
                _ => {}
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
