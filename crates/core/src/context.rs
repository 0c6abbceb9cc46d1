// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered property snapshots and the predicate evaluation context.
//!
//! A node executes against a snapshot assembled from the journey's own
//! context, the user's properties, and (when resuming from an event)
//! the event's properties. Later layers shadow earlier ones.

use crate::event::LoggedEvent;
use serde_json::Value;

/// JSON object map used for journey context, user properties, and
/// event properties.
pub type Properties = serde_json::Map<String, Value>;

/// Read-only view over a stack of property maps with dotted-path lookup.
#[derive(Debug, Clone, Default)]
pub struct Snapshot<'a> {
    layers: Vec<&'a Properties>,
}

impl<'a> Snapshot<'a> {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Push a layer. Layers pushed later shadow earlier ones.
    pub fn layer(mut self, props: &'a Properties) -> Self {
        self.layers.push(props);
        self
    }

    /// Resolve a dotted path (`"user.plan.tier"`) against the stack.
    ///
    /// The topmost layer containing the first segment wins; descent into
    /// nested objects happens entirely within that layer.
    pub fn lookup(&self, path: &str) -> Option<&'a Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let root = self
            .layers
            .iter()
            .rev()
            .find_map(|layer| layer.get(first))?;
        segments.try_fold(root, |value, segment| value.as_object()?.get(segment))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Flatten the stack into a single owned map (shadowing applied).
    /// Used for `$journey_node_executed` context snapshots.
    pub fn to_properties(&self) -> Properties {
        let mut merged = Properties::new();
        for layer in &self.layers {
            for (key, value) in layer.iter() {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }
}

/// Everything a predicate evaluation can see. Pure data — the evaluator
/// performs no I/O and never mutates the underlying maps.
#[derive(Debug, Clone)]
pub struct EvalContext<'a> {
    pub vars: Snapshot<'a>,
    /// Recently ingested events for the user, oldest first.
    pub events: &'a [LoggedEvent],
    pub now_ms: u64,
}

impl<'a> EvalContext<'a> {
    pub fn new(vars: Snapshot<'a>, events: &'a [LoggedEvent], now_ms: u64) -> Self {
        Self { vars, events, now_ms }
    }

    /// A context with no variables and no event history.
    pub fn empty(now_ms: u64) -> Self {
        Self { vars: Snapshot::new(), events: &[], now_ms }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
