// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ingested user events and the bounded per-user event log.

use crate::context::Properties;
use crate::id::DistinctId;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::HashMap;
use uuid::Uuid;

/// Names of events the engine itself injects into the ingestion
/// pipeline. All internal names carry a `$` prefix so they can never
/// collide with host-app event names.
pub mod internal {
    pub const PURCHASE_COMPLETED: &str = "$purchase_completed";
    pub const PURCHASE_FAILED: &str = "$purchase_failed";
    pub const RESTORE_COMPLETED: &str = "$restore_completed";
    pub const RESTORE_FAILED: &str = "$restore_failed";
    pub const FLOW_DISMISSED: &str = "$flow_dismissed";
    pub const FLOW_ACTION: &str = "$flow_action";
    pub const SEGMENT_ENTERED: &str = "$segment_entered";
    pub const SEGMENT_LEFT: &str = "$segment_left";
}

/// An event ingested through `track`, either from the host app or
/// injected by the engine (purchase outcomes, flow signals).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEvent {
    pub id: Uuid,
    pub name: SmolStr,
    pub distinct_id: DistinctId,
    pub timestamp_ms: u64,
    #[serde(default)]
    pub properties: Properties,
}

impl UserEvent {
    pub fn new(name: impl Into<SmolStr>, distinct_id: impl Into<DistinctId>, timestamp_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            distinct_id: distinct_id.into(),
            timestamp_ms,
            properties: Properties::new(),
        }
    }

    /// Attach a property, consuming and returning the event.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn properties(mut self, props: Properties) -> Self {
        self.properties = props;
        self
    }

    /// True for engine-injected events (`$`-prefixed names).
    pub fn is_internal(&self) -> bool {
        self.name.starts_with('$')
    }
}

/// A trimmed event retained in the in-memory log for aggregation
/// predicates (`event_count`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub name: SmolStr,
    pub timestamp_ms: u64,
    pub properties: Properties,
}

impl From<&UserEvent> for LoggedEvent {
    fn from(event: &UserEvent) -> Self {
        Self {
            name: event.name.clone(),
            timestamp_ms: event.timestamp_ms,
            properties: event.properties.clone(),
        }
    }
}

/// Bounded per-user log of recently ingested events.
///
/// Runtime state only — never persisted. Aggregation predicates see
/// events since process start, capped at `capacity` per user.
#[derive(Debug)]
pub struct EventLog {
    capacity: usize,
    by_user: HashMap<DistinctId, Vec<LoggedEvent>>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, by_user: HashMap::new() }
    }

    pub fn append(&mut self, event: &UserEvent) {
        let log = self.by_user.entry(event.distinct_id.clone()).or_default();
        log.push(LoggedEvent::from(event));
        if log.len() > self.capacity {
            let overflow = log.len() - self.capacity;
            log.drain(..overflow);
        }
    }

    /// Events logged for the given user, oldest first.
    pub fn for_user(&self, distinct_id: &DistinctId) -> &[LoggedEvent] {
        self.by_user.get(distinct_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
