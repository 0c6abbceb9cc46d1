// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event router: wakes paused journeys whose wait conditions match an
//! ingested event.
//!
//! Registrations are indexed by event name for O(1) candidate lookup;
//! predicates are evaluated lazily, only for candidates under the
//! matching key. An empty event name registers a wildcard (expression
//! wait paths re-check on every event of the user).

use nuxie_core::{event::internal, DistinctId, JourneyId, PredicateIr, UserEvent, WaitCondition, WaitKind};
use smol_str::SmolStr;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Registration {
    journey_id: JourneyId,
    distinct_id: DistinctId,
    /// Wait-path index; smallest wins on simultaneous matches.
    path: usize,
    predicate: Option<PredicateIr>,
    /// For segment-change conditions: the segment that must appear in
    /// the event's `segment_id` property.
    segment_id: Option<String>,
}

/// A matched registration: which journey to wake and which wait path
/// matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterMatch {
    pub journey_id: JourneyId,
    pub path: usize,
}

/// Index from wait-condition to waiting journeys.
#[derive(Debug, Default)]
pub struct EventRouter {
    by_event: HashMap<SmolStr, Vec<Registration>>,
    /// Empty-name registrations, matched against every event.
    wildcard: Vec<Registration>,
    /// Keys a journey occupies, for O(registrations) unregister.
    by_journey: HashMap<JourneyId, Vec<SmolStr>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a journey's wait conditions, replacing any prior
    /// registration. Idempotent.
    pub fn register(
        &mut self,
        journey_id: JourneyId,
        distinct_id: &DistinctId,
        conditions: &[WaitCondition],
    ) {
        self.unregister(journey_id);
        let mut keys = Vec::new();
        for condition in conditions {
            match &condition.kind {
                WaitKind::Event { name, predicate } => {
                    let registration = Registration {
                        journey_id,
                        distinct_id: distinct_id.clone(),
                        path: condition.path,
                        predicate: predicate.clone(),
                        segment_id: None,
                    };
                    if name.is_empty() {
                        self.wildcard.push(registration);
                        keys.push(SmolStr::default());
                    } else {
                        self.by_event.entry(name.clone()).or_default().push(registration);
                        keys.push(name.clone());
                    }
                }
                WaitKind::SegmentChange { segment_id } => {
                    // Segment membership changes arrive as internal
                    // events; register under both directions.
                    for name in [internal::SEGMENT_ENTERED, internal::SEGMENT_LEFT] {
                        self.by_event.entry(SmolStr::new(name)).or_default().push(Registration {
                            journey_id,
                            distinct_id: distinct_id.clone(),
                            path: condition.path,
                            predicate: None,
                            segment_id: Some(segment_id.clone()),
                        });
                        keys.push(SmolStr::new(name));
                    }
                }
            }
        }
        if !keys.is_empty() {
            self.by_journey.insert(journey_id, keys);
        }
    }

    /// Drop every registration for a journey. Idempotent.
    pub fn unregister(&mut self, journey_id: JourneyId) {
        let Some(keys) = self.by_journey.remove(&journey_id) else {
            return;
        };
        for key in keys {
            if key.is_empty() {
                self.wildcard.retain(|r| r.journey_id != journey_id);
            } else if let Some(registrations) = self.by_event.get_mut(&key) {
                registrations.retain(|r| r.journey_id != journey_id);
                if registrations.is_empty() {
                    self.by_event.remove(&key);
                }
            }
        }
    }

    pub fn is_registered(&self, journey_id: JourneyId) -> bool {
        self.by_journey.contains_key(&journey_id)
    }

    /// Journeys to wake for an event. One match per journey (smallest
    /// path index); predicates are evaluated through `eval` so the
    /// caller controls the evaluation context.
    pub fn matches(
        &self,
        event: &UserEvent,
        mut eval: impl FnMut(&PredicateIr) -> bool,
    ) -> Vec<RouterMatch> {
        let mut best: HashMap<JourneyId, usize> = HashMap::new();
        let candidates = self
            .by_event
            .get(event.name.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .chain(self.wildcard.iter());

        for registration in candidates {
            if registration.distinct_id != event.distinct_id {
                continue;
            }
            if let Some(segment_id) = &registration.segment_id {
                let event_segment = event
                    .properties
                    .get("segment_id")
                    .and_then(|v| v.as_str());
                if event_segment != Some(segment_id.as_str()) {
                    continue;
                }
            }
            if let Some(predicate) = &registration.predicate {
                if !eval(predicate) {
                    continue;
                }
            }
            best.entry(registration.journey_id)
                .and_modify(|path| *path = (*path).min(registration.path))
                .or_insert(registration.path);
        }

        let mut matches: Vec<RouterMatch> = best
            .into_iter()
            .map(|(journey_id, path)| RouterMatch { journey_id, path })
            .collect();
        matches.sort_by_key(|m| m.journey_id);
        matches
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
