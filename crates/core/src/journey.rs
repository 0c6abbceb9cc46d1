// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-user journey record and its state machine.

use crate::context::Properties;
use crate::id::{CampaignId, DistinctId};
use crate::predicate::PredicateIr;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

crate::define_id! {
    /// Unique identifier for a journey instance.
    ///
    /// Journey ids are clock-ordered: `jny-` + zero-padded base36
    /// epoch-ms + a process sequence + a random tail, so lexicographic
    /// order reconstructs creation order across restarts.
    pub struct JourneyId;
}

/// Process-wide tiebreaker for journeys created within the same
/// millisecond.
static JOURNEY_SEQ: AtomicU64 = AtomicU64::new(0);

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn base36_fixed(mut value: u64, width: usize) -> String {
    let mut out = vec![b'0'; width];
    let mut i = width;
    while value > 0 && i > 0 {
        i -= 1;
        out[i] = BASE36[(value % 36) as usize];
        value /= 36;
    }
    // Only constructed from the BASE36 alphabet.
    String::from_utf8(out).unwrap_or_default()
}

impl JourneyId {
    /// Generate a creation-ordered id for the given wall-clock instant.
    pub fn generate(epoch_ms: u64) -> Self {
        let seq = JOURNEY_SEQ.fetch_add(1, Ordering::Relaxed) % (36 * 36 * 36);
        let id = format!(
            "jny-{}{}{}",
            base36_fixed(epoch_ms, 10),
            base36_fixed(seq, 3),
            nanoid::nanoid!(6),
        );
        Self::from_string(id)
    }
}

/// Lifecycle status of a journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyStatus {
    Running,
    Paused,
    Completed,
    Errored,
}

impl JourneyStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JourneyStatus::Completed | JourneyStatus::Errored)
    }
}

crate::simple_display! {
    JourneyStatus {
        Running => "running",
        Paused => "paused",
        Completed => "completed",
        Errored => "errored",
    }
}

/// Why a journey reached a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Completed,
    Converted,
    ExitedByPolicy,
    Errored,
    Superseded,
    UserDismissed,
    Other,
}

crate::simple_display! {
    ExitReason {
        Completed => "completed",
        Converted => "converted",
        ExitedByPolicy => "exited_by_policy",
        Errored => "errored",
        Superseded => "superseded",
        UserDismissed => "user_dismissed",
        Other => "other",
    }
}

/// What a paused journey is waiting for. Registered with the event
/// router and persisted with the journey so restarts re-register it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitCondition {
    /// Index of the wait path that declared this condition. Smallest
    /// index wins when one event matches several conditions.
    pub path: usize,
    #[serde(flatten)]
    pub kind: WaitKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "wait", rename_all = "snake_case")]
pub enum WaitKind {
    /// An ingested event by name, optionally filtered by predicate.
    Event {
        name: SmolStr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        predicate: Option<PredicateIr>,
    },
    /// Segment membership change for the journey's user.
    SegmentChange { segment_id: String },
}

/// A per-user instance of a campaign workflow.
///
/// Invariants maintained by the transition helpers:
/// - `Paused` ⇒ `resume_at_ms` is set or `wait_conditions` non-empty.
/// - terminal ⇒ `resume_at_ms` cleared, `wait_conditions` empty,
///   `exit_reason` set; no further transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journey {
    pub id: JourneyId,
    pub campaign_id: CampaignId,
    pub distinct_id: DistinctId,
    pub status: JourneyStatus,
    /// Node the journey is at (or paused at), by workflow node id.
    pub current_node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wait_conditions: Vec<WaitCondition>,
    #[serde(default)]
    pub context: Properties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_reason: Option<ExitReason>,
    /// Set when the campaign's goal predicate matched during this
    /// journey's lifetime. Feeds `until_converted` re-entry.
    #[serde(default)]
    pub goal_reached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_event_id: Option<Uuid>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl Journey {
    pub fn new(
        campaign_id: CampaignId,
        distinct_id: DistinctId,
        entry_node_id: impl Into<String>,
        origin_event_id: Option<Uuid>,
        now_ms: u64,
    ) -> Self {
        Self {
            id: JourneyId::generate(now_ms),
            campaign_id,
            distinct_id,
            status: JourneyStatus::Running,
            current_node_id: entry_node_id.into(),
            resume_at_ms: None,
            wait_conditions: Vec::new(),
            context: Properties::new(),
            exit_reason: None,
            goal_reached: false,
            origin_event_id,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Pause at the current node. An indefinite wait (no deadline) is
    /// only legal with at least one wait condition.
    pub fn pause(
        &mut self,
        resume_at_ms: Option<u64>,
        wait_conditions: Vec<WaitCondition>,
        now_ms: u64,
    ) {
        debug_assert!(
            resume_at_ms.is_some() || !wait_conditions.is_empty(),
            "indefinite pause without wait conditions"
        );
        self.status = JourneyStatus::Paused;
        self.resume_at_ms = resume_at_ms;
        self.wait_conditions = wait_conditions;
        self.updated_at_ms = now_ms;
    }

    /// Return to running (a scheduler or router wake-up).
    pub fn resume(&mut self, now_ms: u64) {
        self.status = JourneyStatus::Running;
        self.resume_at_ms = None;
        self.wait_conditions.clear();
        self.updated_at_ms = now_ms;
    }

    /// Terminate. `ExitReason::Errored` lands in `Errored` status,
    /// everything else in `Completed`.
    pub fn complete(&mut self, reason: ExitReason, now_ms: u64) {
        self.status = if reason == ExitReason::Errored {
            JourneyStatus::Errored
        } else {
            JourneyStatus::Completed
        };
        self.exit_reason = Some(reason);
        self.resume_at_ms = None;
        self.wait_conditions.clear();
        self.updated_at_ms = now_ms;
    }

    /// Record that the campaign goal was observed while this journey
    /// exists.
    pub fn mark_goal_reached(&mut self, now_ms: u64) {
        self.goal_reached = true;
        self.updated_at_ms = now_ms;
    }

    /// True when this journey counts as converted for re-entry policy.
    pub fn is_converted(&self) -> bool {
        self.goal_reached || self.exit_reason == Some(ExitReason::Converted)
    }
}

crate::builder! {
    pub struct JourneyBuilder => Journey {
        into {
            campaign_id: CampaignId = "cmp-test",
            distinct_id: DistinctId = "user-1",
            current_node_id: String = "entry",
        }
        set {
            status: JourneyStatus = JourneyStatus::Running,
            context: Properties = Properties::new(),
            wait_conditions: Vec<WaitCondition> = Vec::new(),
            goal_reached: bool = false,
            created_at_ms: u64 = 1_700_000_000_000,
            updated_at_ms: u64 = 1_700_000_000_000,
        }
        option {
            resume_at_ms: u64 = None,
            exit_reason: ExitReason = None,
            origin_event_id: Uuid = None,
        }
        computed {
            id: JourneyId = JourneyId::generate(1_700_000_000_000),
        }
    }
}

#[cfg(test)]
#[path = "journey_tests.rs"]
mod tests;
