// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event ingestion: the `track` entry point.
//!
//! Each ingested event, host-app or engine-internal, flows through the
//! same pipeline: event log → goal tracking → router (resume paused
//! journeys) → registrar (spawn new journeys).

use super::{Engine, PendingResume};
use crate::executor::AdvanceCause;
use crate::registrar::{reentry_decision, ReentryDecision};
use nuxie_adapters::{
    AnalyticsAdapter, CustomerUpdateAdapter, DelegateAdapter, FlowAdapter, PurchaseAdapter,
    RemoteActionAdapter,
};
use nuxie_campaign::{Campaign, ExitPolicy};
use nuxie_core::{Clock, ExitReason, Journey, TrackedEvent, UserEvent};

impl<F, D, P, U, A, R, C> Engine<F, D, P, U, A, R, C>
where
    F: FlowAdapter,
    D: DelegateAdapter,
    P: PurchaseAdapter,
    U: CustomerUpdateAdapter,
    A: AnalyticsAdapter,
    R: RemoteActionAdapter,
    C: Clock,
{
    /// Ingest a user event. Resumes every paused journey with a
    /// matching wait condition and spawns journeys for campaigns whose
    /// trigger matches.
    pub async fn track(&self, mut event: UserEvent) {
        if event.timestamp_ms == 0 {
            event.timestamp_ms = self.clock.epoch_ms();
        }
        self.ingest(event).await;
    }

    pub(crate) async fn ingest(&self, event: UserEvent) {
        tracing::debug!(
            event = %event.name,
            distinct_id = %event.distinct_id,
            internal = event.is_internal(),
            "ingesting event"
        );

        self.event_log.lock().append(&event);
        self.check_goals(&event).await;

        // Router first: an event resumes existing waits before it can
        // spawn a journey that might register new ones.
        let matches = {
            let router = self.router.lock();
            router.matches(&event, |predicate| self.eval_with_event(predicate, &event))
        };
        for matched in matches {
            self.deposit_pending_resume(
                matched.journey_id,
                PendingResume { event: event.clone(), path: matched.path },
            );
            if let Err(e) = self
                .advance(matched.journey_id, AdvanceCause::DepositedEvent)
                .await
            {
                tracing::error!(
                    journey = %matched.journey_id,
                    error = %e,
                    "event resume failed"
                );
            }
        }

        // Registrar: spawn decisions.
        let campaigns = self.registrar.lock().triggered_by(&event.name);
        for campaign in campaigns {
            if let Some(predicate) = &campaign.trigger.predicate {
                if !self.eval_with_event(predicate, &event) {
                    continue;
                }
            }
            let history = self.store.list_for_campaign(&event.distinct_id, campaign.id);
            match reentry_decision(&campaign, &history, self.clock.epoch_ms()) {
                ReentryDecision::Spawn => self.spawn_journey(&campaign, &event).await,
                ReentryDecision::Blocked(reason) => {
                    tracing::debug!(
                        campaign = %campaign.id,
                        distinct_id = %event.distinct_id,
                        reason,
                        "re-entry blocked"
                    );
                }
            }
        }
    }

    async fn spawn_journey(&self, campaign: &Campaign, event: &UserEvent) {
        let now = self.clock.epoch_ms();
        let journey = Journey::new(
            campaign.id,
            event.distinct_id.clone(),
            &campaign.entry_node_id,
            Some(event.id),
            now,
        );
        let journey_id = journey.id;
        if let Err(e) = self.store.save(&journey) {
            tracing::error!(campaign = %campaign.id, error = %e, "failed to persist new journey");
            return;
        }

        tracing::info!(
            journey = %journey_id,
            campaign = %campaign.id,
            distinct_id = %event.distinct_id,
            trigger = %event.name,
            "journey started"
        );
        self.emit(
            event.distinct_id.clone(),
            TrackedEvent::JourneyStarted {
                journey_id,
                campaign_id: campaign.id,
                origin_event_id: Some(event.id),
            },
        )
        .await;

        if let Err(e) = self
            .advance(journey_id, AdvanceCause::Start { origin: Some(event.clone()) })
            .await
        {
            tracing::error!(journey = %journey_id, error = %e, "initial advance failed");
        }
    }

    /// Goal tracking: when a goal-bearing campaign's predicate matches
    /// an event, mark the user's active journeys converted (and
    /// terminate them under `exit_on_goal`).
    async fn check_goals(&self, event: &UserEvent) {
        let goal_campaigns = self.registrar.lock().with_goals();
        for campaign in goal_campaigns {
            let Some(goal) = &campaign.goal else { continue };

            let active: Vec<_> = self
                .store
                .list_for_campaign(&event.distinct_id, campaign.id)
                .into_iter()
                .filter(|s| !s.status.is_terminal())
                .collect();
            if active.is_empty() {
                continue;
            }
            if !self.eval_with_event(goal, event) {
                continue;
            }

            for summary in active {
                self.record_conversion(&campaign, summary.journey_id).await;
            }
        }
    }

    async fn record_conversion(&self, campaign: &Campaign, journey_id: nuxie_core::JourneyId) {
        let _guard = self.store.lock(journey_id).await;
        let journey = match self.store.load(journey_id) {
            Ok(Some(journey)) => journey,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(journey = %journey_id, error = %e, "conversion load failed");
                return;
            }
        };
        if journey.is_terminal() {
            return;
        }

        let now = self.clock.epoch_ms();
        let mut journey = journey;
        journey.mark_goal_reached(now);

        let exiting = campaign.exit_policy == ExitPolicy::ExitOnGoal;
        if exiting {
            journey.complete(ExitReason::Converted, now);
        }
        if let Err(e) = self.store.save(&journey) {
            tracing::error!(journey = %journey_id, error = %e, "conversion save failed");
            return;
        }

        tracing::info!(
            journey = %journey_id,
            campaign = %campaign.id,
            exiting,
            "goal observed"
        );
        self.emit(
            journey.distinct_id.clone(),
            TrackedEvent::JourneyConverted {
                journey_id,
                campaign_id: campaign.id,
                anchor: campaign.conversion_anchor.clone(),
            },
        )
        .await;

        if exiting {
            self.schedule(journey_id, None);
            self.router.lock().unregister(journey_id);
            self.emit(
                journey.distinct_id.clone(),
                TrackedEvent::JourneyCompleted {
                    journey_id,
                    campaign_id: campaign.id,
                    exit_reason: ExitReason::Converted,
                },
            )
            .await;
        }
    }
}
