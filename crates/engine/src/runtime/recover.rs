// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup rehydration.
//!
//! After a restart the store is the only truth: every paused journey is
//! re-armed (timer) and re-registered (waits) from its persisted
//! record, overdue journeys advance immediately in deadline order, and
//! journeys stranded in `Running` by a crash mid-advance re-execute
//! their current node.

use super::Engine;
use crate::executor::AdvanceCause;
use nuxie_adapters::{
    AnalyticsAdapter, CustomerUpdateAdapter, DelegateAdapter, FlowAdapter, PurchaseAdapter,
    RemoteActionAdapter,
};
use nuxie_core::{Clock, JourneyId};

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
    /// Rehydrate scheduler and router state from the store. Call once,
    /// after campaigns are registered.
    pub async fn recover(&self) {
        let now = self.clock.epoch_ms();
        let paused = self.store.list_paused();
        let mut overdue: Vec<(u64, JourneyId)> = Vec::new();
        let mut rearmed = 0usize;

        for summary in &paused {
            let journey = match self.store.load(summary.journey_id) {
                Ok(Some(journey)) => journey,
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!(
                        journey = %summary.journey_id,
                        error = %e,
                        "recovery load failed, skipping"
                    );
                    continue;
                }
            };

            if !journey.wait_conditions.is_empty() {
                self.router.lock().register(
                    journey.id,
                    &journey.distinct_id,
                    &journey.wait_conditions,
                );
            }
            match journey.resume_at_ms {
                Some(at) if at <= now => overdue.push((at, journey.id)),
                Some(at) => {
                    self.scheduler.lock().arm(journey.id, at);
                    rearmed += 1;
                }
                None => {}
            }
        }

        // Overdue journeys advance immediately, in deadline order.
        overdue.sort();
        let overdue_count = overdue.len();
        for (_, journey_id) in overdue {
            if let Err(e) = self.advance_on_timer(journey_id).await {
                tracing::error!(journey = %journey_id, error = %e, "overdue advance failed");
            }
        }

        // Crash leftovers: re-execute the node the process died on.
        let stranded = self.store.list_running();
        let stranded_count = stranded.len();
        for summary in stranded {
            if let Err(e) = self
                .advance(summary.journey_id, AdvanceCause::Start { origin: None })
                .await
            {
                tracing::error!(
                    journey = %summary.journey_id,
                    error = %e,
                    "stranded advance failed"
                );
            }
        }

        tracing::info!(
            paused = paused.len(),
            rearmed,
            overdue = overdue_count,
            stranded = stranded_count,
            "recovery complete"
        );
    }
}
