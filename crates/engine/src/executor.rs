// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The journey executor: drives one journey forward from its current
//! node until it pauses, completes, or errors.
//!
//! One advance holds the per-journey lock for its whole duration;
//! cross-journey advances run in parallel up to
//! `max_concurrent_advance`. Long-running adapter work never happens
//! under the lock — nodes record intent effects and the completions
//! come back through the internal event queue.

use crate::error::EngineError;
use crate::nodes::{self, Effect, ExecCtx, NodeOutcome, ResumeCause, Verdict};
use crate::runtime::Engine;
use nuxie_adapters::{
    AnalyticsAdapter, CustomerUpdateAdapter, DelegateAdapter, DismissReason, FlowAdapter,
    FlowRequest, FlowSignal, PurchaseAdapter, PurchaseOutcome, RemoteActionAdapter,
    RestoreOutcome,
};
use nuxie_campaign::Campaign;
use nuxie_core::event::internal;
use nuxie_core::{
    Clock, ExitReason, Journey, JourneyId, JourneyStatus, Properties, Snapshot, TrackedEvent,
    UserEvent,
};
use serde_json::Value;
use std::sync::Arc;

/// Guard against a validation escape: no legal workflow advances this
/// many synchronous steps without pausing.
const MAX_STEPS_PER_ADVANCE: usize = 1_000;

/// Why `advance` was invoked. Resolved into a [`ResumeCause`] once the
/// journey lock is held (the pending-resume slot is consulted there).
#[derive(Debug, Clone)]
pub(crate) enum AdvanceCause {
    Start { origin: Option<UserEvent> },
    Timer,
    /// The router deposited the matched event into the pending-resume
    /// slot before requesting the advance.
    DepositedEvent,
}

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
    pub(crate) async fn advance_on_timer(&self, journey_id: JourneyId) -> Result<(), EngineError> {
        self.advance(journey_id, AdvanceCause::Timer).await
    }

    /// Advance a journey through synchronous node results until it
    /// pauses, completes, or errors.
    pub(crate) async fn advance(
        &self,
        journey_id: JourneyId,
        cause: AdvanceCause,
    ) -> Result<(), EngineError> {
        // The semaphore is never closed; a failed acquire means the
        // runtime is tearing down and a lost permit is moot.
        let _permit = Arc::clone(&self.permits).acquire_owned().await.ok();
        let _guard = self.store.lock(journey_id).await;

        // Event-before-timer: a deposited event resume outranks the
        // timer that raced it to the lock.
        let cause = match cause {
            AdvanceCause::Start { origin } => ResumeCause::Start { origin },
            AdvanceCause::Timer => match self.take_pending_resume(journey_id) {
                Some(pending) => ResumeCause::Event { event: pending.event, path: pending.path },
                None => ResumeCause::Timer,
            },
            AdvanceCause::DepositedEvent => match self.take_pending_resume(journey_id) {
                Some(pending) => ResumeCause::Event { event: pending.event, path: pending.path },
                // A racing timer advance already consumed the event.
                None => return Ok(()),
            },
        };

        let Some(mut journey) = self.store.load(journey_id)? else {
            tracing::warn!(journey = %journey_id, "advance requested for unknown journey");
            return Ok(());
        };

        if journey.is_terminal() {
            tracing::warn!(journey = %journey_id, status = %journey.status, "advance on terminal journey ignored");
            self.schedule(journey_id, None);
            self.router.lock().unregister(journey_id);
            return Ok(());
        }

        if !self.resume_is_current(&journey, &cause) {
            return Ok(());
        }

        let campaign = self.registrar.lock().get(journey.campaign_id);
        let Some(campaign) = campaign else {
            tracing::error!(
                journey = %journey_id,
                campaign = %journey.campaign_id,
                "campaign missing from registrar, erroring journey"
            );
            self.fail_journey(&mut journey, None, "campaign not registered").await?;
            return Err(EngineError::CampaignNotFound(journey.campaign_id));
        };

        self.run_steps(&mut journey, &campaign, cause).await
    }

    /// Reject stale wake-ups: resumes are only valid against the state
    /// that registered them.
    fn resume_is_current(&self, journey: &Journey, cause: &ResumeCause) -> bool {
        match cause {
            ResumeCause::Start { .. } => {
                if journey.status != JourneyStatus::Running {
                    tracing::warn!(journey = %journey.id, status = %journey.status, "start advance on non-running journey");
                    return false;
                }
                true
            }
            ResumeCause::Timer => {
                if journey.status != JourneyStatus::Paused {
                    tracing::debug!(journey = %journey.id, "stale timer fire ignored");
                    return false;
                }
                true
            }
            ResumeCause::Event { path, .. } => {
                let registered = journey.status == JourneyStatus::Paused
                    && journey.wait_conditions.iter().any(|w| w.path == *path);
                if !registered {
                    tracing::debug!(journey = %journey.id, path, "stale event resume ignored");
                }
                registered
            }
        }
    }

    async fn run_steps(
        &self,
        journey: &mut Journey,
        campaign: &Campaign,
        cause: ResumeCause,
    ) -> Result<(), EngineError> {
        let now_start = self.clock.epoch_ms();
        let origin_event = cause.event().cloned();
        let user_props = self.user_props_for(&journey.distinct_id);
        let logged = self.logged_events_for(&journey.distinct_id);
        let event_props: Option<Properties> = cause.event_properties().cloned();
        let mut cause = cause;

        tracing::debug!(
            journey = %journey.id,
            node = %journey.current_node_id,
            cause = cause_name(&cause),
            "advancing"
        );

        for _step in 0..MAX_STEPS_PER_ADVANCE {
            let now_ms = self.clock.epoch_ms();
            let Some(node_ix) = campaign.workflow.resolve(&journey.current_node_id) else {
                let node = journey.current_node_id.clone();
                self.fail_journey(journey, Some(node.as_str()), "unknown node").await?;
                return Err(EngineError::UnknownNode { journey: journey.id, node });
            };
            let node = campaign.workflow.node(node_ix);

            let outcome: NodeOutcome = {
                let mut snapshot = Snapshot::new().layer(&journey.context).layer(&user_props);
                if let Some(event_props) = &event_props {
                    snapshot = snapshot.layer(event_props);
                }
                let ctx = ExecCtx {
                    journey,
                    campaign,
                    node,
                    snapshot,
                    events: &logged,
                    now_ms,
                    cause: &cause,
                };
                nodes::execute(&ctx)
            };

            self.emit(
                journey.distinct_id.clone(),
                TrackedEvent::NodeExecuted {
                    journey_id: journey.id,
                    campaign_id: campaign.id,
                    node_id: node.id.clone(),
                    node_kind: node.kind_name().to_string(),
                    result: outcome.verdict.name().to_string(),
                    context_snapshot: journey.context.clone(),
                },
            )
            .await;

            let node_id = node.id.clone();
            for (key, value) in outcome.context_updates {
                journey.context.insert(key, value);
            }

            // Verdict bookkeeping happens before effects are performed:
            // an intent effect (purchase, remote action) may complete on
            // another task immediately, and its resume event must find
            // the wait conditions already registered.
            match outcome.verdict {
                Verdict::Continue(next) | Verdict::Skip(next) => {
                    journey.resume(now_ms);
                    journey.current_node_id = campaign.workflow.node(next).id.clone();
                    self.perform_effects(journey, campaign, outcome.effects).await;
                    cause = ResumeCause::Start { origin: origin_event.clone() };
                }
                Verdict::Async { resume_at_ms, waits } => {
                    journey.pause(resume_at_ms, waits.clone(), now_ms);
                    if let Err(e) = self.store.save(journey) {
                        self.fail_journey(journey, Some(node_id.as_str()), "persist failed").await?;
                        return Err(e.into());
                    }
                    self.schedule(journey.id, resume_at_ms);
                    {
                        let mut router = self.router.lock();
                        if waits.is_empty() {
                            router.unregister(journey.id);
                        } else {
                            router.register(journey.id, &journey.distinct_id, &waits);
                        }
                    }
                    self.perform_effects(journey, campaign, outcome.effects).await;
                    tracing::debug!(
                        journey = %journey.id,
                        node = %node_id,
                        resume_at = ?resume_at_ms,
                        waits = waits.len(),
                        elapsed_ms = self.clock.epoch_ms().saturating_sub(now_start),
                        "journey paused"
                    );
                    return Ok(());
                }
                Verdict::Complete(reason) => {
                    journey.complete(reason, now_ms);
                    if let Err(e) = self.store.save(journey) {
                        self.fail_journey(journey, Some(node_id.as_str()), "persist failed").await?;
                        return Err(e.into());
                    }
                    self.schedule(journey.id, None);
                    self.router.lock().unregister(journey.id);
                    self.perform_effects(journey, campaign, outcome.effects).await;
                    tracing::info!(
                        journey = %journey.id,
                        exit_reason = %reason,
                        elapsed_ms = self.clock.epoch_ms().saturating_sub(now_start),
                        "journey completed"
                    );
                    let tracked = if reason == ExitReason::Errored {
                        TrackedEvent::JourneyErrored {
                            journey_id: journey.id,
                            campaign_id: campaign.id,
                            node_id: Some(node_id),
                            error: "exit node with errored reason".into(),
                        }
                    } else {
                        TrackedEvent::JourneyCompleted {
                            journey_id: journey.id,
                            campaign_id: campaign.id,
                            exit_reason: reason,
                        }
                    };
                    self.emit(journey.distinct_id.clone(), tracked).await;
                    return Ok(());
                }
            }
        }

        self.fail_journey(journey, None, "advance exceeded step limit").await?;
        Err(EngineError::RunawayAdvance { journey: journey.id, steps: MAX_STEPS_PER_ADVANCE })
    }

    /// Mark a journey errored and clean up its schedule. Best-effort:
    /// a store failure here is logged, not propagated.
    async fn fail_journey(
        &self,
        journey: &mut Journey,
        node_id: Option<&str>,
        error: &str,
    ) -> Result<(), EngineError> {
        journey.complete(ExitReason::Errored, self.clock.epoch_ms());
        if let Err(e) = self.store.save(journey) {
            tracing::error!(journey = %journey.id, error = %e, "failed to persist errored journey");
        }
        self.schedule(journey.id, None);
        self.router.lock().unregister(journey.id);
        self.emit(
            journey.distinct_id.clone(),
            TrackedEvent::JourneyErrored {
                journey_id: journey.id,
                campaign_id: journey.campaign_id,
                node_id: node_id.map(String::from),
                error: error.to_string(),
            },
        )
        .await;
        Ok(())
    }

    /// Administrative termination (`exit_reason = superseded`).
    pub async fn terminate(&self, journey_id: JourneyId) -> Result<(), EngineError> {
        let _guard = self.store.lock(journey_id).await;
        let Some(mut journey) = self.store.load(journey_id)? else {
            return Ok(());
        };
        if journey.is_terminal() {
            return Ok(());
        }
        journey.complete(ExitReason::Superseded, self.clock.epoch_ms());
        self.store.save(&journey)?;
        self.schedule(journey_id, None);
        self.router.lock().unregister(journey_id);
        self.emit(
            journey.distinct_id.clone(),
            TrackedEvent::JourneyCompleted {
                journey_id,
                campaign_id: journey.campaign_id,
                exit_reason: ExitReason::Superseded,
            },
        )
        .await;
        Ok(())
    }

    /// Perform node effects. Quick calls run inline; anything that can
    /// take real time (flow load, purchase, remote action) spawns a
    /// task whose completion comes back through the internal queue.
    async fn perform_effects(
        &self,
        journey: &Journey,
        campaign: &Campaign,
        effects: Vec<Effect>,
    ) {
        for effect in effects {
            match effect {
                Effect::Track(event) => {
                    self.emit(journey.distinct_id.clone(), event).await;
                }

                Effect::ShowFlow { flow_id, parameters } => {
                    self.show_flow(journey, campaign, flow_id, parameters);
                }

                Effect::CallDelegate { message, payload } => {
                    if let Err(e) = self.deps.delegate.call_delegate(&message, payload.as_ref()).await
                    {
                        tracing::warn!(journey = %journey.id, error = %e, "delegate call failed");
                    }
                }

                Effect::UpdateCustomer { attributes } => {
                    if let Err(e) = self
                        .deps
                        .customer
                        .update_properties(&journey.distinct_id, &attributes)
                        .await
                    {
                        tracing::warn!(journey = %journey.id, error = %e, "customer update failed");
                    }
                    self.set_user_properties(journey.distinct_id.clone(), attributes);
                }

                Effect::SendEvent { event_name, properties } => {
                    let event = UserEvent::new(
                        event_name,
                        journey.distinct_id.clone(),
                        self.clock.epoch_ms(),
                    )
                    .properties(properties);
                    self.enqueue_internal(event);
                }

                Effect::StartPurchase { product_id } => {
                    self.start_purchase(journey, product_id);
                }

                Effect::StartRestore => {
                    self.start_restore(journey);
                }

                Effect::StartRemoteAction { action } => {
                    self.start_remote_action(journey, campaign, action);
                }
            }
        }
    }

    fn show_flow(
        &self,
        journey: &Journey,
        campaign: &Campaign,
        flow_id: smol_str::SmolStr,
        parameters: Properties,
    ) {
        let request = FlowRequest {
            flow_id: flow_id.clone(),
            journey_id: journey.id,
            campaign_id: campaign.id,
            parameters,
            context: journey.context.clone(),
        };
        let Some(engine) = self.strong() else { return };
        let distinct_id = journey.distinct_id.clone();
        let campaign_id = campaign.id;
        let journey_id = journey.id;
        let timeout = self.config.flow_load_timeout;

        self.begin_work();
        tokio::spawn(async move {
            let (signal_tx, signal_rx) = tokio::sync::mpsc::channel(8);
            engine.spawn_flow_signal_forwarder(signal_rx, distinct_id.clone(), campaign_id);

            let presented =
                tokio::time::timeout(timeout, engine.deps.flows.present_flow(request, signal_tx))
                    .await;
            match presented {
                Ok(Ok(handle)) => {
                    tracing::debug!(
                        journey = %journey_id,
                        flow = %flow_id,
                        presentation = %handle.presentation_id,
                        "flow presented"
                    );
                }
                Ok(Err(e)) => {
                    tracing::warn!(journey = %journey_id, flow = %flow_id, error = %e, "flow load failed");
                    engine
                        .flow_dismissed(journey_id, campaign_id, &distinct_id, &flow_id, DismissReason::LoadError)
                        .await;
                }
                Err(_) => {
                    tracing::warn!(journey = %journey_id, flow = %flow_id, "flow load timed out");
                    engine
                        .flow_dismissed(journey_id, campaign_id, &distinct_id, &flow_id, DismissReason::LoadError)
                        .await;
                }
            }
            engine.end_work();
        });
    }

    fn spawn_flow_signal_forwarder(
        &self,
        mut rx: tokio::sync::mpsc::Receiver<FlowSignal>,
        distinct_id: nuxie_core::DistinctId,
        campaign_id: nuxie_core::CampaignId,
    ) {
        // The forwarder lives as long as the presentation does; it
        // holds only a weak handle so it cannot outlive-pin the engine.
        let weak = self.weak_handle();
        let cancel = self.cancel_token();
        tokio::spawn(async move {
            loop {
                let signal = tokio::select! {
                    _ = cancel.cancelled() => break,
                    signal = rx.recv() => signal,
                };
                let Some(signal) = signal else { break };
                let Some(engine) = weak.upgrade() else { break };
                match signal {
                    FlowSignal::Dismissed { journey_id, flow_id, reason } => {
                        engine
                            .flow_dismissed(journey_id, campaign_id, &distinct_id, &flow_id, reason)
                            .await;
                    }
                    FlowSignal::Purchased { journey_id, flow_id, product_id } => {
                        let mut props =
                            crate::nodes::outcome_properties(journey_id, &[(
                                "product_id",
                                Value::String(product_id),
                            )]);
                        props.insert("flow_id".into(), Value::String(flow_id.to_string()));
                        engine.enqueue_internal(
                            UserEvent::new(
                                internal::PURCHASE_COMPLETED,
                                distinct_id.clone(),
                                engine.clock.epoch_ms(),
                            )
                            .properties(props),
                        );
                    }
                    FlowSignal::Action { journey_id, flow_id, kind, payload } => {
                        let mut props = crate::nodes::outcome_properties(journey_id, &[(
                            "kind",
                            Value::String(kind.to_string()),
                        )]);
                        props.insert("flow_id".into(), Value::String(flow_id.to_string()));
                        props.insert("payload".into(), payload);
                        engine.enqueue_internal(
                            UserEvent::new(
                                internal::FLOW_ACTION,
                                distinct_id.clone(),
                                engine.clock.epoch_ms(),
                            )
                            .properties(props),
                        );
                    }
                }
            }
        });
    }

    async fn flow_dismissed(
        &self,
        journey_id: JourneyId,
        campaign_id: nuxie_core::CampaignId,
        distinct_id: &nuxie_core::DistinctId,
        flow_id: &smol_str::SmolStr,
        reason: DismissReason,
    ) {
        self.emit(
            distinct_id.clone(),
            TrackedEvent::FlowDismissed {
                journey_id,
                campaign_id,
                flow_id: flow_id.clone(),
                reason: reason.as_str().to_string(),
            },
        )
        .await;
        let mut props = crate::nodes::outcome_properties(journey_id, &[(
            "reason",
            Value::String(reason.as_str().to_string()),
        )]);
        props.insert("flow_id".into(), Value::String(flow_id.to_string()));
        self.enqueue_internal(
            UserEvent::new(internal::FLOW_DISMISSED, distinct_id.clone(), self.clock.epoch_ms())
                .properties(props),
        );
    }

    fn start_purchase(&self, journey: &Journey, product_id: String) {
        let Some(engine) = self.strong() else { return };
        let distinct_id = journey.distinct_id.clone();
        let journey_id = journey.id;
        let timeout = self.config.purchase_timeout;

        self.begin_work();
        tokio::spawn(async move {
            let outcome =
                tokio::time::timeout(timeout, engine.deps.purchases.purchase(&product_id)).await;
            let (name, extra): (&str, Vec<(&str, Value)>) = match outcome {
                Ok(Ok(PurchaseOutcome::Completed)) => (
                    internal::PURCHASE_COMPLETED,
                    vec![("product_id", Value::String(product_id.clone()))],
                ),
                Ok(Ok(PurchaseOutcome::Failed { reason })) => (
                    internal::PURCHASE_FAILED,
                    vec![
                        ("product_id", Value::String(product_id.clone())),
                        ("reason", Value::String(reason)),
                    ],
                ),
                Ok(Err(e)) => (
                    internal::PURCHASE_FAILED,
                    vec![
                        ("product_id", Value::String(product_id.clone())),
                        ("reason", Value::String(e.to_string())),
                    ],
                ),
                Err(_) => (
                    internal::PURCHASE_FAILED,
                    vec![
                        ("product_id", Value::String(product_id.clone())),
                        ("reason", Value::String("timeout".into())),
                    ],
                ),
            };
            let props = crate::nodes::outcome_properties(journey_id, &extra);
            engine.enqueue_internal(
                UserEvent::new(name, distinct_id, engine.clock.epoch_ms()).properties(props),
            );
            engine.end_work();
        });
    }

    fn start_restore(&self, journey: &Journey) {
        let Some(engine) = self.strong() else { return };
        let distinct_id = journey.distinct_id.clone();
        let journey_id = journey.id;
        let timeout = self.config.purchase_timeout;

        self.begin_work();
        tokio::spawn(async move {
            let outcome = tokio::time::timeout(timeout, engine.deps.purchases.restore()).await;
            let (name, extra): (&str, Vec<(&str, Value)>) = match outcome {
                Ok(Ok(RestoreOutcome::Completed)) => (internal::RESTORE_COMPLETED, vec![]),
                Ok(Ok(RestoreOutcome::Failed { reason })) => {
                    (internal::RESTORE_FAILED, vec![("reason", Value::String(reason))])
                }
                Ok(Err(e)) => {
                    (internal::RESTORE_FAILED, vec![("reason", Value::String(e.to_string()))])
                }
                Err(_) => {
                    (internal::RESTORE_FAILED, vec![("reason", Value::String("timeout".into()))])
                }
            };
            let props = crate::nodes::outcome_properties(journey_id, &extra);
            engine.enqueue_internal(
                UserEvent::new(name, distinct_id, engine.clock.epoch_ms()).properties(props),
            );
            engine.end_work();
        });
    }

    fn start_remote_action(
        &self,
        journey: &Journey,
        campaign: &Campaign,
        action: String,
    ) {
        let Some(engine) = self.strong() else { return };
        let distinct_id = journey.distinct_id.clone();
        let journey_id = journey.id;
        let campaign_id = campaign.id;
        let context = journey.context.clone();
        let timeout = self.config.flow_load_timeout;

        self.begin_work();
        tokio::spawn(async move {
            let response = tokio::time::timeout(
                timeout,
                engine.deps.remote.perform(&action, journey_id, campaign_id, &context),
            )
            .await;
            let (name, extra): (&str, Vec<(&str, Value)>) = match response {
                Ok(Ok(response)) => (
                    crate::nodes::REMOTE_ACTION_COMPLETED,
                    vec![("context_updates", Value::Object(response.context_updates))],
                ),
                Ok(Err(e)) => (
                    crate::nodes::REMOTE_ACTION_FAILED,
                    vec![("reason", Value::String(e.to_string()))],
                ),
                Err(_) => (
                    crate::nodes::REMOTE_ACTION_FAILED,
                    vec![("reason", Value::String("timeout".into()))],
                ),
            };
            let props = crate::nodes::outcome_properties(journey_id, &extra);
            engine.enqueue_internal(
                UserEvent::new(name, distinct_id, engine.clock.epoch_ms()).properties(props),
            );
            engine.end_work();
        });
    }
}

fn cause_name(cause: &ResumeCause) -> &'static str {
    match cause {
        ResumeCause::Start { .. } => "start",
        ResumeCause::Timer => "timer",
        ResumeCause::Event { .. } => "event",
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
