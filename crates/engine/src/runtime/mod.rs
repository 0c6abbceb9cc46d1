// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine runtime: wiring between store, scheduler, router,
//! registrar, and adapters.
//!
//! An [`Engine`] is always held behind an `Arc`; construction spawns
//! the internal-event pump and the timer task, both stopped by
//! [`Engine::shutdown`].

mod ingest;
mod recover;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::registrar::CampaignRegistrar;
use crate::router::EventRouter;
use crate::scheduler::Scheduler;
use nuxie_adapters::{
    AnalyticsAdapter, AnalyticsRecord, CustomerUpdateAdapter, DelegateAdapter, FlowAdapter,
    PurchaseAdapter, RemoteActionAdapter,
};
use nuxie_campaign::{CampaignDef, WorkflowError};
use nuxie_core::{
    Clock, DistinctId, EvalContext, EventLog, JourneyId, PredicateIr, Properties, Snapshot,
    TrackedEvent, UserEvent, evaluate_predicate,
};
use nuxie_core::CampaignId;
use nuxie_storage::JourneyStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, Notify, Semaphore};
use tokio_util::sync::CancellationToken;

/// Outbound adapter dependencies.
pub struct EngineDeps<F, D, P, U, A, R> {
    pub flows: F,
    pub delegate: D,
    pub purchases: P,
    pub customer: U,
    pub analytics: A,
    pub remote: R,
}

/// An event-resume deposited by the router before the advance takes the
/// journey lock. A timer advance racing the event consumes the deposit
/// in preference to its own cause, enforcing event-before-timer.
#[derive(Debug, Clone)]
pub(crate) struct PendingResume {
    pub event: UserEvent,
    pub path: usize,
}

/// The journey engine.
pub struct Engine<F, D, P, U, A, R, C>
where
    F: FlowAdapter,
    D: DelegateAdapter,
    P: PurchaseAdapter,
    U: CustomerUpdateAdapter,
    A: AnalyticsAdapter,
    R: RemoteActionAdapter,
    C: Clock,
{
    pub(crate) config: EngineConfig,
    pub(crate) clock: C,
    pub(crate) deps: EngineDeps<F, D, P, U, A, R>,
    pub(crate) store: Arc<JourneyStore>,
    pub(crate) scheduler: Mutex<Scheduler>,
    pub(crate) router: Mutex<EventRouter>,
    pub(crate) registrar: Mutex<CampaignRegistrar>,
    pub(crate) user_props: Mutex<HashMap<DistinctId, Properties>>,
    pub(crate) event_log: Mutex<EventLog>,
    pub(crate) pending_resume: Mutex<HashMap<JourneyId, PendingResume>>,
    pub(crate) permits: Arc<Semaphore>,
    internal_tx: mpsc::UnboundedSender<UserEvent>,
    pub(crate) pending_work: Arc<AtomicUsize>,
    cancel: CancellationToken,
    timer_nudge: Arc<Notify>,
    /// Self-reference for spawned tasks. Always upgradable while any
    /// caller holds the engine.
    weak: Weak<Self>,
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
    /// Open the store and start the runtime tasks. Must be called from
    /// within a tokio runtime.
    pub fn new(
        deps: EngineDeps<F, D, P, U, A, R>,
        config: EngineConfig,
        clock: C,
    ) -> Result<Arc<Self>, EngineError> {
        let store = Arc::new(JourneyStore::open(&config.storage_path)?);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();

        let engine = Arc::new_cyclic(|weak| Self {
            permits: Arc::new(Semaphore::new(config.max_concurrent_advance.max(1))),
            event_log: Mutex::new(EventLog::new(config.event_log_capacity)),
            config,
            clock,
            deps,
            store,
            scheduler: Mutex::new(Scheduler::new()),
            router: Mutex::new(EventRouter::new()),
            registrar: Mutex::new(CampaignRegistrar::new()),
            user_props: Mutex::new(HashMap::new()),
            pending_resume: Mutex::new(HashMap::new()),
            internal_tx,
            pending_work: Arc::new(AtomicUsize::new(0)),
            cancel: CancellationToken::new(),
            timer_nudge: Arc::new(Notify::new()),
            weak: weak.clone(),
        });

        engine.spawn_event_pump(internal_rx);
        engine.spawn_timer_task();
        Ok(engine)
    }

    /// A strong handle for spawned tasks. `None` only during teardown.
    pub(crate) fn strong(&self) -> Option<Arc<Self>> {
        self.weak.upgrade()
    }

    /// Weak handle for long-lived tasks that must not keep the engine
    /// alive.
    pub(crate) fn weak_handle(&self) -> Weak<Self> {
        self.weak.clone()
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Register (or replace) a campaign. Malformed campaigns are
    /// rejected and never execute.
    pub fn register_campaign(&self, def: CampaignDef) -> Result<CampaignId, WorkflowError> {
        self.registrar.lock().register(def)
    }

    /// Seed or update the user-property layer predicates see.
    pub fn set_user_properties(&self, distinct_id: impl Into<DistinctId>, props: Properties) {
        let distinct_id = distinct_id.into();
        let mut users = self.user_props.lock();
        users.entry(distinct_id).or_default().extend(props);
    }

    /// Stop the runtime tasks. In-flight advances finish on their own.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Direct store access (admin surface and tests).
    pub fn store(&self) -> &Arc<JourneyStore> {
        &self.store
    }

    /// Fire every timer due at the current wall clock.
    pub async fn poll_timers(&self) {
        let due = self.scheduler.lock().due(self.clock.epoch_ms());
        for journey_id in due {
            if let Err(e) = self.advance_on_timer(journey_id).await {
                tracing::error!(journey = %journey_id, error = %e, "timer advance failed");
            }
        }
    }

    /// Wait until queued internal events and in-flight adapter tasks
    /// have drained. Test and shutdown aid.
    pub async fn settle(&self) {
        loop {
            while self.pending_work.load(Ordering::SeqCst) > 0 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            // One extra tick: the last pump iteration may queue
            // follow-on work right after the counter hits zero.
            tokio::task::yield_now().await;
            if self.pending_work.load(Ordering::SeqCst) == 0 {
                return;
            }
        }
    }

    /// Queue an engine-generated event for ingestion outside the
    /// current journey lock.
    pub(crate) fn enqueue_internal(&self, event: UserEvent) {
        self.pending_work.fetch_add(1, Ordering::SeqCst);
        if self.internal_tx.send(event).is_err() {
            // Engine shut down; the pump is gone.
            self.pending_work.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Begin tracking a unit of background work (spawned adapter task).
    pub(crate) fn begin_work(&self) {
        self.pending_work.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn end_work(&self) {
        self.pending_work.fetch_sub(1, Ordering::SeqCst);
    }

    /// Emit an internal analytics event through the analytics adapter.
    pub(crate) async fn emit(&self, distinct_id: DistinctId, event: TrackedEvent) {
        let record = AnalyticsRecord::from_tracked(&event, distinct_id, self.clock.epoch_ms());
        if let Err(e) = self.deps.analytics.track(record).await {
            tracing::warn!(event = event.name(), error = %e, "analytics emit failed");
        }
    }

    /// Evaluate a predicate for a user with an event's properties
    /// layered on top.
    pub(crate) fn eval_with_event(&self, predicate: &PredicateIr, event: &UserEvent) -> bool {
        let user_props = self
            .user_props
            .lock()
            .get(&event.distinct_id)
            .cloned()
            .unwrap_or_default();
        let log = self.event_log.lock().for_user(&event.distinct_id).to_vec();
        let snapshot = Snapshot::new().layer(&user_props).layer(&event.properties);
        let ctx = EvalContext::new(snapshot, &log, self.clock.epoch_ms());
        evaluate_predicate(predicate, &ctx)
    }

    /// Cloned user-property layer for snapshot building.
    pub(crate) fn user_props_for(&self, distinct_id: &DistinctId) -> Properties {
        self.user_props.lock().get(distinct_id).cloned().unwrap_or_default()
    }

    pub(crate) fn logged_events_for(&self, distinct_id: &DistinctId) -> Vec<nuxie_core::LoggedEvent> {
        self.event_log.lock().for_user(distinct_id).to_vec()
    }

    /// Arm (or disarm) the scheduler for a journey and nudge the timer
    /// task to re-evaluate its sleep.
    pub(crate) fn schedule(&self, journey_id: JourneyId, resume_at_ms: Option<u64>) {
        {
            let mut scheduler = self.scheduler.lock();
            match resume_at_ms {
                Some(at) => scheduler.arm(journey_id, at),
                None => scheduler.disarm(journey_id),
            }
        }
        self.timer_nudge.notify_one();
    }

    pub(crate) fn take_pending_resume(&self, journey_id: JourneyId) -> Option<PendingResume> {
        self.pending_resume.lock().remove(&journey_id)
    }

    pub(crate) fn deposit_pending_resume(&self, journey_id: JourneyId, pending: PendingResume) {
        self.pending_resume.lock().insert(journey_id, pending);
    }

    fn spawn_event_pump(&self, mut rx: mpsc::UnboundedReceiver<UserEvent>) {
        // The task holds only a weak handle so dropping the last
        // external Arc tears the engine down.
        let weak = self.weak.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = rx.recv() => {
                        let Some(event) = event else { break };
                        let Some(engine) = weak.upgrade() else { break };
                        engine.ingest(event).await;
                        engine.end_work();
                    }
                }
            }
        });
    }

    fn spawn_timer_task(&self) {
        let weak = self.weak.clone();
        let cancel = self.cancel.clone();
        let nudge = Arc::clone(&self.timer_nudge);
        tokio::spawn(async move {
            loop {
                let sleep_ms = {
                    let Some(engine) = weak.upgrade() else { break };
                    let scheduler = engine.scheduler.lock();
                    match scheduler.next_deadline() {
                        Some(deadline) => deadline.saturating_sub(engine.clock.epoch_ms()).max(10),
                        // Nothing armed: sleep until nudged.
                        None => 60_000,
                    }
                };
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = nudge.notified() => continue,
                    _ = tokio::time::sleep(Duration::from_millis(sleep_ms)) => {
                        let Some(engine) = weak.upgrade() else { break };
                        engine.poll_timers().await;
                    }
                }
            }
        });
    }
}

impl<F, D, P, U, A, R, C> Drop for Engine<F, D, P, U, A, R, C>
where
    F: FlowAdapter,
    D: DelegateAdapter,
    P: PurchaseAdapter,
    U: CustomerUpdateAdapter,
    A: AnalyticsAdapter,
    R: RemoteActionAdapter,
    C: Clock,
{
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[path = "../runtime_tests.rs"]
mod tests;
