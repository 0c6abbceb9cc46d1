// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for engine tests: an [`Engine`] wired to fakes, a
//! pinned clock, and a temp store.

use crate::config::EngineConfig;
use crate::runtime::{Engine, EngineDeps};
use nuxie_adapters::{
    FakeAnalyticsAdapter, FakeCustomerAdapter, FakeDelegateAdapter, FakeFlowAdapter,
    FakePurchaseAdapter, FakeRemoteActionAdapter,
};
use nuxie_core::{FakeClock, UserEvent};
use std::path::Path;
use std::sync::Arc;

pub(crate) type TestEngine = Arc<
    Engine<
        FakeFlowAdapter,
        FakeDelegateAdapter,
        FakePurchaseAdapter,
        FakeCustomerAdapter,
        FakeAnalyticsAdapter,
        FakeRemoteActionAdapter,
        FakeClock,
    >,
>;

pub(crate) struct TestContext {
    pub engine: TestEngine,
    pub clock: FakeClock,
    pub flows: FakeFlowAdapter,
    pub delegate: FakeDelegateAdapter,
    pub purchases: FakePurchaseAdapter,
    pub customer: FakeCustomerAdapter,
    pub analytics: FakeAnalyticsAdapter,
    pub remote: FakeRemoteActionAdapter,
    /// Kept alive so the store directory outlives the engine.
    pub dir: Option<tempfile::TempDir>,
}

/// Engine over a fresh temp store. Must run inside a tokio runtime.
pub(crate) fn setup() -> TestContext {
    let dir = tempfile::TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let mut ctx = setup_at(dir.path());
    ctx.dir = Some(dir);
    ctx
}

/// Engine over an existing store directory (restart simulations).
pub(crate) fn setup_at(path: &Path) -> TestContext {
    let clock = FakeClock::new();
    let flows = FakeFlowAdapter::new();
    let delegate = FakeDelegateAdapter::new();
    let purchases = FakePurchaseAdapter::new();
    let customer = FakeCustomerAdapter::new();
    let analytics = FakeAnalyticsAdapter::new();
    let remote = FakeRemoteActionAdapter::new();

    let deps = EngineDeps {
        flows: flows.clone(),
        delegate: delegate.clone(),
        purchases: purchases.clone(),
        customer: customer.clone(),
        analytics: analytics.clone(),
        remote: remote.clone(),
    };
    let config = EngineConfig::default().storage_path(path.to_path_buf());
    let engine = Engine::new(deps, config, clock.clone())
        .unwrap_or_else(|e| panic!("engine must open: {e}"));

    TestContext {
        engine,
        clock,
        flows,
        delegate,
        purchases,
        customer,
        analytics,
        remote,
        dir: None,
    }
}

impl TestContext {
    pub(crate) fn now(&self) -> u64 {
        use nuxie_core::Clock;
        self.clock.epoch_ms()
    }

    pub(crate) fn event(&self, name: &str, user: &str) -> UserEvent {
        UserEvent::new(name, user, self.now())
    }

    pub(crate) fn register(&self, campaign: serde_json::Value) {
        let def = serde_json::from_value(campaign)
            .unwrap_or_else(|e| panic!("campaign must parse: {e}"));
        self.engine
            .register_campaign(def)
            .unwrap_or_else(|e| panic!("campaign must compile: {e}"));
    }
}

/// Minimal campaign JSON with the given workflow and policy.
pub(crate) fn campaign_json(
    id: &str,
    trigger: &str,
    policy: &str,
    workflow: serde_json::Value,
    entry: &str,
) -> serde_json::Value {
    serde_json::json!({
        "campaign_id": id,
        "name": id,
        "version": 1,
        "published_at_ms": 0,
        "trigger": { "event": trigger },
        "entry_node_id": entry,
        "frequency_policy": policy,
        "workflow": workflow
    })
}
