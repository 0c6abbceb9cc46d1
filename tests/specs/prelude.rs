// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared spec harness: an engine over fakes and a temp store.

use nuxie_adapters::{
    FakeAnalyticsAdapter, FakeCustomerAdapter, FakeDelegateAdapter, FakeFlowAdapter,
    FakePurchaseAdapter, FakeRemoteActionAdapter,
};
use nuxie_core::{Clock, FakeClock, UserEvent};
use nuxie_engine::{Engine, EngineConfig, EngineDeps};
use std::path::Path;
use std::sync::Arc;

pub type SpecEngine = Arc<
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

pub struct Harness {
    pub engine: SpecEngine,
    pub clock: FakeClock,
    pub flows: FakeFlowAdapter,
    pub analytics: FakeAnalyticsAdapter,
    pub purchases: FakePurchaseAdapter,
    pub dir: Option<tempfile::TempDir>,
}

pub fn harness() -> Harness {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let mut harness = harness_at(dir.path());
    harness.dir = Some(dir);
    harness
}

/// Build over an existing storage directory (restart scenarios).
pub fn harness_at(path: &Path) -> Harness {
    let clock = FakeClock::new();
    let flows = FakeFlowAdapter::new();
    let analytics = FakeAnalyticsAdapter::new();
    let purchases = FakePurchaseAdapter::new();
    let deps = EngineDeps {
        flows: flows.clone(),
        delegate: FakeDelegateAdapter::new(),
        purchases: purchases.clone(),
        customer: FakeCustomerAdapter::new(),
        analytics: analytics.clone(),
        remote: FakeRemoteActionAdapter::new(),
    };
    let engine = Engine::new(
        deps,
        EngineConfig::default().storage_path(path.to_path_buf()),
        clock.clone(),
    )
    .expect("engine must open");

    Harness { engine, clock, flows, analytics, purchases, dir: None }
}

impl Harness {
    pub fn now(&self) -> u64 {
        self.clock.epoch_ms()
    }

    pub fn event(&self, name: &str, user: &str) -> UserEvent {
        UserEvent::new(name, user, self.now())
    }

    pub fn register(&self, campaign: serde_json::Value) {
        let def = serde_json::from_value(campaign).expect("campaign json");
        self.engine.register_campaign(def).expect("campaign compiles");
    }

    /// Node ids executed so far, from `$journey_node_executed` records.
    pub fn executed_path(&self) -> Vec<String> {
        self.analytics
            .with_name("$journey_node_executed")
            .iter()
            .filter_map(|r| {
                r.properties.get("node_id").and_then(|v| v.as_str()).map(String::from)
            })
            .collect()
    }
}

pub fn campaign(
    id: &str,
    trigger: &str,
    policy: &str,
    entry: &str,
    workflow: serde_json::Value,
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
