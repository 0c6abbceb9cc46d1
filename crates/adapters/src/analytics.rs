// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Analytics emission adapter.
//!
//! The engine enriches every internal event with journey/campaign ids
//! before it reaches the adapter; batching, gzip, and retry live in the
//! transport layer behind the trait.

use async_trait::async_trait;
use nuxie_core::{DistinctId, Properties, TrackedEvent};
use smol_str::SmolStr;
use thiserror::Error;

/// Errors from analytics emission.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("emit failed: {0}")]
    EmitFailed(String),
}

/// One enriched analytics record.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsRecord {
    pub name: SmolStr,
    pub distinct_id: DistinctId,
    pub timestamp_ms: u64,
    pub properties: Properties,
}

impl AnalyticsRecord {
    /// Build a record from an internal tracked event.
    pub fn from_tracked(event: &TrackedEvent, distinct_id: DistinctId, timestamp_ms: u64) -> Self {
        Self {
            name: SmolStr::new(event.name()),
            distinct_id,
            timestamp_ms,
            properties: event.properties(),
        }
    }
}

/// Adapter for emitting analytics records.
#[async_trait]
pub trait AnalyticsAdapter: Clone + Send + Sync + 'static {
    async fn track(&self, record: AnalyticsRecord) -> Result<(), AnalyticsError>;
}

/// Analytics sink that only logs. Useful in development builds before a
/// transport is wired up.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingAnalyticsAdapter;

#[async_trait]
impl AnalyticsAdapter for LoggingAnalyticsAdapter {
    async fn track(&self, record: AnalyticsRecord) -> Result<(), AnalyticsError> {
        tracing::info!(
            event = %record.name,
            distinct_id = %record.distinct_id,
            ts = record.timestamp_ms,
            "analytics"
        );
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Fake analytics sink recording every emitted record.
    #[derive(Clone, Default)]
    pub struct FakeAnalyticsAdapter {
        records: Arc<Mutex<Vec<AnalyticsRecord>>>,
    }

    impl FakeAnalyticsAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn records(&self) -> Vec<AnalyticsRecord> {
            self.records.lock().clone()
        }

        /// Names of all emitted events, in order.
        pub fn names(&self) -> Vec<String> {
            self.records.lock().iter().map(|r| r.name.to_string()).collect()
        }

        /// Records with the given event name.
        pub fn with_name(&self, name: &str) -> Vec<AnalyticsRecord> {
            self.records.lock().iter().filter(|r| r.name == name).cloned().collect()
        }
    }

    #[async_trait]
    impl AnalyticsAdapter for FakeAnalyticsAdapter {
        async fn track(&self, record: AnalyticsRecord) -> Result<(), AnalyticsError> {
            self.records.lock().push(record);
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeAnalyticsAdapter;
