// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration. Static at construction; no dynamic config.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration surface for [`crate::Engine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root directory for journey persistence.
    pub storage_path: PathBuf,
    /// Cap on concurrently running advances across all journeys.
    pub max_concurrent_advance: usize,
    /// Budget for the flow adapter to take over presentation.
    pub flow_load_timeout: Duration,
    /// Budget for a purchase/restore round-trip before it is failed.
    pub purchase_timeout: Duration,
    /// Per-user cap on the in-memory event log consulted by
    /// aggregation predicates.
    pub event_log_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            max_concurrent_advance: 8,
            flow_load_timeout: Duration::from_secs(10),
            purchase_timeout: Duration::from_secs(60),
            event_log_capacity: 256,
        }
    }
}

impl EngineConfig {
    nuxie_core::setters! {
        into {
            storage_path: PathBuf,
        }
        set {
            max_concurrent_advance: usize,
            flow_load_timeout: Duration,
            purchase_timeout: Duration,
            event_log_capacity: usize,
        }
    }
}

fn default_storage_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nuxie")
}
