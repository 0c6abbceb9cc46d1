// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host delegate adapter: fire-and-forget notifications to the
//! embedding app.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from delegate calls.
#[derive(Debug, Error)]
pub enum DelegateError {
    #[error("delegate unavailable: {0}")]
    Unavailable(String),
}

/// Adapter for posting messages to the host delegate channel.
#[async_trait]
pub trait DelegateAdapter: Clone + Send + Sync + 'static {
    async fn call_delegate(
        &self,
        message: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<(), DelegateError>;
}

/// Default delegate that only logs. Hosts that never register a
/// delegate still get visibility into what campaigns asked for.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingDelegateAdapter;

#[async_trait]
impl DelegateAdapter for LoggingDelegateAdapter {
    async fn call_delegate(
        &self,
        message: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<(), DelegateError> {
        tracing::info!(message, payload = ?payload, "delegate call (no delegate registered)");
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Recorded delegate call.
    #[derive(Debug, Clone, PartialEq)]
    pub struct DelegateCall {
        pub message: String,
        pub payload: Option<serde_json::Value>,
    }

    /// Fake delegate adapter for testing.
    #[derive(Clone, Default)]
    pub struct FakeDelegateAdapter {
        calls: Arc<Mutex<Vec<DelegateCall>>>,
    }

    impl FakeDelegateAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        /// Get all recorded calls.
        pub fn calls(&self) -> Vec<DelegateCall> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl DelegateAdapter for FakeDelegateAdapter {
        async fn call_delegate(
            &self,
            message: &str,
            payload: Option<&serde_json::Value>,
        ) -> Result<(), DelegateError> {
            self.calls.lock().push(DelegateCall {
                message: message.to_string(),
                payload: payload.cloned(),
            });
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{DelegateCall, FakeDelegateAdapter};
