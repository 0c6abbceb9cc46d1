// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote-action adapter (subflow extension).
//!
//! Remote-action nodes post the action plus the journey context to the
//! server; the response may carry context updates that merge back into
//! the journey. Transport (HTTP, batching, auth) is the implementor's
//! concern.

use async_trait::async_trait;
use nuxie_core::{CampaignId, JourneyId, Properties};
use thiserror::Error;

/// Errors from remote-action execution.
#[derive(Debug, Error)]
pub enum RemoteActionError {
    #[error("remote action failed: {0}")]
    Failed(String),
    #[error("remote action timed out")]
    Timeout,
}

/// Server response to a remote action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteActionResponse {
    /// Keys merged into the journey context on resume.
    pub context_updates: Properties,
}

/// Adapter for server-side actions.
#[async_trait]
pub trait RemoteActionAdapter: Clone + Send + Sync + 'static {
    async fn perform(
        &self,
        action: &str,
        journey_id: JourneyId,
        campaign_id: CampaignId,
        context: &Properties,
    ) -> Result<RemoteActionResponse, RemoteActionError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    struct FakeRemoteState {
        performed: Vec<String>,
        scripted: VecDeque<Result<RemoteActionResponse, RemoteActionError>>,
    }

    /// Fake remote-action adapter with scripted responses. Unscripted
    /// calls return an empty response.
    #[derive(Clone)]
    pub struct FakeRemoteActionAdapter {
        inner: Arc<Mutex<FakeRemoteState>>,
    }

    impl Default for FakeRemoteActionAdapter {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeRemoteState {
                    performed: Vec::new(),
                    scripted: VecDeque::new(),
                })),
            }
        }
    }

    impl FakeRemoteActionAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn performed(&self) -> Vec<String> {
            self.inner.lock().performed.clone()
        }

        pub fn script(&self, response: Result<RemoteActionResponse, RemoteActionError>) {
            self.inner.lock().scripted.push_back(response);
        }
    }

    #[async_trait]
    impl RemoteActionAdapter for FakeRemoteActionAdapter {
        async fn perform(
            &self,
            action: &str,
            _journey_id: JourneyId,
            _campaign_id: CampaignId,
            _context: &Properties,
        ) -> Result<RemoteActionResponse, RemoteActionError> {
            let mut state = self.inner.lock();
            state.performed.push(action.to_string());
            state.scripted.pop_front().unwrap_or(Ok(RemoteActionResponse::default()))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeRemoteActionAdapter;
