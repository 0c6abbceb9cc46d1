// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow presentation adapter.
//!
//! The engine asks the platform layer to present a remotely defined UI
//! flow (e.g. a paywall). Presentation is fire-and-forget from the
//! journey's point of view; outcomes come back as [`FlowSignal`]s on
//! the channel handed to `present_flow` and the engine folds them into
//! its event stream.

use async_trait::async_trait;
use nuxie_core::{CampaignId, JourneyId, Properties};
use smol_str::SmolStr;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from flow presentation.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("flow not found: {0}")]
    NotFound(SmolStr),
    #[error("flow load failed: {0}")]
    LoadFailed(String),
    #[error("flow load timed out")]
    Timeout,
}

/// Everything the platform layer needs to render a flow.
#[derive(Debug, Clone)]
pub struct FlowRequest {
    pub flow_id: SmolStr,
    pub journey_id: JourneyId,
    pub campaign_id: CampaignId,
    /// Node-declared presentation parameters.
    pub parameters: Properties,
    /// Snapshot of the journey context at presentation time.
    pub context: Properties,
}

/// Opaque handle to a presented flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowHandle {
    pub presentation_id: String,
}

/// Why a flow went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DismissReason {
    UserDismissed,
    Purchased,
    LoadError,
}

impl DismissReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DismissReason::UserDismissed => "user_dismissed",
            DismissReason::Purchased => "purchased",
            DismissReason::LoadError => "load_error",
        }
    }
}

/// Semantic callbacks from the web runtime. The wire protocol
/// (`runtime/*`, `action/*` messages) is the platform adapter's
/// concern; the engine only sees these.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowSignal {
    Dismissed {
        journey_id: JourneyId,
        flow_id: SmolStr,
        reason: DismissReason,
    },
    Action {
        journey_id: JourneyId,
        flow_id: SmolStr,
        kind: SmolStr,
        payload: serde_json::Value,
    },
    Purchased {
        journey_id: JourneyId,
        flow_id: SmolStr,
        product_id: String,
    },
}

/// Adapter for presenting flows.
#[async_trait]
pub trait FlowAdapter: Clone + Send + Sync + 'static {
    /// Present a flow. Returns once presentation has been handed to the
    /// platform (not once the flow completes); subsequent outcomes
    /// arrive on `signals`.
    async fn present_flow(
        &self,
        request: FlowRequest,
        signals: mpsc::Sender<FlowSignal>,
    ) -> Result<FlowHandle, FlowError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct FakeFlowState {
        requests: Vec<FlowRequest>,
        signals: Vec<mpsc::Sender<FlowSignal>>,
        fail_next: bool,
    }

    /// Fake flow adapter: records requests and lets tests emit signals
    /// as if the web runtime produced them.
    #[derive(Clone)]
    pub struct FakeFlowAdapter {
        inner: Arc<Mutex<FakeFlowState>>,
    }

    impl Default for FakeFlowAdapter {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeFlowState {
                    requests: Vec::new(),
                    signals: Vec::new(),
                    fail_next: false,
                })),
            }
        }
    }

    impl FakeFlowAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        /// All recorded presentation requests.
        pub fn requests(&self) -> Vec<FlowRequest> {
            self.inner.lock().requests.clone()
        }

        /// Make the next `present_flow` fail with a load error.
        pub fn fail_next(&self) {
            self.inner.lock().fail_next = true;
        }

        /// Emit a signal on the channel captured by the most recent
        /// presentation.
        pub async fn send_signal(&self, signal: FlowSignal) {
            let sender = self.inner.lock().signals.last().cloned();
            if let Some(sender) = sender {
                let _ = sender.send(signal).await;
            }
        }
    }

    #[async_trait]
    impl FlowAdapter for FakeFlowAdapter {
        async fn present_flow(
            &self,
            request: FlowRequest,
            signals: mpsc::Sender<FlowSignal>,
        ) -> Result<FlowHandle, FlowError> {
            let mut state = self.inner.lock();
            if state.fail_next {
                state.fail_next = false;
                return Err(FlowError::LoadFailed("fake load failure".into()));
            }
            let presentation_id = format!("pres-{}", state.requests.len());
            state.requests.push(request);
            state.signals.push(signals);
            Ok(FlowHandle { presentation_id })
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeFlowAdapter;

#[cfg(test)]
#[path = "flow_tests.rs"]
mod tests;
