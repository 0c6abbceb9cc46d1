// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-level errors.

use nuxie_campaign::WorkflowError;
use nuxie_core::{CampaignId, JourneyId};
use nuxie_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowError),
    #[error("campaign not registered: {0}")]
    CampaignNotFound(CampaignId),
    #[error("journey {journey}: unknown node {node}")]
    UnknownNode { journey: JourneyId, node: String },
    #[error("journey {journey}: advance exceeded {steps} steps without pausing")]
    RunawayAdvance { journey: JourneyId, steps: usize },
}
