// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Customer-property write-through adapter.

use async_trait::async_trait;
use nuxie_core::{DistinctId, Properties};
use thiserror::Error;

/// Errors from property writes.
#[derive(Debug, Error)]
pub enum CustomerError {
    #[error("property write failed: {0}")]
    WriteFailed(String),
}

/// Adapter for writing customer attributes through the identity
/// service.
#[async_trait]
pub trait CustomerUpdateAdapter: Clone + Send + Sync + 'static {
    async fn update_properties(
        &self,
        distinct_id: &DistinctId,
        attributes: &Properties,
    ) -> Result<(), CustomerError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Fake customer adapter recording every write.
    #[derive(Clone, Default)]
    pub struct FakeCustomerAdapter {
        writes: Arc<Mutex<Vec<(DistinctId, Properties)>>>,
    }

    impl FakeCustomerAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn writes(&self) -> Vec<(DistinctId, Properties)> {
            self.writes.lock().clone()
        }
    }

    #[async_trait]
    impl CustomerUpdateAdapter for FakeCustomerAdapter {
        async fn update_properties(
            &self,
            distinct_id: &DistinctId,
            attributes: &Properties,
        ) -> Result<(), CustomerError> {
            self.writes.lock().push((distinct_id.clone(), attributes.clone()));
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeCustomerAdapter;
