// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Purchase/restore adapter.
//!
//! The platform layer drives the store transaction; the engine awaits
//! the outcome in a detached task and surfaces it as an internal event
//! (`$purchase_completed` / `$purchase_failed` / …) so purchase nodes
//! can wait on it without holding the journey lock.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the purchase platform itself (not a declined purchase —
/// that is an outcome).
#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("product not found: {0}")]
    ProductNotFound(String),
    #[error("purchase platform unavailable: {0}")]
    Unavailable(String),
}

/// Terminal result of a purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Completed,
    /// User cancelled or the store declined.
    Failed { reason: String },
}

/// Terminal result of a restore attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Completed,
    Failed { reason: String },
}

/// Adapter for store purchases and restores.
#[async_trait]
pub trait PurchaseAdapter: Clone + Send + Sync + 'static {
    async fn purchase(&self, product_id: &str) -> Result<PurchaseOutcome, PurchaseError>;
    async fn restore(&self) -> Result<RestoreOutcome, PurchaseError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    struct FakePurchaseState {
        purchases: Vec<String>,
        restores: usize,
        scripted_purchases: VecDeque<Result<PurchaseOutcome, PurchaseError>>,
        scripted_restores: VecDeque<Result<RestoreOutcome, PurchaseError>>,
    }

    /// Fake purchase adapter with scripted outcomes. Unscripted calls
    /// succeed.
    #[derive(Clone)]
    pub struct FakePurchaseAdapter {
        inner: Arc<Mutex<FakePurchaseState>>,
    }

    impl Default for FakePurchaseAdapter {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakePurchaseState {
                    purchases: Vec::new(),
                    restores: 0,
                    scripted_purchases: VecDeque::new(),
                    scripted_restores: VecDeque::new(),
                })),
            }
        }
    }

    impl FakePurchaseAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        /// Product ids of all purchase attempts.
        pub fn purchases(&self) -> Vec<String> {
            self.inner.lock().purchases.clone()
        }

        pub fn restores(&self) -> usize {
            self.inner.lock().restores
        }

        /// Queue an outcome for the next purchase call.
        pub fn script_purchase(&self, outcome: Result<PurchaseOutcome, PurchaseError>) {
            self.inner.lock().scripted_purchases.push_back(outcome);
        }

        /// Queue an outcome for the next restore call.
        pub fn script_restore(&self, outcome: Result<RestoreOutcome, PurchaseError>) {
            self.inner.lock().scripted_restores.push_back(outcome);
        }
    }

    #[async_trait]
    impl PurchaseAdapter for FakePurchaseAdapter {
        async fn purchase(&self, product_id: &str) -> Result<PurchaseOutcome, PurchaseError> {
            let mut state = self.inner.lock();
            state.purchases.push(product_id.to_string());
            state
                .scripted_purchases
                .pop_front()
                .unwrap_or(Ok(PurchaseOutcome::Completed))
        }

        async fn restore(&self) -> Result<RestoreOutcome, PurchaseError> {
            let mut state = self.inner.lock();
            state.restores += 1;
            state
                .scripted_restores
                .pop_front()
                .unwrap_or(Ok(RestoreOutcome::Completed))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakePurchaseAdapter;

#[cfg(test)]
#[path = "purchase_tests.rs"]
mod tests;
