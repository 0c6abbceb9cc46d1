// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! nuxie-adapters: outbound action contracts.
//!
//! Each module holds one adapter trait the engine calls through, its
//! error type, and (behind `test-support`) a recording fake. Platform
//! bindings (webview bridge, StoreKit/Billing, host delegate) implement
//! these traits outside this workspace.

pub mod analytics;
pub mod customer;
pub mod delegate;
pub mod flow;
pub mod purchase;
pub mod remote;

pub use analytics::{AnalyticsAdapter, AnalyticsError, AnalyticsRecord, LoggingAnalyticsAdapter};
pub use customer::{CustomerError, CustomerUpdateAdapter};
pub use delegate::{DelegateAdapter, DelegateError, LoggingDelegateAdapter};
pub use flow::{DismissReason, FlowAdapter, FlowError, FlowHandle, FlowRequest, FlowSignal};
pub use purchase::{PurchaseAdapter, PurchaseError, PurchaseOutcome, RestoreOutcome};
pub use remote::{RemoteActionAdapter, RemoteActionError, RemoteActionResponse};

#[cfg(any(test, feature = "test-support"))]
pub use analytics::FakeAnalyticsAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use customer::FakeCustomerAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use delegate::{DelegateCall, FakeDelegateAdapter};
#[cfg(any(test, feature = "test-support"))]
pub use flow::FakeFlowAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use purchase::FakePurchaseAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use remote::FakeRemoteActionAdapter;
