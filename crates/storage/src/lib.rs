// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! nuxie-storage: the durable journey store.
//!
//! One JSON blob per journey plus a manifest index, written with
//! write-new-then-rename so a crash mid-save never corrupts the
//! previous record. The manifest is derivable state: when missing or
//! unreadable it is rebuilt by scanning the blobs.

mod store;

pub use store::{JourneyStore, JourneySummary, StoreError};
