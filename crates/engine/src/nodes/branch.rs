// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Branch node: `next[0]` on true, `next[1]` on false.

use super::{ExecCtx, NodeOutcome};
use nuxie_core::{evaluate, IrValue, PredicateIr};

pub(super) fn execute(ctx: &ExecCtx<'_>, condition: &PredicateIr) -> NodeOutcome {
    let taken = match evaluate(&condition.root, &ctx.eval_ctx()) {
        Ok(IrValue::Bool(b)) => b,
        Ok(other) => {
            tracing::warn!(
                journey = %ctx.journey.id,
                node = %ctx.node.id,
                result = other.type_name(),
                "branch condition evaluated to non-bool, taking false path"
            );
            false
        }
        // Documented default: evaluation errors take the false path.
        Err(e) => {
            tracing::warn!(
                journey = %ctx.journey.id,
                node = %ctx.node.id,
                error = %e,
                "branch condition failed to evaluate, taking false path"
            );
            false
        }
    };

    let next = if taken { ctx.node.next[0] } else { ctx.node.next[1] };
    NodeOutcome::advance(next)
}

#[cfg(test)]
#[path = "branch_tests.rs"]
mod tests;
