// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The predicate evaluator. Pure over an [`EvalContext`]; no I/O, no
//! context mutation.

use super::{CmpOp, IrExpr, IrValue, PredicateIr};
use crate::context::{EvalContext, Snapshot};
use serde_json::Value;
use thiserror::Error;

/// Evaluation failure. Callers choose a local default (branch nodes
/// take the false path, wait conditions stay unsatisfied).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("missing variable: {path}")]
    MissingVariable { path: String },
    #[error("type mismatch for {op}: {left} vs {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("unsupported value at {path}: {kind}")]
    UnsupportedValue { path: String, kind: &'static str },
}

/// Evaluate an expression to a tagged value.
pub fn evaluate(expr: &IrExpr, ctx: &EvalContext<'_>) -> Result<IrValue, EvalError> {
    match expr {
        IrExpr::Bool { value } => Ok(IrValue::Bool(*value)),
        IrExpr::Number { value } => Ok(IrValue::Number(*value)),
        IrExpr::Str { value } => Ok(IrValue::Str(value.clone())),

        IrExpr::Var { path } => {
            let value = ctx
                .vars
                .lookup(path)
                .ok_or_else(|| EvalError::MissingVariable { path: path.clone() })?;
            json_to_ir(path, value)
        }

        IrExpr::Compare { cmp, left, right } => {
            let left = evaluate(left, ctx)?;
            let right = evaluate(right, ctx)?;
            compare(*cmp, &left, &right).map(IrValue::Bool)
        }

        IrExpr::And { exprs } => {
            for expr in exprs {
                if !truthy("and", &evaluate(expr, ctx)?)? {
                    return Ok(IrValue::Bool(false));
                }
            }
            Ok(IrValue::Bool(true))
        }

        IrExpr::Or { exprs } => {
            for expr in exprs {
                if truthy("or", &evaluate(expr, ctx)?)? {
                    return Ok(IrValue::Bool(true));
                }
            }
            Ok(IrValue::Bool(false))
        }

        IrExpr::Not { expr } => {
            let value = evaluate(expr, ctx)?;
            Ok(IrValue::Bool(!truthy("not", &value)?))
        }

        IrExpr::Has { path } => Ok(IrValue::Bool(ctx.vars.contains(path))),

        IrExpr::In { item, set } => {
            let item = evaluate(item, ctx)?;
            for candidate in set {
                let candidate = evaluate(candidate, ctx)?;
                if compare(CmpOp::Eq, &item, &candidate)? {
                    return Ok(IrValue::Bool(true));
                }
            }
            Ok(IrValue::Bool(false))
        }

        IrExpr::EventCount { event, within_seconds, matching } => {
            let window_start = ctx.now_ms.saturating_sub(within_seconds.saturating_mul(1000));
            let mut count = 0u64;
            for logged in ctx.events {
                if logged.name != *event || logged.timestamp_ms < window_start {
                    continue;
                }
                let matches = match matching {
                    None => true,
                    Some(predicate) => {
                        // Event filters see the candidate event's
                        // properties only; history-of-history is not a
                        // thing the IR can express.
                        let event_ctx = EvalContext::new(
                            Snapshot::new().layer(&logged.properties),
                            &[],
                            ctx.now_ms,
                        );
                        truthy("event_count", &evaluate(predicate, &event_ctx)?)?
                    }
                };
                if matches {
                    count += 1;
                }
            }
            Ok(IrValue::Number(count as f64))
        }
    }
}

/// Evaluate a predicate to a boolean.
///
/// Non-bool results coerce to `false` with a warning; evaluation errors
/// also yield `false` (the caller-facing default for branch/wait/trigger
/// consumers), logged at warn level.
pub fn evaluate_predicate(predicate: &PredicateIr, ctx: &EvalContext<'_>) -> bool {
    match evaluate(&predicate.root, ctx) {
        Ok(IrValue::Bool(b)) => b,
        Ok(other) => {
            tracing::warn!(
                result = other.type_name(),
                "predicate evaluated to non-bool, coercing to false"
            );
            false
        }
        Err(e) => {
            tracing::warn!(error = %e, "predicate evaluation failed, defaulting to false");
            false
        }
    }
}

fn json_to_ir(path: &str, value: &Value) -> Result<IrValue, EvalError> {
    match value {
        Value::Null => Ok(IrValue::Null),
        Value::Bool(b) => Ok(IrValue::Bool(*b)),
        Value::Number(n) => n
            .as_f64()
            .map(IrValue::Number)
            .ok_or(EvalError::UnsupportedValue { path: path.to_string(), kind: "number" }),
        Value::String(s) => Ok(IrValue::Str(s.clone())),
        Value::Array(_) => {
            Err(EvalError::UnsupportedValue { path: path.to_string(), kind: "array" })
        }
        Value::Object(_) => {
            Err(EvalError::UnsupportedValue { path: path.to_string(), kind: "object" })
        }
    }
}

fn truthy(op: &'static str, value: &IrValue) -> Result<bool, EvalError> {
    value.as_bool().ok_or(EvalError::TypeMismatch {
        op,
        left: value.type_name(),
        right: "bool",
    })
}

fn compare(op: CmpOp, left: &IrValue, right: &IrValue) -> Result<bool, EvalError> {
    use IrValue::*;
    let mismatch = || EvalError::TypeMismatch {
        op: cmp_name(op),
        left: left.type_name(),
        right: right.type_name(),
    };

    match op {
        CmpOp::Eq | CmpOp::Ne => {
            let eq = match (left, right) {
                (Bool(a), Bool(b)) => a == b,
                (Number(a), Number(b)) => a == b,
                (Str(a), Str(b)) => a == b,
                (Null, Null) => true,
                // Null never equals a typed value; that is a data shape,
                // not a type error.
                (Null, _) | (_, Null) => false,
                _ => return Err(mismatch()),
            };
            Ok(if op == CmpOp::Eq { eq } else { !eq })
        }
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            let ordering = match (left, right) {
                (Number(a), Number(b)) => a.partial_cmp(b).ok_or_else(mismatch)?,
                (Str(a), Str(b)) => a.cmp(b),
                _ => return Err(mismatch()),
            };
            Ok(match op {
                CmpOp::Lt => ordering.is_lt(),
                CmpOp::Le => ordering.is_le(),
                CmpOp::Gt => ordering.is_gt(),
                CmpOp::Ge => ordering.is_ge(),
                CmpOp::Eq | CmpOp::Ne => unreachable!("handled above"),
            })
        }
    }
}

fn cmp_name(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "==",
        CmpOp::Ne => "!=",
        CmpOp::Lt => "<",
        CmpOp::Le => "<=",
        CmpOp::Gt => ">",
        CmpOp::Ge => ">=",
    }
}

#[cfg(test)]
#[path = "eval_tests.rs"]
mod tests;
