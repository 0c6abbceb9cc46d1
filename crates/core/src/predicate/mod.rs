// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server-compiled predicate IR and its evaluator.
//!
//! The dashboard compiles audience/branch formulas into a small
//! expression tree shipped inside the campaign wire format. Evaluation
//! is pure: a function of the expression and an [`EvalContext`].

mod eval;

pub use eval::{evaluate, evaluate_predicate, EvalError};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

fn default_version() -> u32 {
    1
}

/// A versioned predicate as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateIr {
    #[serde(default = "default_version")]
    pub version: u32,
    pub root: IrExpr,
}

impl PredicateIr {
    pub fn new(root: IrExpr) -> Self {
        Self { version: 1, root }
    }
}

/// One node of the expression tree, discriminated by `op`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum IrExpr {
    Bool {
        value: bool,
    },
    Number {
        value: f64,
    },
    #[serde(rename = "string")]
    Str {
        value: String,
    },
    /// Dotted-path reference into the typed context.
    Var {
        path: String,
    },
    Compare {
        cmp: CmpOp,
        left: Box<IrExpr>,
        right: Box<IrExpr>,
    },
    And {
        exprs: Vec<IrExpr>,
    },
    Or {
        exprs: Vec<IrExpr>,
    },
    Not {
        expr: Box<IrExpr>,
    },
    /// Existence check; missing paths are `false`, never an error.
    Has {
        path: String,
    },
    /// Set membership: `item` against a literal set.
    In {
        item: Box<IrExpr>,
        set: Vec<IrExpr>,
    },
    /// Count of events named `event` ingested within the trailing
    /// window, optionally filtered by a predicate over each event's
    /// properties.
    EventCount {
        event: SmolStr,
        within_seconds: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        matching: Option<Box<IrExpr>>,
    },
}

/// Comparison operators, spelled on the wire as the operator itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

crate::simple_display! {
    CmpOp {
        Eq => "==",
        Ne => "!=",
        Lt => "<",
        Le => "<=",
        Gt => ">",
        Ge => ">=",
    }
}

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum IrValue {
    Bool(bool),
    Number(f64),
    Str(String),
    Null,
}

impl IrValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            IrValue::Bool(_) => "bool",
            IrValue::Number(_) => "number",
            IrValue::Str(_) => "string",
            IrValue::Null => "null",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            IrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}
