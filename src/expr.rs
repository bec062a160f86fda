//! Prefix-form expression language used by WHERE and SET clauses.
//!
//! ```text
//! (= (get a "word") "documentation")
//! (assoc d "word" (+ (get a "word") (get b "word")))
//! (in (get a "tag") ["NN" "NNS"])
//! ```
//!
//! Expressions read and write attribute maps through a [`Namespace`]. Runtime
//! failures come back as [`EvalError`]; callers decide whether to treat them as
//! a false predicate or a skipped mutation.

use std::collections::BTreeMap;

use ahash::AHashSet;
use thiserror::Error;

use crate::attributes::AttributeValue;

mod eval;
mod namespace;
mod parser;

pub use eval::Value;
pub use namespace::{EntityKind, Namespace};
pub use parser::parse_script;

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(AttributeValue),
    Symbol(String),
    List(Vec<Expr>),
    Call { op: String, args: Vec<Expr> },
}

/// Errors raised while evaluating an expression.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("unbound name '{name}'")]
    UnboundName { name: String },

    #[error("'{name}' has no attribute '{key}'")]
    MissingKey { name: String, key: String },

    #[error("type error: {message}")]
    TypeMismatch { message: String },

    #[error("'{op}' expects {expected} argument(s), got {got}")]
    Arity {
        op: String,
        expected: &'static str,
        got: usize,
    },

    #[error("unknown operator '{op}'")]
    UnknownOperator { op: String },

    #[error("the identity of '{name}' cannot be reassigned")]
    IdentityKey { name: String },
}

impl EvalError {
    pub fn unbound_name(name: impl Into<String>) -> Self {
        Self::UnboundName { name: name.into() }
    }

    pub fn missing_key(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingKey {
            name: name.into(),
            key: key.into(),
        }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch {
            message: message.into(),
        }
    }

    pub fn arity(op: impl Into<String>, expected: &'static str, got: usize) -> Self {
        Self::Arity {
            op: op.into(),
            expected,
            got,
        }
    }
}

pub type EvalResult<T> = Result<T, EvalError>;

impl Expr {
    /// Renames entity references (`get`/`assoc` targets and bare symbols).
    pub fn remap(&self, aliases: &BTreeMap<String, String>) -> Expr {
        match self {
            Expr::Literal(value) => Expr::Literal(value.clone()),
            Expr::Symbol(name) => Expr::Symbol(aliases.get(name).unwrap_or(name).clone()),
            Expr::List(items) => Expr::List(items.iter().map(|e| e.remap(aliases)).collect()),
            Expr::Call { op, args } => Expr::Call {
                op: op.clone(),
                args: args.iter().map(|e| e.remap(aliases)).collect(),
            },
        }
    }

    fn collect_names<'a>(&'a self, out: &mut AHashSet<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Symbol(name) => {
                out.insert(name);
            }
            Expr::List(items) | Expr::Call { args: items, .. } => {
                for item in items {
                    item.collect_names(out);
                }
            }
        }
    }
}

/// A sequence of top-level expressions combined with short-circuit AND.
/// An empty script evaluates to true.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Script {
    exprs: Vec<Expr>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_exprs(exprs: Vec<Expr>) -> Self {
        Self { exprs }
    }

    /// Appends every expression of `other`, as a further WHERE clause does.
    pub fn extend(&mut self, other: &Script) {
        self.exprs.extend(other.exprs.iter().cloned());
    }

    pub fn exprs(&self) -> &[Expr] {
        &self.exprs
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// One-shot alias remap applied before execution.
    pub fn remap(&self, aliases: &BTreeMap<String, String>) -> Script {
        if aliases.is_empty() {
            return self.clone();
        }
        Script {
            exprs: self.exprs.iter().map(|e| e.remap(aliases)).collect(),
        }
    }

    /// Every name the script refers to as an entity.
    pub fn referenced_names(&self) -> AHashSet<&str> {
        let mut names = AHashSet::new();
        for expr in &self.exprs {
            expr.collect_names(&mut names);
        }
        names
    }
}
