//! Tree-walking evaluation of scripts against a namespace.

use std::cmp::Ordering;

use crate::attributes::AttributeValue;

use super::{EvalError, EvalResult, Expr, Namespace, Script};

/// Runtime value: an attribute scalar or a literal list (the right side of `in`).
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Scalar(AttributeValue),
    List(Vec<Value>),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Scalar(v) => v.is_truthy(),
            Value::List(items) => !items.is_empty(),
        }
    }

    fn boolean(b: bool) -> Self {
        Value::Scalar(AttributeValue::Bool(b))
    }

    fn into_scalar(self, op: &str) -> EvalResult<AttributeValue> {
        match self {
            Value::Scalar(v) => Ok(v),
            Value::List(_) => Err(EvalError::type_mismatch(format!(
                "'{op}' cannot take a list here"
            ))),
        }
    }
}

impl Script {
    /// Runs every expression in order, stopping at the first falsy result.
    pub fn evaluate(&self, namespace: &mut Namespace) -> EvalResult<Value> {
        let mut last = Value::boolean(true);
        for expr in self.exprs() {
            last = eval(expr, namespace)?;
            if !last.is_truthy() {
                return Ok(Value::boolean(false));
            }
        }
        Ok(last)
    }

    /// Predicate view of [`Script::evaluate`]: errors count as false.
    pub fn holds(&self, namespace: &mut Namespace) -> bool {
        match self.evaluate(namespace) {
            Ok(value) => value.is_truthy(),
            Err(err) => {
                tracing::debug!(error = %err, "predicate failed softly");
                false
            }
        }
    }
}

pub(crate) fn eval(expr: &Expr, ns: &mut Namespace) -> EvalResult<Value> {
    match expr {
        Expr::Literal(value) => Ok(Value::Scalar(value.clone())),
        Expr::Symbol(name) => {
            if ns.contains(name) {
                Err(EvalError::type_mismatch(format!(
                    "'{name}' is an entity, use (get {name} \"key\")"
                )))
            } else {
                Err(EvalError::unbound_name(name))
            }
        }
        Expr::List(items) => items
            .iter()
            .map(|item| eval(item, ns))
            .collect::<EvalResult<Vec<_>>>()
            .map(Value::List),
        Expr::Call { op, args } => call(op, args, ns),
    }
}

fn call(op: &str, args: &[Expr], ns: &mut Namespace) -> EvalResult<Value> {
    match op {
        "get" => {
            expect_arity(op, args, 2, "2")?;
            let name = entity_name(op, &args[0])?;
            let key = string_arg(op, &args[1], ns)?;
            Ok(Value::Scalar(ns.get(name, &key)?.clone()))
        }
        "assoc" => {
            expect_arity(op, args, 3, "3")?;
            let name = entity_name(op, &args[0])?;
            let key = string_arg(op, &args[1], ns)?;
            let value = eval(&args[2], ns)?.into_scalar(op)?;
            ns.assoc(name, &key, value.clone())?;
            Ok(Value::Scalar(value))
        }
        "+" => add(args, ns),
        "-" => subtract(args, ns),
        "=" => {
            if args.len() < 2 {
                return Err(EvalError::arity(op, "at least 2", args.len()));
            }
            let first = eval(&args[0], ns)?;
            for arg in &args[1..] {
                if eval(arg, ns)? != first {
                    return Ok(Value::boolean(false));
                }
            }
            Ok(Value::boolean(true))
        }
        "!=" | "not=" => {
            expect_arity(op, args, 2, "2")?;
            let left = eval(&args[0], ns)?;
            let right = eval(&args[1], ns)?;
            Ok(Value::boolean(left != right))
        }
        "in" => {
            expect_arity(op, args, 2, "2")?;
            let needle = eval(&args[0], ns)?;
            match eval(&args[1], ns)? {
                Value::List(items) => Ok(Value::boolean(items.contains(&needle))),
                Value::Scalar(AttributeValue::String(haystack)) => match needle {
                    Value::Scalar(AttributeValue::String(n)) => {
                        Ok(Value::boolean(haystack.contains(&n)))
                    }
                    _ => Err(EvalError::type_mismatch("'in' on a string needs a string")),
                },
                Value::Scalar(other) => Err(EvalError::type_mismatch(format!(
                    "'in' cannot search a {}",
                    other.type_name()
                ))),
            }
        }
        "and" => {
            let mut last = Value::boolean(true);
            for arg in args {
                last = eval(arg, ns)?;
                if !last.is_truthy() {
                    break;
                }
            }
            Ok(last)
        }
        "or" => {
            let mut last = Value::boolean(false);
            for arg in args {
                last = eval(arg, ns)?;
                if last.is_truthy() {
                    break;
                }
            }
            Ok(last)
        }
        "not" => {
            expect_arity(op, args, 1, "1")?;
            Ok(Value::boolean(!eval(&args[0], ns)?.is_truthy()))
        }
        "<" | "<=" | ">" | ">=" => {
            expect_arity(op, args, 2, "2")?;
            let left = eval(&args[0], ns)?.into_scalar(op)?;
            let right = eval(&args[1], ns)?.into_scalar(op)?;
            let ordering = compare(&left, &right)?;
            Ok(Value::boolean(match op {
                "<" => ordering == Ordering::Less,
                "<=" => ordering != Ordering::Greater,
                ">" => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        other => Err(EvalError::UnknownOperator {
            op: other.to_string(),
        }),
    }
}

fn expect_arity(op: &str, args: &[Expr], n: usize, expected: &'static str) -> EvalResult<()> {
    if args.len() == n {
        Ok(())
    } else {
        Err(EvalError::arity(op, expected, args.len()))
    }
}

fn entity_name<'e>(op: &str, expr: &'e Expr) -> EvalResult<&'e str> {
    match expr {
        Expr::Symbol(name) => Ok(name),
        _ => Err(EvalError::type_mismatch(format!(
            "'{op}' needs an entity name as its first argument"
        ))),
    }
}

fn string_arg(op: &str, expr: &Expr, ns: &mut Namespace) -> EvalResult<String> {
    match eval(expr, ns)? {
        Value::Scalar(AttributeValue::String(s)) => Ok(s),
        other => Err(EvalError::type_mismatch(format!(
            "'{op}' needs a string key, got {other:?}"
        ))),
    }
}

fn add(args: &[Expr], ns: &mut Namespace) -> EvalResult<Value> {
    if args.is_empty() {
        return Err(EvalError::arity("+", "at least 1", 0));
    }
    let values = args
        .iter()
        .map(|arg| eval(arg, ns).and_then(|v| v.into_scalar("+")))
        .collect::<EvalResult<Vec<_>>>()?;
    match &values[0] {
        AttributeValue::Number(_) => {
            let mut sum = 0.0;
            for value in &values {
                sum += value
                    .as_number()
                    .ok_or_else(|| mixed("+", &values[0], value))?;
            }
            Ok(Value::Scalar(AttributeValue::Number(sum)))
        }
        AttributeValue::String(_) => {
            let mut out = String::new();
            for value in &values {
                out.push_str(value.as_str().ok_or_else(|| mixed("+", &values[0], value))?);
            }
            Ok(Value::Scalar(AttributeValue::String(out)))
        }
        other => Err(EvalError::type_mismatch(format!(
            "'+' cannot add {} values",
            other.type_name()
        ))),
    }
}

fn subtract(args: &[Expr], ns: &mut Namespace) -> EvalResult<Value> {
    let numbers = args
        .iter()
        .map(|arg| {
            let value = eval(arg, ns)?.into_scalar("-")?;
            value.as_number().ok_or_else(|| {
                EvalError::type_mismatch(format!("'-' needs numbers, got {}", value.type_name()))
            })
        })
        .collect::<EvalResult<Vec<f64>>>()?;
    match numbers.as_slice() {
        [] => Err(EvalError::arity("-", "at least 1", 0)),
        [only] => Ok(Value::Scalar(AttributeValue::Number(-only))),
        [first, rest @ ..] => Ok(Value::Scalar(AttributeValue::Number(
            rest.iter().fold(*first, |acc, n| acc - n),
        ))),
    }
}

fn compare(left: &AttributeValue, right: &AttributeValue) -> EvalResult<Ordering> {
    match (left, right) {
        (AttributeValue::Number(a), AttributeValue::Number(b)) => a
            .partial_cmp(b)
            .ok_or_else(|| EvalError::type_mismatch("cannot order NaN")),
        (AttributeValue::String(a), AttributeValue::String(b)) => Ok(a.cmp(b)),
        _ => Err(EvalError::type_mismatch(format!(
            "cannot order {} against {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn mixed(op: &str, first: &AttributeValue, other: &AttributeValue) -> EvalError {
    EvalError::type_mismatch(format!(
        "'{op}' mixes {} and {}",
        first.type_name(),
        other.type_name()
    ))
}
