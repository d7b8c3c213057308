// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sandboxed evaluator for the restricted expression AST.
//!
//! Total on every in-grammar expression (spec §4.2, §8): evaluation always
//! produces either a [`Value`] or an [`EvalError`], never a panic. Division
//! by zero, an undefined identifier, and a type mismatch are all
//! `EvalError`s, not process-level failures — callers map these to
//! rule-level warnings (`rule_id` tagged `expression_error`, severity
//! `warn`) rather than aborting the request.

use crate::ast::{BinOp, Expr};
use crate::value::{Bindings, Value};
use thiserror::Error;

/// An evaluation failure. Always recoverable by the caller.
#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    /// An identifier path resolved to nothing in its namespace.
    #[error("undefined identifier: {0}")]
    UndefinedIdent(String),
    /// An operator or function received a value of the wrong type.
    #[error("type error: expected {expected}, found {found}")]
    TypeMismatch {
        /// The type the operation required.
        expected: &'static str,
        /// The type actually supplied.
        found: &'static str,
    },
    /// Division (or modulo) by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// Numeric result is not finite (overflow/NaN).
    #[error("numeric overflow")]
    Overflow,
    /// A function was called with the wrong number of arguments.
    #[error("function '{0}' expects {1} argument(s), got {2}")]
    ArityMismatch(&'static str, usize, usize),
    /// An invalid date string was passed to `dow`.
    #[error("invalid date string: {0}")]
    InvalidDate(String),
}

/// Evaluate `expr` against `bindings`, returning a value or a recoverable
/// [`EvalError`]. Never panics for a well-formed [`Expr`] tree.
pub fn eval(expr: &Expr, bindings: &Bindings) -> Result<Value, EvalError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::List(items) => {
            let values = items
                .iter()
                .map(|e| eval(e, bindings))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(values))
        }
        Expr::Ident(path) => eval_ident(path, bindings),
        Expr::Neg(inner) => {
            let v = eval(inner, bindings)?;
            Ok(Value::Number(-expect_number(&v)?))
        }
        Expr::Not(inner) => {
            let v = eval(inner, bindings)?;
            Ok(Value::Bool(!expect_bool(&v)?))
        }
        Expr::BinOp(op, lhs, rhs) => eval_binop(*op, lhs, rhs, bindings),
        Expr::Ternary(cond, then_branch, else_branch) => {
            let c = eval(cond, bindings)?;
            if expect_bool(&c)? {
                eval(then_branch, bindings)
            } else {
                eval(else_branch, bindings)
            }
        }
        Expr::Call(name, args) => eval_call(name, args, bindings),
    }
}

fn eval_ident(path: &[String], bindings: &Bindings) -> Result<Value, EvalError> {
    let ns = bindings.namespace(&path[0]);
    let field = path[1..].join(".");
    ns.get(&field)
        .cloned()
        .ok_or_else(|| EvalError::UndefinedIdent(path.join(".")))
}

fn expect_number(v: &Value) -> Result<f64, EvalError> {
    v.as_number().ok_or(EvalError::TypeMismatch {
        expected: "number",
        found: v.type_name(),
    })
}

fn expect_bool(v: &Value) -> Result<bool, EvalError> {
    v.as_bool().ok_or(EvalError::TypeMismatch {
        expected: "bool",
        found: v.type_name(),
    })
}

fn expect_list<'a>(v: &'a Value) -> Result<&'a [Value], EvalError> {
    match v {
        Value::List(items) => Ok(items),
        _ => Err(EvalError::TypeMismatch {
            expected: "list",
            found: v.type_name(),
        }),
    }
}

fn checked_number(n: f64) -> Result<Value, EvalError> {
    if n.is_finite() {
        Ok(Value::Number(n))
    } else {
        Err(EvalError::Overflow)
    }
}

fn eval_binop(op: BinOp, lhs: &Expr, rhs: &Expr, bindings: &Bindings) -> Result<Value, EvalError> {
    // Short-circuit boolean operators before evaluating the right side.
    if op == BinOp::And {
        let l = expect_bool(&eval(lhs, bindings)?)?;
        if !l {
            return Ok(Value::Bool(false));
        }
        return Ok(Value::Bool(expect_bool(&eval(rhs, bindings)?)?));
    }
    if op == BinOp::Or {
        let l = expect_bool(&eval(lhs, bindings)?)?;
        if l {
            return Ok(Value::Bool(true));
        }
        return Ok(Value::Bool(expect_bool(&eval(rhs, bindings)?)?));
    }

    let l = eval(lhs, bindings)?;
    let r = eval(rhs, bindings)?;

    match op {
        BinOp::Add => checked_number(expect_number(&l)? + expect_number(&r)?),
        BinOp::Sub => checked_number(expect_number(&l)? - expect_number(&r)?),
        BinOp::Mul => checked_number(expect_number(&l)? * expect_number(&r)?),
        BinOp::Div => {
            let divisor = expect_number(&r)?;
            if divisor == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            checked_number(expect_number(&l)? / divisor)
        }
        BinOp::Mod => {
            let divisor = expect_number(&r)?;
            if divisor == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            checked_number(expect_number(&l)? % divisor)
        }
        BinOp::Eq => Ok(Value::Bool(values_equal(&l, &r))),
        BinOp::Ne => Ok(Value::Bool(!values_equal(&l, &r))),
        BinOp::Lt => Ok(Value::Bool(compare_numbers(&l, &r)? == std::cmp::Ordering::Less)),
        BinOp::Le => Ok(Value::Bool(compare_numbers(&l, &r)? != std::cmp::Ordering::Greater)),
        BinOp::Gt => Ok(Value::Bool(compare_numbers(&l, &r)? == std::cmp::Ordering::Greater)),
        BinOp::Ge => Ok(Value::Bool(compare_numbers(&l, &r)? != std::cmp::Ordering::Less)),
        BinOp::In => Ok(Value::Bool(
            expect_list(&r)?.iter().any(|item| values_equal(&l, item)),
        )),
        BinOp::NotIn => Ok(Value::Bool(
            !expect_list(&r)?.iter().any(|item| values_equal(&l, item)),
        )),
        BinOp::And | BinOp::Or => unreachable!("handled above with short-circuit"),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::List(x), Value::List(y)) => x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b)),
        _ => false,
    }
}

fn compare_numbers(a: &Value, b: &Value) -> Result<std::cmp::Ordering, EvalError> {
    let (x, y) = (expect_number(a)?, expect_number(b)?);
    x.partial_cmp(&y).ok_or(EvalError::Overflow)
}

fn eval_call(name: &str, args: &[Expr], bindings: &Bindings) -> Result<Value, EvalError> {
    match name {
        "sum" => {
            let list = eval_single_list_arg(name, args, bindings)?;
            let total: f64 = list
                .iter()
                .map(expect_number)
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .sum();
            checked_number(total)
        }
        "count" => {
            let list = eval_single_list_arg(name, args, bindings)?;
            Ok(Value::Number(list.len() as f64))
        }
        "min" => {
            let list = eval_single_list_arg(name, args, bindings)?;
            let nums = list
                .iter()
                .map(expect_number)
                .collect::<Result<Vec<_>, _>>()?;
            nums.into_iter()
                .fold(None, |acc: Option<f64>, n| Some(acc.map_or(n, |a| a.min(n))))
                .map(Value::Number)
                .ok_or(EvalError::TypeMismatch {
                    expected: "non-empty list",
                    found: "empty list",
                })
        }
        "max" => {
            let list = eval_single_list_arg(name, args, bindings)?;
            let nums = list
                .iter()
                .map(expect_number)
                .collect::<Result<Vec<_>, _>>()?;
            nums.into_iter()
                .fold(None, |acc: Option<f64>, n| Some(acc.map_or(n, |a| a.max(n))))
                .map(Value::Number)
                .ok_or(EvalError::TypeMismatch {
                    expected: "non-empty list",
                    found: "empty list",
                })
        }
        "any" => {
            let list = eval_single_list_arg(name, args, bindings)?;
            let bools = list.iter().map(expect_bool).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Bool(bools.iter().any(|b| *b)))
        }
        "all" => {
            let list = eval_single_list_arg(name, args, bindings)?;
            let bools = list.iter().map(expect_bool).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Bool(bools.iter().all(|b| *b)))
        }
        "between" => {
            if args.len() != 3 {
                return Err(EvalError::ArityMismatch("between", 3, args.len()));
            }
            let x = expect_number(&eval(&args[0], bindings)?)?;
            let lo = expect_number(&eval(&args[1], bindings)?)?;
            let hi = expect_number(&eval(&args[2], bindings)?)?;
            Ok(Value::Bool(x >= lo && x <= hi))
        }
        "hours_between" => {
            if args.len() != 2 {
                return Err(EvalError::ArityMismatch("hours_between", 2, args.len()));
            }
            let a = expect_number(&eval(&args[0], bindings)?)?;
            let b = expect_number(&eval(&args[1], bindings)?)?;
            checked_number((b - a).abs() / 60.0)
        }
        "dow" => {
            if args.len() != 1 {
                return Err(EvalError::ArityMismatch("dow", 1, args.len()));
            }
            let v = eval(&args[0], bindings)?;
            let s = match &v {
                Value::Str(s) => s.clone(),
                _ => {
                    return Err(EvalError::TypeMismatch {
                        expected: "string",
                        found: v.type_name(),
                    });
                }
            };
            let date = chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|_| EvalError::InvalidDate(s))?;
            use chrono::Datelike;
            Ok(Value::Number(date.weekday().num_days_from_monday() as f64))
        }
        other => unreachable!("parser rejects function '{other}' outside the allowlist"),
    }
}

fn eval_single_list_arg<'a>(
    fn_name: &'static str,
    args: &[Expr],
    bindings: &Bindings,
) -> Result<Vec<Value>, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::ArityMismatch(fn_name, 1, args.len()));
    }
    let v = eval(&args[0], bindings)?;
    Ok(expect_list(&v)?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::value::Namespace;

    fn bindings() -> Bindings {
        Bindings {
            context: Namespace::new().with("base", Value::Str("DEN".into())),
            candidate: Namespace::new().with("credit_minutes", Value::Number(950.0)),
            pairing: Namespace::new().with(
                "rest_before_minutes",
                Value::List(vec![Value::Number(600.0), Value::Number(720.0)]),
            ),
            far117: Namespace::new().with("min_rest_minutes", Value::Number(600.0)),
            contract: Namespace::new(),
            stats: Namespace::new(),
        }
    }

    #[test]
    fn evaluates_comparison_true() {
        let e = parse("candidate.credit_minutes >= 900").unwrap();
        assert_eq!(eval(&e, &bindings()).unwrap(), Value::Bool(true));
    }

    #[test]
    fn evaluates_min_aggregate_against_far117() {
        let e = parse("min(pairing.rest_before_minutes) >= far117.min_rest_minutes").unwrap();
        assert_eq!(eval(&e, &bindings()).unwrap(), Value::Bool(true));
    }

    #[test]
    fn division_by_zero_is_recoverable_error() {
        let e = parse("candidate.credit_minutes / 0").unwrap();
        assert_eq!(eval(&e, &bindings()).unwrap_err(), EvalError::DivisionByZero);
    }

    #[test]
    fn undefined_identifier_is_recoverable_error() {
        let e = parse("candidate.nonexistent_field == 1").unwrap();
        assert!(matches!(
            eval(&e, &bindings()),
            Err(EvalError::UndefinedIdent(_))
        ));
    }

    #[test]
    fn in_operator_checks_list_membership() {
        let e = parse("context.base in [\"DEN\", \"ORD\"]").unwrap();
        assert_eq!(eval(&e, &bindings()).unwrap(), Value::Bool(true));
    }

    #[test]
    fn ternary_selects_correct_branch() {
        let e = parse("context.base == \"DEN\" ? 1 : 2").unwrap();
        assert_eq!(eval(&e, &bindings()).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn and_short_circuits_without_evaluating_rhs() {
        let e = parse("false && candidate.nonexistent_field == 1").unwrap();
        assert_eq!(eval(&e, &bindings()).unwrap(), Value::Bool(false));
    }
}
