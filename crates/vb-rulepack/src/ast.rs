// SPDX-License-Identifier: MIT OR Apache-2.0
//! Restricted expression AST.
//!
//! Parsing happens once at rule-pack load time; nothing here ever evaluates
//! a runtime string (spec §9 redesign flag — no Python-`eval`-style string
//! evaluation).

/// Binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `in`
    In,
    /// `not in`
    NotIn,
}

/// A node in the restricted expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal.
    Number(f64),
    /// String literal.
    Str(String),
    /// Boolean literal.
    Bool(bool),
    /// Dotted identifier path, e.g. `candidate.credit_minutes`. The first
    /// segment must be one of the five declared namespaces.
    Ident(Vec<String>),
    /// List literal, e.g. `[1, 2, 3]`.
    List(Vec<Expr>),
    /// Unary negation, `-x`.
    Neg(Box<Expr>),
    /// Logical negation, `!x`.
    Not(Box<Expr>),
    /// Binary operation.
    BinOp(BinOp, Box<Expr>, Box<Expr>),
    /// Call to an allowlisted function.
    Call(String, Vec<Expr>),
    /// Ternary conditional, `cond ? a : b`.
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

/// Function names the evaluator allows calling. No other identifier may be
/// used in call position (spec §4.2 "function calls from a fixed
/// allowlist").
pub const ALLOWED_FUNCTIONS: &[&str] = &[
    "sum",
    "any",
    "all",
    "count",
    "min",
    "max",
    "dow",
    "between",
    "hours_between",
];

/// The five namespaces an identifier path may begin with.
pub const NAMESPACES: &[&str] = &["context", "candidate", "pairing", "far117", "contract", "stats"];
