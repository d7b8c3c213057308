// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runtime value type and namespace bindings for expression evaluation.

use std::collections::BTreeMap;

/// A runtime value produced by evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A real number. Booleans are represented separately so comparisons
    /// like `1 == true` are rejected rather than silently coerced.
    Number(f64),
    /// A UTF-8 string.
    Str(String),
    /// A boolean.
    Bool(bool),
    /// An ordered list of values, used for the aggregate functions and `in`.
    List(Vec<Value>),
}

impl Value {
    /// Type name, for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
        }
    }

    /// Coerce to `f64`, or `None` if this value is not a number.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Coerce to `bool`, or `None` if this value is not a bool.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// One of the five declared namespaces, holding flat field bindings.
///
/// Modeled as a flat map rather than a typed struct per namespace: rule
/// packs reference fields by name out of a small, airline-varying set, and
/// a flat map lets the evaluator reject unknown names uniformly (as
/// `Value` lookup misses) without a namespace-specific schema.
#[derive(Debug, Clone, Default)]
pub struct Namespace(pub BTreeMap<String, Value>);

impl Namespace {
    /// An empty namespace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// The complete set of namespace bindings available to one evaluation.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    /// `context` namespace: the request's `ContextSnapshot` fields.
    pub context: Namespace,
    /// `candidate` namespace: aggregate facts about the candidate schedule.
    pub candidate: Namespace,
    /// `pairing` namespace: per-field lists gathered across the candidate's
    /// member pairings (e.g. `pairing.rest_before_minutes` is every duty
    /// period's rest value across every member pairing).
    pub pairing: Namespace,
    /// `far117` namespace: federal flight/duty-time constants.
    pub far117: Namespace,
    /// `contract` namespace: airline-contract-derived constants.
    pub contract: Namespace,
    /// `stats` namespace: historical award statistics, absent when none
    /// have been computed for this context.
    pub stats: Namespace,
}

impl Bindings {
    /// Resolve a namespace by its name (the first segment of an
    /// [`crate::ast::Expr::Ident`] path). The parser guarantees this is one
    /// of the five declared namespaces, so this never needs a `None` arm
    /// for unknown namespaces.
    #[must_use]
    pub fn namespace(&self, name: &str) -> &Namespace {
        match name {
            "context" => &self.context,
            "candidate" => &self.candidate,
            "pairing" => &self.pairing,
            "far117" => &self.far117,
            "contract" => &self.contract,
            "stats" => &self.stats,
            _ => unreachable!("parser only emits declared namespaces"),
        }
    }
}
