// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Rule-pack loading and the restricted expression evaluator used to check
//! hard constraints and score soft preferences against a candidate schedule
//! (spec §4.2).
//!
//! Expressions are never evaluated as strings: every `check`/`score` field
//! in a rule pack is parsed once, at load time, into an [`ast::Expr`] by a
//! hand-written lexer and recursive-descent parser, then evaluated by a
//! total function that never panics and reports every failure as a
//! [`eval::EvalError`] rather than unwinding.

pub mod ast;
pub mod cache;
pub mod compiled;
pub mod eval;
pub mod facts;
pub mod lexer;
pub mod loader;
pub mod parser;
pub mod value;

pub use ast::{BinOp, Expr, ALLOWED_FUNCTIONS, NAMESPACES};
pub use cache::RulePackCache;
pub use compiled::{CompileError, CompiledHardRule, CompiledRulePack, CompiledSoftRule, EXPECTED_DIALECT};
pub use eval::{eval, EvalError};
pub use facts::{build_bindings, ContractConstants, Far117Constants};
pub use loader::{LoadError, RulePackLoader};
pub use value::{Bindings, Namespace, Value};

use std::collections::BTreeMap;
use vb_core::{CandidateSchedule, ContextSnapshot, LegalCitation, Pairing, Severity, Violation};

/// Result of evaluating every hard rule in a pack against one candidate.
#[derive(Debug, Clone, Default)]
pub struct HardEvaluation {
    /// Rules the candidate satisfies, carried forward as legal citations on
    /// the emitted candidate/layer.
    pub hits: Vec<LegalCitation>,
    /// Rules the candidate fails, or whose expression could not be
    /// evaluated against the bound facts.
    pub violations: Vec<Violation>,
}

impl HardEvaluation {
    /// A candidate is hard-ok when no rule produced an `Error`-severity
    /// violation. `Warn`-severity rules (malformed or undefined facts) do
    /// not block eligibility, matching the "rule-level warning, never a
    /// pipeline failure" behavior required by spec §4.2/§7.
    #[must_use]
    pub fn hard_ok(&self) -> bool {
        !self
            .violations
            .iter()
            .any(|v| v.severity == Severity::Error)
    }
}

/// Evaluate every hard rule in `pack` against `candidate`'s bound facts.
///
/// Per spec §4.2/§7, a rule whose expression cannot be evaluated (an
/// undefined identifier, a division by zero, etc.) never aborts the whole
/// check: it is recorded as a `Warn`-severity violation and evaluation
/// continues with the remaining rules.
#[must_use]
pub fn evaluate_hard(pack: &CompiledRulePack, bindings: &Bindings) -> HardEvaluation {
    let mut result = HardEvaluation::default();
    for rule in &pack.hard_rules {
        match eval::eval(&rule.check, bindings) {
            Ok(Value::Bool(true)) => result.hits.push(LegalCitation {
                rule_id: rule.def.id.clone(),
                detail: rule.def.description.clone(),
                source_citation: None,
            }),
            Ok(Value::Bool(false)) => result.violations.push(Violation {
                rule_id: rule.def.id.clone(),
                severity: rule.def.severity,
                detail: rule.def.description.clone(),
            }),
            Ok(other) => result.violations.push(Violation {
                rule_id: rule.def.id.clone(),
                severity: Severity::Warn,
                detail: format!(
                    "hard rule '{}' did not evaluate to a boolean (got {})",
                    rule.def.id,
                    other.type_name()
                ),
            }),
            Err(err) => result.violations.push(Violation {
                rule_id: rule.def.id.clone(),
                severity: Severity::Warn,
                detail: format!("hard rule '{}' failed to evaluate: {err}", rule.def.id),
            }),
        }
    }
    result
}

/// Score every soft rule in `pack` against `candidate`'s bound facts,
/// returning each rule's clamped, weighted contribution keyed by name.
///
/// A rule whose score expression fails to evaluate contributes `0.0` and is
/// not propagated as an error: soft scoring degrades gracefully rather than
/// failing the candidate (spec §4.5 "a soft rule that cannot be evaluated
/// contributes zero, with a rationale note").
#[must_use]
pub fn score_soft(pack: &CompiledRulePack, bindings: &Bindings) -> BTreeMap<String, f64> {
    let mut scores = BTreeMap::new();
    for rule in &pack.soft_rules {
        let raw = match eval::eval(&rule.score, bindings) {
            Ok(Value::Number(n)) if n.is_finite() => n,
            _ => 0.0,
        };
        let clamped = raw.clamp(rule.def.clamp_min, rule.def.clamp_max);
        scores.insert(rule.def.name.clone(), clamped * rule.def.weight);
    }
    scores
}

/// Convenience bundle for invoking [`evaluate_hard`]/[`score_soft`] without
/// manually assembling [`Bindings`] at every call site.
pub fn evaluate_candidate(
    pack: &CompiledRulePack,
    ctx: &ContextSnapshot,
    candidate: &CandidateSchedule,
    package_pairings: &[Pairing],
    far117: Far117Constants,
    contract: &ContractConstants,
    stats: &BTreeMap<String, f64>,
) -> (HardEvaluation, BTreeMap<String, f64>) {
    let bindings = build_bindings(ctx, candidate, package_pairings, far117, contract, stats);
    (
        evaluate_hard(pack, &bindings),
        score_soft(pack, &bindings),
    )
}
