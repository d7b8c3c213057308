// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compiled rule packs: parsed `check`/`score` expressions, ready to
//! evaluate without re-parsing.

use crate::ast::Expr;
use crate::parser::{self, ParseError};
use thiserror::Error;
use vb_core::{HardRuleDef, RulePackDef, RulePackMeta, SoftRuleDef};

/// Errors raised while validating and compiling a [`RulePackDef`].
#[derive(Debug, Error)]
pub enum CompileError {
    /// Two hard rules or two soft rules shared an id/name.
    #[error("rule pack {airline}/{month} has duplicate rule ids")]
    DuplicateIds {
        /// Airline the pack governs.
        airline: String,
        /// Month the pack governs.
        month: String,
    },
    /// A pack's declared dialect does not match what this evaluator builds.
    #[error("rule pack declares unsupported expression dialect '{0}', expected '{EXPECTED_DIALECT}'")]
    UnsupportedDialect(String),
    /// A `check` or `score` expression failed to parse.
    #[error("rule '{rule_id}' has a malformed expression: {source}")]
    MalformedExpression {
        /// The hard rule id or soft rule name that owns the bad expression.
        rule_id: String,
        /// Underlying parse error.
        #[source]
        source: ParseError,
    },
}

/// The expression dialect name this evaluator implements. Packs declaring
/// any other `meta.expression_dialect` are rejected at load time rather
/// than silently mis-evaluated (spec §9 Open Question 3).
pub const EXPECTED_DIALECT: &str = "vb-expr/v1";

/// A compiled hard rule: declaration plus its parsed `check` expression.
#[derive(Debug, Clone)]
pub struct CompiledHardRule {
    /// Original declaration.
    pub def: HardRuleDef,
    /// Parsed boolean expression.
    pub check: Expr,
}

/// A compiled soft rule: declaration plus its parsed `score` expression.
#[derive(Debug, Clone)]
pub struct CompiledSoftRule {
    /// Original declaration.
    pub def: SoftRuleDef,
    /// Parsed scoring expression.
    pub score: Expr,
}

/// A rule pack with every expression pre-parsed into an AST, ready for
/// repeated evaluation without re-parsing (spec §4.2 "parsing happens once
/// at rule-pack load").
#[derive(Debug, Clone)]
pub struct CompiledRulePack {
    /// Pack metadata.
    pub meta: RulePackMeta,
    /// Compiled hard rules, indices are stable for the pack's lifetime.
    pub hard_rules: Vec<CompiledHardRule>,
    /// Compiled soft rules, indices are stable for the pack's lifetime.
    pub soft_rules: Vec<CompiledSoftRule>,
}

impl CompiledRulePack {
    /// Validate and compile a loaded [`RulePackDef`].
    pub fn compile(def: RulePackDef) -> Result<Self, CompileError> {
        if !def.has_unique_ids() {
            return Err(CompileError::DuplicateIds {
                airline: def.meta.airline.clone(),
                month: def.meta.month.clone(),
            });
        }
        if def.meta.expression_dialect != EXPECTED_DIALECT {
            return Err(CompileError::UnsupportedDialect(
                def.meta.expression_dialect.clone(),
            ));
        }

        let hard_rules = def
            .hard_rules
            .into_iter()
            .map(|rule| {
                let check = parser::parse(&rule.check).map_err(|source| {
                    CompileError::MalformedExpression {
                        rule_id: rule.id.clone(),
                        source,
                    }
                })?;
                Ok(CompiledHardRule { def: rule, check })
            })
            .collect::<Result<Vec<_>, CompileError>>()?;

        let soft_rules = def
            .soft_rules
            .into_iter()
            .map(|rule| {
                let score = parser::parse(&rule.score).map_err(|source| {
                    CompileError::MalformedExpression {
                        rule_id: rule.name.clone(),
                        source,
                    }
                })?;
                Ok(CompiledSoftRule { def: rule, score })
            })
            .collect::<Result<Vec<_>, CompileError>>()?;

        Ok(Self {
            meta: def.meta,
            hard_rules,
            soft_rules,
        })
    }

    /// Names of all declared soft rules.
    #[must_use]
    pub fn soft_rule_names(&self) -> std::collections::BTreeSet<String> {
        self.soft_rules.iter().map(|r| r.def.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vb_core::Severity;

    fn def() -> RulePackDef {
        RulePackDef {
            meta: RulePackMeta {
                version: "2025.1".into(),
                airline: "UAL".into(),
                month: "2025-09".into(),
                expression_dialect: EXPECTED_DIALECT.into(),
            },
            hard_rules: vec![HardRuleDef {
                id: "far117_min_rest".into(),
                description: "minimum rest".into(),
                severity: Severity::Error,
                check: "min(pairing.rest_before_minutes) >= far117.min_rest_minutes".into(),
            }],
            soft_rules: vec![SoftRuleDef {
                name: "credit".into(),
                description: "prefer higher credit".into(),
                score: "candidate.credit_minutes / 1000".into(),
                weight: 1.0,
                direction: None,
                clamp_min: -1.0,
                clamp_max: 1.0,
            }],
        }
    }

    #[test]
    fn compiles_well_formed_pack() {
        let compiled = CompiledRulePack::compile(def()).unwrap();
        assert_eq!(compiled.hard_rules.len(), 1);
        assert_eq!(compiled.soft_rules.len(), 1);
    }

    #[test]
    fn rejects_wrong_dialect() {
        let mut d = def();
        d.meta.expression_dialect = "python-eval".into();
        assert!(matches!(
            CompiledRulePack::compile(d),
            Err(CompileError::UnsupportedDialect(_))
        ));
    }

    #[test]
    fn rejects_malformed_expression() {
        let mut d = def();
        d.hard_rules[0].check = "candidate.credit_minutes >=".into();
        assert!(matches!(
            CompiledRulePack::compile(d),
            Err(CompileError::MalformedExpression { .. })
        ));
    }
}
