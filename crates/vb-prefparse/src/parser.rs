// SPDX-License-Identifier: MIT OR Apache-2.0
//! Orchestrates the rule-based prefilter and the LLM fallback ladder into
//! a single [`PreferenceSchema`] (spec §4.3).

use std::sync::Arc;

use tracing::warn;
use vb_core::context::Seat;
use vb_core::preference::{ParserMethod, PreferenceSchema, PreferenceSource};
use vb_llm::{build_redacted_prompt, CompletionSource, LlmAdapter};

use crate::llm::{parse_response, INSTRUCTION};
use crate::rules;

/// Everything the parser needs to turn free text into a schema.
#[derive(Debug, Clone)]
pub struct ParseRequest {
    /// Pilot these preferences belong to.
    pub pilot_id: String,
    /// Airline code.
    pub airline: String,
    /// Bid month, `YYYY-MM`; used to expand "weekends off" into concrete
    /// dates.
    pub month: String,
    /// Domicile base.
    pub base: String,
    /// Seat position.
    pub seat: Seat,
    /// Qualified equipment.
    pub equip: Vec<String>,
    /// Free-text bid instructions.
    pub text: String,
    /// Named persona, if the caller supplied one.
    pub persona: Option<String>,
    /// Weight-normalization scheme tag to stamp on the result.
    pub weights_version: String,
}

/// Parses preference text via an optional LLM adapter, always falling
/// back to the rule-based prefilter when no adapter is configured or every
/// backend fails.
pub struct PreferenceParser {
    adapter: Option<Arc<LlmAdapter>>,
}

impl PreferenceParser {
    /// Build a parser. Pass `None` to run rule-based only (e.g. when no
    /// LLM keys are configured for this deployment).
    #[must_use]
    pub fn new(adapter: Option<Arc<LlmAdapter>>) -> Self {
        Self { adapter }
    }

    /// Parse `request.text` into a [`PreferenceSchema`]. Never fails: the
    /// rule-based result is always a valid fallback.
    pub async fn parse(&self, request: ParseRequest) -> PreferenceSchema {
        let rule_result = rules::extract(&request.text, &request.month);

        let llm_enabled = self
            .adapter
            .as_ref()
            .map(|a| a.is_enabled())
            .unwrap_or(false);

        if !llm_enabled {
            return self.rule_based_schema(&request, rule_result, Vec::new());
        }

        let adapter = self.adapter.as_ref().unwrap();
        let context = serde_json::json!({
            "pilot_id": request.pilot_id,
            "airline": request.airline,
            "base": request.base,
            "equip": request.equip,
        });
        let prompt = build_redacted_prompt(INSTRUCTION, &request.text, &context);

        match adapter.complete(&prompt).await {
            Ok(completion) => {
                let parsed = parse_response(&completion.value);

                let mut soft_prefs = rule_result.soft_prefs.clone();
                soft_prefs.extend(parsed.soft_prefs);

                let mut hard_constraints = rule_result.hard_constraints.clone();
                hard_constraints.no_red_eyes =
                    hard_constraints.no_red_eyes || parsed.hard_constraints.no_red_eyes;
                hard_constraints.days_off.extend(parsed.hard_constraints.days_off);
                hard_constraints.legalities.extend(parsed.hard_constraints.legalities);
                if parsed.hard_constraints.max_duty_hours_per_day.is_some() {
                    hard_constraints.max_duty_hours_per_day =
                        parsed.hard_constraints.max_duty_hours_per_day;
                }

                let mut unrecognized = rule_result.unrecognized;
                unrecognized.extend(parsed.unrecognized);

                let method = match completion.source {
                    CompletionSource::Primary => ParserMethod::Llm,
                    CompletionSource::Secondary => ParserMethod::LlmFallback,
                };
                let default_confidence = match completion.source {
                    CompletionSource::Primary => 0.85,
                    CompletionSource::Secondary => 0.65,
                };
                let confidence = parsed.confidence.unwrap_or(default_confidence);

                PreferenceSchema {
                    pilot_id: request.pilot_id,
                    airline: request.airline,
                    base: request.base,
                    seat: request.seat,
                    equip: request.equip,
                    hard_constraints,
                    soft_prefs,
                    weights_version: request.weights_version,
                    confidence,
                    source: PreferenceSource {
                        persona: request.persona,
                        text: request.text,
                        parser_method: method,
                        unrecognized,
                    },
                }
            }
            Err(err) => {
                warn!(error = %err, "llm preference parsing failed, using rule-based result");
                self.rule_based_schema(&request, rule_result, Vec::new())
            }
        }
    }

    fn rule_based_schema(
        &self,
        request: &ParseRequest,
        rule_result: rules::RuleBasedResult,
        extra_unrecognized: Vec<String>,
    ) -> PreferenceSchema {
        let mut unrecognized = rule_result.unrecognized;
        unrecognized.extend(extra_unrecognized);

        PreferenceSchema {
            pilot_id: request.pilot_id.clone(),
            airline: request.airline.clone(),
            base: request.base.clone(),
            seat: request.seat,
            equip: request.equip.clone(),
            hard_constraints: rule_result.hard_constraints,
            soft_prefs: rule_result.soft_prefs,
            weights_version: request.weights_version.clone(),
            confidence: 0.5,
            source: PreferenceSource {
                persona: request.persona.clone(),
                text: request.text.clone(),
                parser_method: ParserMethod::RuleBased,
                unrecognized,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;
    use vb_llm::backend::test_support::StaticBackend;
    use vb_llm::{LlmBackend, LlmConfig};

    fn request(text: &str) -> ParseRequest {
        ParseRequest {
            pilot_id: "P1".into(),
            airline: "UAL".into(),
            month: "2025-09".into(),
            base: "DEN".into(),
            seat: Seat::Fo,
            equip: vec!["737".into()],
            text: text.into(),
            persona: None,
            weights_version: "v1".into(),
        }
    }

    #[tokio::test]
    async fn without_adapter_falls_back_to_rule_based() {
        let parser = PreferenceParser::new(None);
        let schema = parser.parse(request("maximize credit")).await;
        assert_eq!(schema.source.parser_method, ParserMethod::RuleBased);
        assert!(schema.soft_prefs.contains_key("credit"));
    }

    #[tokio::test]
    async fn llm_success_tags_llm_method_and_merges_rule_hits() {
        let primary: StdArc<dyn LlmBackend> = StdArc::new(StaticBackend::ok(
            "primary",
            serde_json::json!({
                "soft_prefs": {"international": {"kind": "international", "direction": "prefer", "weight": 0.6}},
                "confidence": 0.9,
            }),
        ));
        let adapter = StdArc::new(LlmAdapter::new(LlmConfig::default(), Some(primary), None));
        let parser = PreferenceParser::new(Some(adapter));

        let schema = parser.parse(request("maximize credit please")).await;
        assert_eq!(schema.source.parser_method, ParserMethod::Llm);
        assert!(schema.soft_prefs.contains_key("credit"));
        assert!(schema.soft_prefs.contains_key("international"));
        assert_eq!(schema.confidence, 0.9);
    }

    #[tokio::test]
    async fn llm_failure_falls_back_to_rule_based() {
        let primary: StdArc<dyn LlmBackend> = StdArc::new(StaticBackend::err("primary", "down"));
        let adapter = StdArc::new(LlmAdapter::new(LlmConfig::default(), Some(primary), None));
        let parser = PreferenceParser::new(Some(adapter));

        let schema = parser.parse(request("maximize credit")).await;
        assert_eq!(schema.source.parser_method, ParserMethod::RuleBased);
    }
}
