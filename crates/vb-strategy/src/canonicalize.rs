// SPDX-License-Identifier: MIT OR Apache-2.0
//! Simplifies proposed layer templates before numbering: dedupes
//! identical filters, merges adjacent numeric bounds on the same field
//! into a `Between`, collapses duplicate membership-list entries, and
//! drops templates that end up identical to one already kept.

use std::collections::BTreeSet;

use serde_json::Value;
use vb_core::layer::{Filter, FilterOp};
use vb_core::strategy::LayerTemplate;

fn as_f64(v: &Value) -> Option<f64> {
    v.as_f64()
}

/// Merge a `Ge` and a `Le`/`Lt` filter on the same field into one
/// `Between`, dedupe repeated filters, and collapse an `In`/`NotIn` list
/// down to its distinct members, preserving first-seen order otherwise.
fn canonicalize_filters(filters: Vec<Filter>) -> Vec<Filter> {
    let mut lower: Option<(usize, f64)> = None;
    let mut upper: Option<(usize, f64)> = None;
    let mut out: Vec<Filter> = Vec::new();
    let mut seen: BTreeSet<(String, String, String)> = BTreeSet::new();

    for filter in filters {
        let dedupe_key = (
            filter.filter_type.clone(),
            format!("{:?}", filter.op),
            serde_json::to_string(&filter.values).unwrap_or_default(),
        );
        if !seen.insert(dedupe_key) {
            continue;
        }

        match filter.op {
            FilterOp::Ge | FilterOp::Gt if filter.values.len() == 1 => {
                if let Some(v) = as_f64(&filter.values[0]) {
                    lower = Some((out.len(), v));
                    out.push(filter);
                    continue;
                }
                out.push(filter);
            }
            FilterOp::Le | FilterOp::Lt if filter.values.len() == 1 => {
                if let Some(v) = as_f64(&filter.values[0]) {
                    upper = Some((out.len(), v));
                    out.push(filter);
                    continue;
                }
                out.push(filter);
            }
            FilterOp::In | FilterOp::NotIn => {
                let mut dedup_values: Vec<Value> = Vec::new();
                for v in filter.values {
                    if !dedup_values.iter().any(|existing| existing == &v) {
                        dedup_values.push(v);
                    }
                }
                out.push(Filter {
                    filter_type: filter.filter_type,
                    op: filter.op,
                    values: dedup_values,
                });
            }
            _ => out.push(filter),
        }
    }

    if let (Some((li, lv)), Some((ui, uv))) = (lower, upper) {
        if out[li].filter_type == out[ui].filter_type && lv <= uv {
            let filter_type = out[li].filter_type.clone();
            let merged = Filter {
                filter_type,
                op: FilterOp::Between,
                values: vec![serde_json::json!(lv), serde_json::json!(uv)],
            };
            let (keep, drop) = if li < ui { (li, ui) } else { (ui, li) };
            out.remove(drop);
            out[keep] = merged;
        }
    }

    out
}

/// Canonicalize every template's filters, then drop any template that is
/// now identical (same filters, same polarity) to one already kept.
#[must_use]
pub fn canonicalize(templates: Vec<LayerTemplate>) -> Vec<LayerTemplate> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut out = Vec::new();

    for template in templates {
        let filters = canonicalize_filters(template.filters);
        let fingerprint = serde_json::to_string(&(&filters, template.prefer))
            .unwrap_or_else(|_| format!("{filters:?}{:?}", template.prefer));
        if !seen.insert(fingerprint) {
            continue;
        }
        out.push(LayerTemplate {
            filters,
            prefer: template.prefer,
            note: template.note,
        });
    }

    out
}
