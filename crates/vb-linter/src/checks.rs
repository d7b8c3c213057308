// SPDX-License-Identifier: MIT OR Apache-2.0
//! The five lint checks (spec §4.7), each a pure function over a
//! [`BidLayerArtifact`] that appends [`LintEntry`] findings without
//! touching `layers`.

use std::collections::{BTreeMap, BTreeSet};

use vb_core::layer::{BidLayerArtifact, Filter, FilterOp, Layer, LintEntry, LintKind, PreferDirective};

/// Filter field names the airline's PBS dialect is assumed to support.
/// Anything outside this set came from a strategy template referencing a
/// derived feature the export dialect has no encoding for.
pub const KNOWN_FILTER_TYPES: &[&str] = &[
    "pairing_days",
    "layover_minutes",
    "credit_minutes",
    "block_minutes",
    "includes_weekend",
    "is_international",
    "commute_friendly",
    "has_red_eye",
    "equipment",
    "routing",
];

fn filter_key(f: &Filter) -> String {
    serde_json::to_string(&(&f.filter_type, f.op, &f.values)).unwrap_or_default()
}

fn filter_set(layer: &Layer) -> BTreeSet<String> {
    layer.filters.iter().map(filter_key).collect()
}

/// `SHADOW`: a later layer's filter set is a superset of (or equal to) an
/// earlier same-polarity layer's — it can never match a pairing that
/// wasn't already resolved by the earlier layer.
pub fn shadow(artifact: &BidLayerArtifact, out: &mut Vec<LintEntry>) {
    for (i, earlier) in artifact.layers.iter().enumerate() {
        let earlier_set = filter_set(earlier);
        for later in &artifact.layers[i + 1..] {
            if later.prefer != earlier.prefer {
                continue;
            }
            let later_set = filter_set(later);
            if !earlier_set.is_empty() && earlier_set.is_subset(&later_set) {
                out.push(LintEntry {
                    kind: LintKind::Shadow,
                    layers: vec![earlier.n, later.n],
                    detail: format!(
                        "layer {} repeats every filter of layer {} with the same polarity; it can never select a pairing layer {} didn't already cover",
                        later.n, earlier.n, earlier.n
                    ),
                });
            }
        }
    }
}

/// `CONTRADICTION`: two layers assert opposite polarity over the exact
/// same filter condition.
pub fn contradiction(artifact: &BidLayerArtifact, out: &mut Vec<LintEntry>) {
    let mut by_condition: BTreeMap<String, Vec<(&Layer, PreferDirective)>> = BTreeMap::new();
    for layer in &artifact.layers {
        for filter in &layer.filters {
            by_condition
                .entry(filter_key(filter))
                .or_default()
                .push((layer, layer.prefer));
        }
    }
    for occurrences in by_condition.values() {
        let mut yes_layers = vec![];
        let mut no_layers = vec![];
        for (layer, prefer) in occurrences {
            match prefer {
                PreferDirective::Yes => yes_layers.push(layer.n),
                PreferDirective::No => no_layers.push(layer.n),
            }
        }
        if !yes_layers.is_empty() && !no_layers.is_empty() {
            let mut layers: Vec<u32> = yes_layers.iter().chain(no_layers.iter()).copied().collect();
            layers.sort_unstable();
            layers.dedup();
            out.push(LintEntry {
                kind: LintKind::Contradiction,
                layers,
                detail: "the same filter condition is preferred in one layer and excluded in another".to_string(),
            });
        }
    }
}

/// `REDUNDANT_FILTER`: a single filter in a layer repeats one already
/// established, with the same polarity, by an earlier layer.
pub fn redundant_filter(artifact: &BidLayerArtifact, out: &mut Vec<LintEntry>) {
    let mut seen: BTreeMap<String, u32> = BTreeMap::new();
    for layer in &artifact.layers {
        for filter in &layer.filters {
            let key = format!("{:?}:{}", layer.prefer, filter_key(filter));
            if let Some(&earlier_n) = seen.get(&key) {
                out.push(LintEntry {
                    kind: LintKind::RedundantFilter,
                    layers: vec![earlier_n, layer.n],
                    detail: format!(
                        "filter on '{}' in layer {} has no selective effect; layer {} already applies it",
                        filter.filter_type, layer.n, earlier_n
                    ),
                });
            } else {
                seen.insert(key, layer.n);
            }
        }
    }
}

/// `AIRLINE_SPECIFIC`: a filter references a field the active dialect
/// doesn't support.
pub fn airline_specific(artifact: &BidLayerArtifact, known_filter_types: &[&str], out: &mut Vec<LintEntry>) {
    for layer in &artifact.layers {
        for filter in &layer.filters {
            if !known_filter_types.contains(&filter.filter_type.as_str()) {
                out.push(LintEntry {
                    kind: LintKind::AirlineSpecific,
                    layers: vec![layer.n],
                    detail: format!(
                        "filter type '{}' is not part of the {} dialect's supported fields",
                        filter.filter_type, artifact.airline
                    ),
                });
            }
        }
    }
}

/// `EMPTY_LAYER`: a layer's own filters are mutually unsatisfiable
/// (an empty `In`/`NotIn` list, or a `Ge`/`Le` pair on the same field
/// whose bounds cross).
pub fn empty_layer(artifact: &BidLayerArtifact, out: &mut Vec<LintEntry>) {
    for layer in &artifact.layers {
        let mut empty = false;

        for filter in &layer.filters {
            if matches!(filter.op, FilterOp::In | FilterOp::NotIn) && filter.values.is_empty() {
                empty = true;
            }
        }

        let mut lower: BTreeMap<&str, f64> = BTreeMap::new();
        let mut upper: BTreeMap<&str, f64> = BTreeMap::new();
        for filter in &layer.filters {
            let Some(v) = filter.values.first().and_then(|v| v.as_f64()) else {
                continue;
            };
            match filter.op {
                FilterOp::Ge | FilterOp::Gt => {
                    lower.insert(filter.filter_type.as_str(), v);
                }
                FilterOp::Le | FilterOp::Lt => {
                    upper.insert(filter.filter_type.as_str(), v);
                }
                FilterOp::Between if filter.values.len() == 2 => {
                    if let Some(hi) = filter.values[1].as_f64() {
                        if v > hi {
                            empty = true;
                        }
                    }
                }
                _ => {}
            }
        }
        for (field, &lo) in &lower {
            if let Some(&hi) = upper.get(field) {
                if lo > hi {
                    empty = true;
                }
            }
        }

        if empty {
            out.push(LintEntry {
                kind: LintKind::EmptyLayer,
                layers: vec![layer.n],
                detail: format!("layer {} resolves to the empty pairing set", layer.n),
            });
        }
    }
}
