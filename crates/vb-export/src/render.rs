// SPDX-License-Identifier: MIT OR Apache-2.0
//! Deterministic canonical-byte rendering of a [`BidLayerArtifact`] into PBS
//! 2.0 bid-layer text.
//!
//! Rendering never reorders layers or filters: upstream (the strategy and
//! layer generator) already fixed the order that encodes PBS semantics.
//! Rendering only needs to be a pure, repeatable function of the artifact's
//! fields so that identical artifacts always produce identical bytes (and
//! therefore identical `export_hash`es).

use vb_core::{BidLayerArtifact, Filter, FilterOp, Layer, PreferDirective};

fn op_label(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq => "EQ",
        FilterOp::Ne => "NE",
        FilterOp::Lt => "LT",
        FilterOp::Le => "LE",
        FilterOp::Gt => "GT",
        FilterOp::Ge => "GE",
        FilterOp::In => "IN",
        FilterOp::NotIn => "NOT_IN",
        FilterOp::Between => "BETWEEN",
    }
}

fn render_values(values: &[serde_json::Value]) -> String {
    values
        .iter()
        .map(|v| serde_json::to_string(v).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_filter(filter: &Filter) -> String {
    format!(
        "    FILTER {} {} [{}]",
        filter.filter_type,
        op_label(filter.op),
        render_values(&filter.values)
    )
}

fn render_layer(layer: &Layer) -> String {
    let mut out = format!("  LAYER {}\n", layer.n);
    out.push_str(&format!(
        "    PREFER {}\n",
        match layer.prefer {
            PreferDirective::Yes => "YES",
            PreferDirective::No => "NO",
        }
    ));
    for filter in &layer.filters {
        out.push_str(&render_filter(filter));
        out.push('\n');
    }
    if let Some(p) = layer.award_probability {
        out.push_str(&format!("    AWARD_PROBABILITY {p:.4}\n"));
    }
    out
}

/// Render `artifact` as canonical PBS 2.0 bid-layer text.
///
/// The `lint` and `export_hash` fields are never rendered: they describe
/// the artifact, they are not part of the bid layers themselves, so a
/// re-lint or re-export of unchanged layers produces byte-identical output.
#[must_use]
pub fn render_canonical(artifact: &BidLayerArtifact) -> String {
    let mut out = format!(
        "BID_PACKAGE {} {} {}\n",
        artifact.airline, artifact.month, artifact.format
    );
    for layer in &artifact.layers {
        out.push_str(&render_layer(layer));
    }
    out
}
