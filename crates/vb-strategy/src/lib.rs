// SPDX-License-Identifier: MIT OR Apache-2.0
#![warn(missing_docs)]

//! Strategy directive synthesis and PBS layer generation (spec §4.6):
//! turns ranked candidates and soft preferences into [`StrategyDirectives`],
//! canonicalizes the proposed layer shapes, and numbers them into a
//! [`BidLayerArtifact`] annotated with estimated award probabilities.

pub mod canonicalize;
pub mod directives;
pub mod generator;

pub use canonicalize::canonicalize;
pub use directives::build_strategy;
pub use generator::generate_layers;
pub use vb_core::strategy::{LayerTemplate, StrategyDirectives};
