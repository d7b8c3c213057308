// SPDX-License-Identifier: MIT OR Apache-2.0
#![warn(missing_docs)]

//! Preference Parser (spec §4.3): turns free-text bid instructions into a
//! [`vb_core::preference::PreferenceSchema`] via an LLM-primary,
//! rule-based-fallback ladder.

pub mod llm;
pub mod parser;
pub mod rules;

pub use parser::{ParseRequest, PreferenceParser};
pub use rules::RuleBasedResult;
