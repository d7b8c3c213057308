// SPDX-License-Identifier: MIT OR Apache-2.0
#![warn(missing_docs)]

//! LLM adapter: primary/secondary backend routing with timeouts, a token
//! budget, response caching, and PII-scrubbed prompt construction (spec
//! §4.9). Callers that need preference parsing specifically live in
//! `vb-prefparse`, which treats this crate as the "LLM available" half of
//! its fallback ladder.

pub mod adapter;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;

pub use adapter::{build_redacted_prompt, estimate_tokens, Completion, CompletionSource, LlmAdapter};
pub use backend::{HttpLlmBackend, LlmBackend};
pub use cache::{CacheKey, ResponseCache};
pub use config::LlmConfig;
pub use error::LlmError;
