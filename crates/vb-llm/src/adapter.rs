// SPDX-License-Identifier: MIT OR Apache-2.0
//! Primary/secondary fallback orchestration, token budgeting, and
//! PII-scrubbed prompt construction (spec §4.9).

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};
use vb_core::redact::{redact_json, redact_text_emails};
use vb_retry::{retry_async, RetryError};

use crate::backend::LlmBackend;
use crate::cache::{CacheKey, ResponseCache};
use crate::config::LlmConfig;
use crate::error::LlmError;

/// `true` for backend failures worth retrying: transient transport
/// problems and deadline overruns. A malformed response body or a missing
/// model/key pair will not change on retry, so those fail immediately.
fn is_retryable(err: &LlmError) -> bool {
    matches!(err, LlmError::Transport(_) | LlmError::Timeout(_))
}

/// Which backend ultimately produced a completion, so callers (the
/// preference parser) can tag [`vb_core::preference::ParserMethod`]
/// without this crate depending on that enum directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSource {
    /// The primary backend answered within its deadline.
    Primary,
    /// The primary backend failed or timed out; the secondary answered.
    Secondary,
}

/// A successful completion, tagged with provenance for downstream logging
/// and confidence scoring.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Parsed JSON response body.
    pub value: Value,
    /// Which backend produced it.
    pub source: CompletionSource,
    /// Model id that produced it.
    pub model: String,
    /// Whether this result came from the response cache rather than a
    /// live call.
    pub from_cache: bool,
}

/// Estimate prompt size in tokens using a four-characters-per-token
/// heuristic. Not a real tokenizer; good enough to keep prompts inside a
/// sane order of magnitude before they are sent to a vendor.
#[must_use]
pub fn estimate_tokens(text: &str) -> u32 {
    (text.len() as u32 / 4).max(1)
}

/// Redact PII from free text and a structured context object, then splice
/// both into a single prompt. Both `vb_core::redact` code paths are
/// exercised here, not just one, since the parser hands this adapter both
/// shapes of input.
#[must_use]
pub fn build_redacted_prompt(instruction: &str, free_text: &str, context: &Value) -> String {
    let safe_text = redact_text_emails(free_text);
    let mut safe_context = context.clone();
    redact_json(&mut safe_context);
    format!(
        "{instruction}\n\nPilot context:\n{}\n\nPreference text:\n{safe_text}",
        serde_json::to_string_pretty(&safe_context).unwrap_or_default()
    )
}

/// Routes completion requests across a primary and secondary backend with
/// caching and a hard token budget.
pub struct LlmAdapter {
    config: LlmConfig,
    primary: Option<Arc<dyn LlmBackend>>,
    secondary: Option<Arc<dyn LlmBackend>>,
    cache: ResponseCache,
}

impl LlmAdapter {
    /// Build an adapter from explicit backends (tests supply mocks; the
    /// server wires in [`crate::backend::HttpLlmBackend`] instances built
    /// from [`LlmConfig`]).
    #[must_use]
    pub fn new(
        config: LlmConfig,
        primary: Option<Arc<dyn LlmBackend>>,
        secondary: Option<Arc<dyn LlmBackend>>,
    ) -> Self {
        let cache = ResponseCache::new(config.cache_capacity, config.cache_ttl);
        Self {
            config,
            primary,
            secondary,
            cache,
        }
    }

    /// `true` if at least one backend is configured; callers without any
    /// backend should skip straight to a rule-based path rather than call
    /// [`Self::complete`] at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.primary.is_some() || self.secondary.is_some()
    }

    /// Run the primary→secondary fallback ladder for `prompt`, caching the
    /// winning response under the winning model's id.
    pub async fn complete(&self, prompt: &str) -> Result<Completion, LlmError> {
        let budget = self.config.max_prompt_tokens;
        let used = estimate_tokens(prompt);
        if used > budget {
            return Err(LlmError::TokenBudgetExceeded { used, budget });
        }

        if let Some(primary) = &self.primary {
            let key = CacheKey::new(primary.name(), prompt);
            if let Some(cached) = self.cache.get(&key).await {
                return Ok(Completion {
                    value: cached,
                    source: CompletionSource::Primary,
                    model: primary.name().to_string(),
                    from_cache: true,
                });
            }
            let timeout = self.config.primary_timeout;
            match retry_async(
                &self.config.retry,
                || {
                    let backend = Arc::clone(primary);
                    async move { backend.complete_json(prompt, timeout).await }
                },
                is_retryable,
            )
            .await
            {
                Ok(outcome) => {
                    let value = outcome.value;
                    let cached = self
                        .cache
                        .get_or_compute(key, || async { Ok::<_, LlmError>(value.clone()) })
                        .await?;
                    return Ok(Completion {
                        value: cached,
                        source: CompletionSource::Primary,
                        model: primary.name().to_string(),
                        from_cache: false,
                    });
                }
                Err(RetryError::Operation(err)) => {
                    warn!(backend = primary.name(), error = %err, "primary llm backend failed after retries, falling back");
                }
                Err(RetryError::Timeout(budget)) => {
                    warn!(backend = primary.name(), budget = ?budget, "primary llm backend retry budget exhausted, falling back");
                }
            }
        }

        if let Some(secondary) = &self.secondary {
            let key = CacheKey::new(secondary.name(), prompt);
            if let Some(cached) = self.cache.get(&key).await {
                return Ok(Completion {
                    value: cached,
                    source: CompletionSource::Secondary,
                    model: secondary.name().to_string(),
                    from_cache: true,
                });
            }
            let timeout = self.config.secondary_timeout;
            let outcome = retry_async(
                &self.config.retry,
                || {
                    let backend = Arc::clone(secondary);
                    async move { backend.complete_json(prompt, timeout).await }
                },
                is_retryable,
            )
            .await
            .map_err(|err| match err {
                RetryError::Operation(err) => err,
                RetryError::Timeout(budget) => {
                    LlmError::Timeout(budget)
                }
            })?;
            let value = outcome.value;
            let cached = self
                .cache
                .get_or_compute(key, || async { Ok::<_, LlmError>(value.clone()) })
                .await?;
            info!(backend = secondary.name(), "secondary llm backend answered");
            return Ok(Completion {
                value: cached,
                source: CompletionSource::Secondary,
                model: secondary.name().to_string(),
                from_cache: false,
            });
        }

        Err(LlmError::AllBackendsFailed(
            "no backend configured or all configured backends failed".to_string(),
        ))
    }

    /// Configured per-call timeout for the secondary backend, exposed so
    /// callers can size their own overall deadline.
    #[must_use]
    pub fn secondary_timeout(&self) -> Duration {
        self.config.secondary_timeout
    }
}
