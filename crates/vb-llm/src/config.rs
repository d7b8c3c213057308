// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration for the LLM adapter: model ids, keys, timeouts, token
//! budget, and response-cache sizing (spec §4.9, §6 env vars).

use std::time::Duration;

use vb_retry::RetryConfig;

/// Configuration for an [`crate::adapter::LlmAdapter`].
///
/// Builder methods mirror the teacher bridge crates' `with_*` style;
/// `Default` matches the timeouts spec §5 prescribes (primary 8s, secondary
/// 4s) so a caller only needs to override what differs from the env.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Primary model identifier, e.g. `$LLM_PRIMARY_MODEL`.
    pub primary_model: Option<String>,
    /// Secondary (smaller/faster fallback) model identifier.
    pub secondary_model: Option<String>,
    /// API key for the primary vendor.
    pub primary_key: Option<String>,
    /// API key for the secondary vendor.
    pub secondary_key: Option<String>,
    /// HTTP endpoint the primary backend posts completions to.
    pub primary_endpoint: String,
    /// HTTP endpoint the secondary backend posts completions to.
    pub secondary_endpoint: String,
    /// Wall-clock deadline for the primary call.
    pub primary_timeout: Duration,
    /// Wall-clock deadline for the secondary call.
    pub secondary_timeout: Duration,
    /// Maximum estimated prompt tokens before a call is rejected outright
    /// rather than sent (a four-characters-per-token heuristic, matching
    /// the order of magnitude vendor tokenizers produce for English text).
    pub max_prompt_tokens: u32,
    /// How long a cached response stays valid.
    pub cache_ttl: Duration,
    /// Maximum number of distinct `(model, prompt_digest)` entries cached.
    pub cache_capacity: usize,
    /// Backoff policy for retrying a transient backend failure before
    /// falling through the ladder (spec §7: "retries exist only for
    /// idempotent upstream calls"; an LLM completion is idempotent for a
    /// fixed prompt).
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            primary_model: None,
            secondary_model: None,
            primary_key: None,
            secondary_key: None,
            primary_endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            secondary_endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            primary_timeout: Duration::from_secs(8),
            secondary_timeout: Duration::from_secs(4),
            max_prompt_tokens: 4_000,
            cache_ttl: Duration::from_secs(120),
            cache_capacity: 512,
            retry: RetryConfig {
                max_retries: 2,
                base_delay: Duration::from_millis(200),
                max_delay: Duration::from_secs(2),
                overall_timeout: Duration::from_secs(20),
                jitter_factor: 0.2,
            },
        }
    }
}

impl LlmConfig {
    /// Start from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the primary model id and key together, as they are always
    /// configured as a pair (`$LLM_PRIMARY_MODEL`/`$LLM_PRIMARY_KEY`).
    #[must_use]
    pub fn with_primary(mut self, model: impl Into<String>, key: impl Into<String>) -> Self {
        self.primary_model = Some(model.into());
        self.primary_key = Some(key.into());
        self
    }

    /// Set the secondary model id and key together.
    #[must_use]
    pub fn with_secondary(mut self, model: impl Into<String>, key: impl Into<String>) -> Self {
        self.secondary_model = Some(model.into());
        self.secondary_key = Some(key.into());
        self
    }

    /// Override the primary call timeout.
    #[must_use]
    pub fn with_primary_timeout(mut self, timeout: Duration) -> Self {
        self.primary_timeout = timeout;
        self
    }

    /// Override the secondary call timeout.
    #[must_use]
    pub fn with_secondary_timeout(mut self, timeout: Duration) -> Self {
        self.secondary_timeout = timeout;
        self
    }

    /// Override the retry/backoff policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// `true` if a primary model/key pair is configured.
    #[must_use]
    pub fn has_primary(&self) -> bool {
        self.primary_model.is_some() && self.primary_key.is_some()
    }

    /// `true` if a secondary model/key pair is configured.
    #[must_use]
    pub fn has_secondary(&self) -> bool {
        self.secondary_model.is_some() && self.secondary_key.is_some()
    }
}
