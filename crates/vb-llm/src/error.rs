// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error type for LLM backend calls.

use std::time::Duration;

/// Failure modes a [`crate::backend::LlmBackend`] or
/// [`crate::adapter::LlmAdapter`] can raise.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// No model/key pair is configured for this backend slot.
    #[error("backend not configured")]
    NotConfigured,
    /// Estimated prompt size exceeded the configured token budget.
    #[error("prompt estimated at {used} tokens exceeds budget of {budget}")]
    TokenBudgetExceeded {
        /// Estimated prompt token count.
        used: u32,
        /// Configured ceiling.
        budget: u32,
    },
    /// The call did not complete within its deadline.
    #[error("call exceeded deadline of {0:?}")]
    Timeout(Duration),
    /// Transport-level failure (connection refused, DNS, TLS, non-2xx).
    #[error("transport error: {0}")]
    Transport(String),
    /// The response body was not valid JSON, or not shaped as expected.
    #[error("failed to decode response: {0}")]
    Decode(String),
    /// Every configured backend failed in turn.
    #[error("all backends exhausted: {0}")]
    AllBackendsFailed(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(Duration::default())
        } else {
            LlmError::Transport(err.to_string())
        }
    }
}
