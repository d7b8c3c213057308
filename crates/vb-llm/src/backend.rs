// SPDX-License-Identifier: MIT OR Apache-2.0
//! Backend trait and the HTTP implementation that talks to a hosted vendor
//! completion endpoint.
//!
//! Deviation from teacher pattern: the teacher's `claude-bridge` /
//! `codex-bridge` crates spawn a local Node sidecar process and speak a
//! line-delimited protocol over stdio. VectorBid's preference parser calls
//! hosted vendor APIs it does not control the runtime of, so this crate
//! swaps that transport for a direct `reqwest` client. Retry, timeout, and
//! fallback-ladder shape are kept identical to the bridge crates' stance of
//! "one primary, one degraded fallback, both observable."

use std::time::Duration;

use serde_json::Value;

use crate::error::LlmError;

/// A chat-completion backend that returns a single JSON value.
///
/// Implementors own their own transport; the adapter only ever sees
/// `complete_json` and the backend's `name()` for logging/cache-keying.
#[async_trait::async_trait]
pub trait LlmBackend: Send + Sync {
    /// Stable identifier used in cache keys and tracing spans, typically
    /// the model id.
    fn name(&self) -> &str;

    /// Send `prompt` and return the parsed JSON response body, failing if
    /// the call does not complete within `deadline`.
    async fn complete_json(&self, prompt: &str, deadline: Duration) -> Result<Value, LlmError>;
}

/// An HTTP backend speaking a minimal "messages" request shape compatible
/// with hosted chat-completion vendors.
pub struct HttpLlmBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpLlmBackend {
    /// Build a backend bound to `endpoint`, authenticating with `api_key`
    /// and requesting completions from `model`.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait::async_trait]
impl LlmBackend for HttpLlmBackend {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete_json(&self, prompt: &str, deadline: Duration) -> Result<Value, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": 1024,
            "messages": [{"role": "user", "content": prompt}],
        });

        let send = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send();

        let response = tokio::time::timeout(deadline, send)
            .await
            .map_err(|_| LlmError::Timeout(deadline))??;

        if !response.status().is_success() {
            return Err(LlmError::Transport(format!(
                "backend {} returned status {}",
                self.model,
                response.status()
            )));
        }

        let parse = response.json::<Value>();
        let value = tokio::time::timeout(deadline, parse)
            .await
            .map_err(|_| LlmError::Timeout(deadline))??;

        Ok(value)
    }
}

/// Deterministic backend stand-ins for tests, exported outside this crate
/// under the `test-util` feature so dependents (the preference parser,
/// the optimizer) can exercise fallback behavior without a network.
#[cfg(any(test, feature = "test-util"))]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// A deterministic backend for unit tests: returns a fixed value, or
    /// errors if `fail` is set. Never reached over the network.
    pub struct StaticBackend {
        pub label: String,
        pub result: Mutex<Option<Result<Value, String>>>,
    }

    impl StaticBackend {
        pub fn ok(label: &str, value: Value) -> Self {
            Self {
                label: label.to_string(),
                result: Mutex::new(Some(Ok(value))),
            }
        }

        pub fn err(label: &str, message: &str) -> Self {
            Self {
                label: label.to_string(),
                result: Mutex::new(Some(Err(message.to_string()))),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmBackend for StaticBackend {
        fn name(&self) -> &str {
            &self.label
        }

        async fn complete_json(&self, _prompt: &str, _deadline: Duration) -> Result<Value, LlmError> {
            match self.result.lock().unwrap().clone() {
                Some(Ok(v)) => Ok(v),
                Some(Err(e)) => Err(LlmError::Transport(e)),
                None => Err(LlmError::Transport("exhausted".into())),
            }
        }
    }
}
