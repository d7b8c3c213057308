// SPDX-License-Identifier: MIT OR Apache-2.0
//! Response cache keyed by `(model, prompt_digest)`, with single-flight
//! de-duplication of concurrent identical calls. Mirrors the
//! loader-cache-inflight shape used for compiled rule packs, the other
//! place in this workspace that needs to avoid a stampede of duplicate
//! expensive loads.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, Notify};

/// Cache key: a model id paired with the SHA-256 digest of the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    model: String,
    prompt_digest: String,
}

impl CacheKey {
    /// Build a key for `model`/`prompt`, hashing the prompt so the cache
    /// never retains raw (possibly PII-bearing) prompt text as a key.
    #[must_use]
    pub fn new(model: &str, prompt: &str) -> Self {
        let digest = format!("{:x}", Sha256::digest(prompt.as_bytes()));
        Self {
            model: model.to_string(),
            prompt_digest: digest,
        }
    }
}

struct Entry {
    value: Value,
    inserted_at: Instant,
}

/// A TTL'd, single-flight response cache for LLM completions.
pub struct ResponseCache {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<CacheKey, Entry>>,
    inflight: Mutex<HashMap<CacheKey, Arc<Notify>>>,
}

impl ResponseCache {
    /// Build a cache holding at most `capacity` live entries for `ttl`.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            ttl,
            capacity,
            entries: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Return a cached, still-fresh value for `key`, if any.
    pub async fn get(&self, key: &CacheKey) -> Option<Value> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Return the cached value for `key`, computing it via `compute` if
    /// absent or expired. Concurrent callers for the same key block on a
    /// single in-flight computation instead of each calling the backend.
    pub async fn get_or_compute<F, Fut, E>(&self, key: CacheKey, compute: F) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Value, E>>,
    {
        if let Some(hit) = self.get(&key).await {
            return Ok(hit);
        }

        let notify = {
            let mut inflight = self.inflight.lock().await;
            if let Some(existing) = inflight.get(&key) {
                Some(existing.clone())
            } else {
                inflight.insert(key.clone(), Arc::new(Notify::new()));
                None
            }
        };

        if let Some(notify) = notify {
            notify.notified().await;
            if let Some(hit) = self.get(&key).await {
                return Ok(hit);
            }
        }

        let result = compute().await;

        if let Ok(ref value) = result {
            self.insert(key.clone(), value.clone()).await;
        }

        let mut inflight = self.inflight.lock().await;
        if let Some(notify) = inflight.remove(&key) {
            notify.notify_waiters();
        }

        result
    }

    async fn insert(&self, key: CacheKey, value: Value) {
        let mut entries = self.entries.lock().await;
        if entries.len() >= self.capacity {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }
}
