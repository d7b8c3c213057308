// SPDX-License-Identifier: MIT OR Apache-2.0
//! LRU rule-pack cache with single-flight load deduplication.
//!
//! Spec §5 requires an "at-most-once" load guarantee: concurrent requests
//! for the same `(airline, month, file_version)` must share one load rather
//! than racing the filesystem N times.

use crate::compiled::CompiledRulePack;
use crate::loader::{LoadError, RulePackLoader};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

/// Cache key: airline + month + the loader's file-version marker. A file
/// edit bumps `file_version`, which is a distinct key, so stale compiled
/// packs are never served after the pack file changes on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Key {
    airline: String,
    month: String,
    file_version: u64,
}

enum Slot {
    Loading(Arc<Notify>),
    Ready(Arc<CompiledRulePack>),
}

/// Shared, async-safe cache in front of a [`RulePackLoader`].
pub struct RulePackCache {
    loader: RulePackLoader,
    entries: Mutex<LruCache<Key, Arc<CompiledRulePack>>>,
    inflight: Mutex<HashMap<Key, Arc<Notify>>>,
}

impl RulePackCache {
    /// Create a cache wrapping `loader`, holding up to `capacity` compiled
    /// packs.
    #[must_use]
    pub fn new(loader: RulePackLoader, capacity: NonZeroUsize) -> Self {
        Self {
            loader,
            entries: Mutex::new(LruCache::new(capacity)),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Get the compiled rule pack for `(airline, month)`, loading and
    /// compiling it at most once even under concurrent callers.
    pub async fn get(
        &self,
        airline: &str,
        month: &str,
    ) -> Result<Arc<CompiledRulePack>, LoadError> {
        let file_version = self.loader.file_version(airline, month);
        let key = Key {
            airline: airline.to_string(),
            month: month.to_string(),
            file_version,
        };

        if let Some(pack) = self.entries.lock().await.get(&key) {
            return Ok(pack.clone());
        }

        loop {
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
                if let Some(pack) = self.entries.lock().await.get(&key) {
                    return Ok(pack.clone());
                }
                // The leader's load failed; fall through and race to lead again.
                continue;
            }

            // We are the leader for this key.
            let result = self.loader.load(airline, month);
            let notify = {
                let mut inflight = self.inflight.lock().await;
                inflight.remove(&key)
            };

            match result {
                Ok(compiled) => {
                    let pack = Arc::new(compiled);
                    self.entries.lock().await.put(key, pack.clone());
                    if let Some(notify) = notify {
                        notify.notify_waiters();
                    }
                    return Ok(pack);
                }
                Err(err) => {
                    if let Some(notify) = notify {
                        notify.notify_waiters();
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Evict every entry for `(airline, month)` regardless of version,
    /// forcing the next `get` to reload from disk.
    pub async fn invalidate(&self, airline: &str, month: &str) {
        let mut entries = self.entries.lock().await;
        let stale: Vec<Key> = entries
            .iter()
            .map(|(k, _)| k.clone())
            .filter(|k| k.airline == airline && k.month == month)
            .collect();
        for key in stale {
            entries.pop(&key);
        }
    }
}
