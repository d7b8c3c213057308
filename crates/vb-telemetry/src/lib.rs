// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Structured telemetry and metrics collection for VectorBid pipeline runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::info;

// ---------------------------------------------------------------------------
// PipelineRunMetrics
// ---------------------------------------------------------------------------

/// Metrics captured for a single pipeline-stage invocation (one ingest, one
/// `parse_preferences`, one `optimize`, etc.).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineRunMetrics {
    /// Pipeline stage this run belongs to, e.g. `"optimize"`, `"export"`.
    pub stage: String,
    /// Airline this run was for, e.g. `"UAL"`.
    pub airline: String,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Candidates constructed by the optimizer (0 outside `optimize`/`retune`).
    pub candidates_generated: u64,
    /// Candidates dropped by hard-rule pruning or ranking cutoff.
    pub candidates_dropped: u64,
    /// Inbound LLM token count (0 when the rule-based fallback was used).
    pub llm_tokens_in: u64,
    /// Outbound LLM token count.
    pub llm_tokens_out: u64,
    /// Whether an LLM response cache hit served this run.
    pub llm_cache_hit: bool,
    /// Whether a rule-pack cache hit served this run.
    pub rulepack_cache_hit: bool,
    /// Number of errors encountered (rule evaluation warnings, upstream
    /// failures, etc.), not necessarily fatal to the run.
    pub errors_count: u64,
}

// ---------------------------------------------------------------------------
// MetricsSummary
// ---------------------------------------------------------------------------

/// Aggregated statistics across multiple runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsSummary {
    /// Number of runs recorded.
    pub count: usize,
    /// Mean duration in milliseconds.
    pub mean_duration_ms: f64,
    /// Median (p50) duration in milliseconds.
    pub p50_duration_ms: f64,
    /// 99th-percentile duration in milliseconds.
    pub p99_duration_ms: f64,
    /// Total inbound LLM tokens across all runs.
    pub total_llm_tokens_in: u64,
    /// Total outbound LLM tokens across all runs.
    pub total_llm_tokens_out: u64,
    /// Error rate (errors / total runs).
    pub error_rate: f64,
    /// Fraction of runs served by the LLM response cache.
    pub llm_cache_hit_rate: f64,
    /// Per-stage run counts (deterministic ordering).
    pub stage_counts: BTreeMap<String, usize>,
}

impl Default for MetricsSummary {
    fn default() -> Self {
        Self {
            count: 0,
            mean_duration_ms: 0.0,
            p50_duration_ms: 0.0,
            p99_duration_ms: 0.0,
            total_llm_tokens_in: 0,
            total_llm_tokens_out: 0,
            error_rate: 0.0,
            llm_cache_hit_rate: 0.0,
            stage_counts: BTreeMap::new(),
        }
    }
}

/// Compute a percentile value from a **sorted** slice.
fn percentile(sorted: &[u64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0] as f64;
    }
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted[lower] as f64 * (1.0 - frac) + sorted[upper] as f64 * frac
}

// ---------------------------------------------------------------------------
// MetricsCollector
// ---------------------------------------------------------------------------

/// Thread-safe collector for pipeline run metrics.
///
/// Wrap in an `Arc` to share across threads (the inner storage is already
/// behind a `Mutex`).
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<Vec<PipelineRunMetrics>>>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Create a new, empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Record a completed run's metrics.
    pub fn record(&self, metrics: PipelineRunMetrics) {
        let mut data = self.inner.lock().expect("metrics lock poisoned");
        data.push(metrics);
    }

    /// Return all recorded run metrics.
    #[must_use]
    pub fn runs(&self) -> Vec<PipelineRunMetrics> {
        let data = self.inner.lock().expect("metrics lock poisoned");
        data.clone()
    }

    /// Number of runs recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        let data = self.inner.lock().expect("metrics lock poisoned");
        data.len()
    }

    /// Whether the collector has no recorded runs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compute an aggregated summary of all recorded runs.
    #[must_use]
    pub fn summary(&self) -> MetricsSummary {
        let data = self.inner.lock().expect("metrics lock poisoned");
        if data.is_empty() {
            return MetricsSummary::default();
        }

        let count = data.len();
        let mut durations: Vec<u64> = data.iter().map(|r| r.duration_ms).collect();
        durations.sort_unstable();

        let total_duration: u64 = durations.iter().sum();
        let mean_duration_ms = total_duration as f64 / count as f64;
        let p50_duration_ms = percentile(&durations, 50.0);
        let p99_duration_ms = percentile(&durations, 99.0);

        let total_llm_tokens_in: u64 = data.iter().map(|r| r.llm_tokens_in).sum();
        let total_llm_tokens_out: u64 = data.iter().map(|r| r.llm_tokens_out).sum();

        let errors: u64 = data.iter().map(|r| r.errors_count).sum();
        let error_rate = errors as f64 / count as f64;

        let cache_hits = data.iter().filter(|r| r.llm_cache_hit).count();
        let llm_cache_hit_rate = cache_hits as f64 / count as f64;

        let mut stage_counts: BTreeMap<String, usize> = BTreeMap::new();
        for r in data.iter() {
            *stage_counts.entry(r.stage.clone()).or_insert(0) += 1;
        }

        MetricsSummary {
            count,
            mean_duration_ms,
            p50_duration_ms,
            p99_duration_ms,
            total_llm_tokens_in,
            total_llm_tokens_out,
            error_rate,
            llm_cache_hit_rate,
            stage_counts,
        }
    }

    /// Clear all recorded metrics.
    pub fn clear(&self) {
        let mut data = self.inner.lock().expect("metrics lock poisoned");
        data.clear();
    }
}

// ---------------------------------------------------------------------------
// TelemetrySpan
// ---------------------------------------------------------------------------

/// A structured span for tracing integration.
///
/// Attribute values are free text and may originate from pilot-supplied
/// preference text; callers should run [`vb_core::redact::redact_text_emails`]
/// over any attribute sourced from user input before calling
/// [`TelemetrySpan::with_attribute`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySpan {
    /// Span name / operation.
    pub name: String,
    /// Arbitrary key-value attributes (deterministic ordering).
    pub attributes: BTreeMap<String, String>,
}

impl TelemetrySpan {
    /// Create a new span with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Insert an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Emit the span via `tracing::info!`.
    pub fn emit(&self) {
        info!(
            span_name = %self.name,
            attributes = ?self.attributes,
            "telemetry_span"
        );
    }
}

// ---------------------------------------------------------------------------
// TelemetryExporter
// ---------------------------------------------------------------------------

/// Trait for exporting collected metrics.
pub trait TelemetryExporter: Send + Sync {
    /// Export the given summary. Returns the serialized output on success.
    fn export(&self, summary: &MetricsSummary) -> Result<String, String>;
}

/// Exports metrics as pretty-printed JSON to a string.
#[derive(Debug, Default)]
pub struct JsonExporter;

impl TelemetryExporter for JsonExporter {
    fn export(&self, summary: &MetricsSummary) -> Result<String, String> {
        serde_json::to_string_pretty(summary).map_err(|e| e.to_string())
    }
}
