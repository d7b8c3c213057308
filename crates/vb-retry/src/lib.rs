// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Generic retry/backoff and subsystem health tracking shared across the
//! pipeline: the LLM adapter retries transient upstream failures, ingestion
//! retries transient filesystem errors, and `/health` rolls up every
//! subsystem's [`HealthStatus`] into one report.

pub mod health;
pub mod retry;

pub use health::{HealthCheck, HealthMonitor, HealthReport, HealthStatus};
pub use retry::{
    compute_delay, retry_async, RetryAttempt, RetryConfig, RetryError, RetryMetadata, RetryOutcome,
};
