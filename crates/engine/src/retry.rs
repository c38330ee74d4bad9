// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry backoff for transitions that fail into `RETRY`.

use rand::Rng;
use std::time::Duration;
use vaultflow_core::config::RetryConfig;

/// Delay before retry attempt `attempt` (0-indexed): `min(base * 2^attempt
/// + jitter, cap)`, where `jitter` is sampled uniformly from
/// `±25% * base * 2^attempt`.
pub fn backoff_delay(attempt: u32, retry: &RetryConfig) -> Duration {
    let raw = retry.base_ms as f64 * 2f64.powi(attempt as i32);
    let jitter_bound = raw * 0.25;
    let jitter = rand::thread_rng().gen_range(-jitter_bound..=jitter_bound);
    let delay = (raw + jitter).max(0.0).min(retry.cap_ms as f64);
    Duration::from_millis(delay.round() as u64)
}

/// Whether a failure kind classified as non-retryable per the component
/// design should skip `RETRY` and go straight to dead-letter admission.
pub fn is_retry_exhausted(attempts: u32, retry: &RetryConfig) -> bool {
    attempts >= retry.max_attempts
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
