// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Retry decisions for recognition calls — exponential backoff with jitter.
//
// Only transient errors (backend failures and timeouts) are retried. Bad
// input and encode failures fail immediately.

use std::time::Duration;

use idmask_core::config::RetryConfig;
use idmask_core::error::MaskError;
use idmask_core::types::ErrorClass;
use tracing::{debug, warn};

/// Result of evaluating whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after this delay.
    RetryAfter(Duration),
    /// Do not retry; the error is permanent.
    GiveUp(ErrorClass),
    /// Maximum retries exhausted.
    Exhausted,
}

/// Classify a `MaskError` for retry decisions.
pub fn classify_error(err: &MaskError) -> ErrorClass {
    err.class()
}

/// Decide whether to retry based on the error class and attempt count
/// (zero-based: attempt 0 is the first retry decision).
pub fn should_retry(err: &MaskError, attempt: u32, config: &RetryConfig) -> RetryDecision {
    match classify_error(err) {
        ErrorClass::Permanent => RetryDecision::GiveUp(ErrorClass::Permanent),
        ErrorClass::Transient => {
            if attempt >= config.max_retries {
                warn!(attempt, max = config.max_retries, "retry limit exhausted");
                RetryDecision::Exhausted
            } else {
                let delay = compute_delay(attempt, config);
                debug!(attempt, delay_ms = delay.as_millis(), "scheduling retry");
                RetryDecision::RetryAfter(delay)
            }
        }
    }
}

/// delay = min(base * 2^attempt + jitter, max_delay), jitter in [0, base).
fn compute_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let base_ms = config.base_delay().as_millis() as u64;
    let exp_ms = base_ms.saturating_mul(1u64 << attempt.min(10));
    let total_ms = exp_ms.saturating_add(jitter(base_ms, attempt));
    let capped_ms = total_ms.min(config.max_delay().as_millis() as u64);

    Duration::from_millis(capped_ms)
}

/// Deterministic spread across [0, base) keyed on the attempt number.
fn jitter(base_ms: u64, attempt: u32) -> u64 {
    let hash = (attempt as u64).wrapping_mul(6364136223846793005);
    hash % base_ms.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_failure_is_transient() {
        let err = MaskError::Backend("503 service unavailable".into());
        assert_eq!(classify_error(&err), ErrorClass::Transient);
    }

    #[test]
    fn retry_respects_max() {
        let config = RetryConfig {
            max_retries: 3,
            ..Default::default()
        };
        let err = MaskError::BackendTimeout { page: 0, seconds: 60 };
        assert!(matches!(should_retry(&err, 0, &config), RetryDecision::RetryAfter(_)));
        assert_eq!(should_retry(&err, 3, &config), RetryDecision::Exhausted);
    }

    #[test]
    fn permanent_error_never_retries() {
        let err = MaskError::Format("not an image".into());
        assert_eq!(
            should_retry(&err, 0, &RetryConfig::default()),
            RetryDecision::GiveUp(ErrorClass::Permanent)
        );
    }

    #[test]
    fn disabled_config_never_retries() {
        let err = MaskError::Backend("boom".into());
        assert_eq!(
            should_retry(&err, 0, &RetryConfig::disabled()),
            RetryDecision::Exhausted
        );
    }

    #[test]
    fn delay_increases_with_attempts() {
        let config = RetryConfig {
            max_delay_ms: 60_000,
            ..Default::default()
        };
        let d0 = compute_delay(0, &config);
        let d1 = compute_delay(1, &config);
        let d2 = compute_delay(2, &config);
        assert!(d1 > d0);
        assert!(d2 > d1);
    }

    #[test]
    fn delay_capped_at_max() {
        let config = RetryConfig::default();
        assert!(compute_delay(20, &config) <= config.max_delay());
    }
}
