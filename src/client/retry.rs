//! Retry helpers shared by the retry middleware and error classification.
//!
//! This module provides helper functions for:
//! - Status code classification
//! - Exponential backoff
//! - `Retry-After` handling

use crate::protocol::constants::headers;
use crate::protocol::parse_retry_after;
use bytes::Bytes;
use std::time::Duration;

/// Longest wait between two attempts, whatever the server asks for.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(180);

/// Check if status code indicates retryable error
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429 | 502 | 503 | 504)
}

/// Exponential backoff delay calculation
///
/// `base_ms * 2^attempt`, with the exponent capped at 10.
pub fn exponential_backoff(attempt: u32, base_ms: u64) -> Duration {
    let delay_ms = base_ms.saturating_mul(2_u64.pow(attempt.min(10)));
    Duration::from_millis(delay_ms)
}

/// Delay before retrying after `response`.
///
/// A valid `Retry-After` header wins; otherwise exponential backoff from
/// `base`. The result never exceeds [`MAX_RETRY_DELAY`].
pub fn retry_delay(response: &http::Response<Bytes>, attempt: u32, base: Duration) -> Duration {
    let from_header = response
        .headers()
        .get(headers::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_retry_after(v).ok());

    from_header
        .unwrap_or_else(|| exponential_backoff(attempt, base.as_millis() as u64))
        .min(MAX_RETRY_DELAY)
}
