//! # Backoff policy for live-acquisition retries.
//!
//! [`BackoffPolicy`] controls how retry delays grow while a camera keeps
//! failing to produce a live stream. It is parameterized by:
//! - [`BackoffPolicy::first`] the initial delay;
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::max`] the maximum delay cap.
//!
//! The delay for attempt `n` is `first × factor^n`, clamped to `max`, then
//! jitter is applied. The base delay is derived purely from the attempt
//! number; jitter output never feeds back into subsequent calculations, so
//! unjittered delays are monotonically non-decreasing up to the cap.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use camvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_secs(2),
//!     max: Duration::from_secs(30),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_secs(2));
//! assert_eq!(backoff.next(1), Duration::from_secs(4));
//! assert_eq!(backoff.next(2), Duration::from_secs(8));
//! // 2s × 2^10 = 2048s → capped
//! assert_eq!(backoff.next(10), Duration::from_secs(30));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff policy for failed live acquisitions.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter applied to the clamped base delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a policy with `first = 2s`, `factor = 2.0`, `max = 60s`,
    /// `jitter = Full`.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(2),
            max: Duration::from_secs(60),
            factor: 2.0,
            jitter: JitterPolicy::Full,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay for the given attempt number (0-indexed).
    ///
    /// The base delay is `first × factor^attempt`, clamped to
    /// [`BackoffPolicy::max`]; jitter is applied to the clamped base.
    pub fn next(&self, attempt: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = attempt.min(i32::MAX as u32) as i32;
        let unclamped = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !unclamped.is_finite() || unclamped < 0.0 || unclamped > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(unclamped)
        };

        self.jitter.apply(base)
    }

    /// Computes the delay for `attempt`, honoring a server-provided
    /// retry-after hint.
    ///
    /// The hint can lengthen a delay but never shorten it: the result is
    /// `max(next(attempt), hint)`.
    pub fn next_after(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let computed = self.next(attempt);
        match retry_after {
            Some(hint) => computed.max(hint),
            None => computed,
        }
    }
}
