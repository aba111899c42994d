//! Retry delay policies.
//!
//! Controls how long a session waits before the next live-acquisition
//! attempt after consecutive failures.
//!
//! ## Contents
//! - [`BackoffPolicy`] — how retry delays grow (first / factor / max + jitter)
//! - [`JitterPolicy`] — randomization strategy to avoid synchronized retry
//!   storms across camera sessions sharing one cloud endpoint
//!
//! ## Quick wiring
//! ```text
//! SessionParams { backoff: BackoffPolicy, .. }
//!      └─► core::session::SessionActor uses:
//!           - backoff.next(attempt) after a failed acquisition
//!           - backoff.next_after(attempt, hint) when the cloud API
//!             answered with a retry-after hint
//! ```

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
