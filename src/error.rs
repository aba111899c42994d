//! Error types used by the camvisor runtime and sessions.
//!
//! Two levels mirror the propagation policy:
//!
//! - [`SessionError`] — the only failures that escape a session's run loop.
//!   Everything transient (camera offline, throttling, process death,
//!   stalls) is absorbed and retried inside the state machine; what comes
//!   out here is fatal configuration, never retried.
//! - [`RuntimeError`] — failures of the orchestration runtime itself.
//!
//! Both provide `as_label()` for stable snake_case log/metric labels.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the orchestration runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period exceeded; some sessions remained stuck.
    #[error("shutdown grace {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Cameras whose sessions did not stop in time.
        stuck: Vec<String>,
    },

    /// A camera session terminated on a fatal configuration error.
    #[error("session {camera} failed fatally: {error}")]
    SessionFailed {
        /// The camera whose session died.
        camera: String,
        /// The underlying fatal error.
        error: String,
    },
}

impl RuntimeError {
    /// Short stable label (snake_case) for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::SessionFailed { .. } => "runtime_session_failed",
        }
    }
}

/// # Fatal session failures.
///
/// Returned by `SessionActor::run` only when retrying is pointless: the
/// failure pattern implicates local configuration (the transcoder install or
/// the output sink), not the camera or the network.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SessionError {
    /// The transcoder executable failed to launch repeatedly.
    #[error("transcoder launch failed {attempts} consecutive times; giving up: {error}")]
    LaunchExhausted {
        /// Consecutive launch failures observed.
        attempts: u32,
        /// The last launch error.
        error: String,
    },

    /// The placeholder pipeline — local clip into the sink — kept dying
    /// immediately, implicating the sink.
    #[error("output sink rejected {attempts} consecutive placeholder runs; giving up: {error}")]
    SinkBroken {
        /// Consecutive immediate deaths observed.
        attempts: u32,
        /// Description of the last exit.
        error: String,
    },
}

impl SessionError {
    /// Short stable label (snake_case) for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SessionError::LaunchExhausted { .. } => "session_launch_exhausted",
            SessionError::SinkBroken { .. } => "session_sink_broken",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        let err = RuntimeError::GraceExceeded {
            grace: Duration::from_secs(5),
            stuck: vec![],
        };
        assert_eq!(err.as_label(), "runtime_grace_exceeded");

        let err = SessionError::LaunchExhausted {
            attempts: 5,
            error: "No such file".into(),
        };
        assert_eq!(err.as_label(), "session_launch_exhausted");
    }
}
