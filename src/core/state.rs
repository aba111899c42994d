//! # Session state machine states.
//!
//! [`SessionState`] enumerates the states a camera session moves through.
//! Transitions are driven exclusively by the owning
//! [`SessionActor`](crate::core::session::SessionActor); no other component
//! writes session state.
//!
//! ```text
//! Init ──► Resolving ──ok──► StreamingLive ◄─┐
//!             │  ▲                │          │ (retry ok)
//!       fail  │  │ retry timer    │ exit /   │
//!             ▼  │                ▼ stall    │
//!   StreamingPlaceholder      Resolving ─────┘
//!             │                   │ flapping
//!             │                   ▼
//!             │                Backoff ──► Resolving
//!             └──────────────────┬─────────────────
//!                                ▼ shutdown / fatal
//!                        ShuttingDown ──► Stopped
//! ```

use std::fmt;

/// State of a single camera session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Created, not yet driven.
    Init,
    /// Asking the cloud for a live stream locator.
    Resolving,
    /// A transcoder process is republishing the live feed.
    StreamingLive,
    /// A transcoder process is looping the placeholder clip.
    StreamingPlaceholder,
    /// Waiting out a backoff delay after a flapping live feed.
    Backoff,
    /// Shutdown requested; stopping the active process.
    ShuttingDown,
    /// Terminal: the session will not run again.
    Stopped,
}

impl SessionState {
    /// Short stable label (snake_case) for logs and events.
    pub fn as_label(&self) -> &'static str {
        match self {
            SessionState::Init => "init",
            SessionState::Resolving => "resolving",
            SessionState::StreamingLive => "streaming_live",
            SessionState::StreamingPlaceholder => "streaming_placeholder",
            SessionState::Backoff => "backoff",
            SessionState::ShuttingDown => "shutting_down",
            SessionState::Stopped => "stopped",
        }
    }

    /// True while a transcoder process should be writing to the sink.
    pub fn is_streaming(&self) -> bool {
        matches!(
            self,
            SessionState::StreamingLive | SessionState::StreamingPlaceholder
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(SessionState::StreamingLive.as_label(), "streaming_live");
        assert_eq!(SessionState::Stopped.as_label(), "stopped");
    }

    #[test]
    fn streaming_states() {
        assert!(SessionState::StreamingLive.is_streaming());
        assert!(SessionState::StreamingPlaceholder.is_streaming());
        assert!(!SessionState::Backoff.is_streaming());
        assert!(!SessionState::Resolving.is_streaming());
    }
}
