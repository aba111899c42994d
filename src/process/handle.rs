//! # Transcoder process contract.
//!
//! The seams between the session state machine and the external transcoding
//! process:
//! - [`Transcoder`] launches a process for a given source and sink;
//! - [`ProcessHandle`] is the runtime handle to one launched process;
//! - [`Exit`] is the crate's own exit status (constructible in tests).
//!
//! ## Rules
//! - At most one handle is active per session at any instant; the session
//!   fully stops (and reaps) the previous process before starting the next,
//!   so two writers never race on one sink.
//! - `stop` must release every resource (process, pipes, reader task)
//!   before returning.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;

use crate::process::probe::ActivityProbe;
use crate::source::{SourceKind, StreamSource};

/// How a supervised process ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    /// Exit code 0.
    Clean,
    /// Nonzero exit code.
    Failed(i32),
    /// Killed by a signal (no exit code).
    Signaled,
}

impl Exit {
    /// The process exit code, when the process exited on its own.
    pub fn code(&self) -> Option<i32> {
        match self {
            Exit::Clean => Some(0),
            Exit::Failed(code) => Some(*code),
            Exit::Signaled => None,
        }
    }

    /// True for a zero exit code.
    pub fn is_clean(&self) -> bool {
        matches!(self, Exit::Clean)
    }

    /// Converts an OS exit status.
    pub fn from_status(status: std::process::ExitStatus) -> Self {
        if status.success() {
            Exit::Clean
        } else {
            match status.code() {
                Some(code) => Exit::Failed(code),
                None => Exit::Signaled,
            }
        }
    }
}

/// Failures launching the external transcoder.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The executable could not be spawned at all.
    ///
    /// Fail-fast: surfaced to the state machine, never silently retried
    /// inside the process layer.
    #[error("failed to launch transcoder: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Runtime handle to one launched transcoding process.
#[async_trait]
pub trait ProcessHandle: Send {
    /// Which input the process was started with.
    fn kind(&self) -> SourceKind;

    /// OS process id, while known.
    fn pid(&self) -> Option<u32>;

    /// Launch instant.
    fn started_at(&self) -> Instant;

    /// Shared output-activity probe for this process.
    fn probe(&self) -> ActivityProbe;

    /// Resolves when the process exits on its own.
    ///
    /// Must be cancel-safe: the session selects this against watchdog ticks
    /// and cancellation.
    async fn wait(&mut self) -> Exit;

    /// Stops the process: graceful quit request first, forced kill once
    /// `grace` elapses. The process is fully reaped and all resources are
    /// released before this returns.
    async fn stop(self: Box<Self>, grace: Duration) -> Exit;
}

/// Launches transcoding processes.
#[async_trait]
pub trait Transcoder: Send + Sync + 'static {
    /// Starts the external process reading `source` and writing to `sink`.
    async fn start(
        &self,
        camera: &str,
        source: &StreamSource,
        sink: &str,
    ) -> Result<Box<dyn ProcessHandle>, ProcessError>;
}
