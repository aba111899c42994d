//! # Runtime events emitted by sessions and the supervisor.
//!
//! [`EventKind`] classifies everything observable about the runtime:
//! session lifecycle, stream transitions, failures, and shutdown progress.
//! The [`Event`] struct carries optional metadata (camera, attempt counts,
//! delays, exit codes) depending on the kind.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore exact order when events are consumed
//! from independent subscriber queues.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::SessionState;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Session lifecycle ===
    /// A camera session task has started.
    ///
    /// Sets: `camera`.
    SessionStarting,

    /// A session changed state.
    ///
    /// Sets: `camera`, `from`, `to`.
    StateChanged,

    /// A session reached its terminal state after a clean shutdown.
    ///
    /// Sets: `camera`.
    SessionStopped,

    /// A session terminated permanently on a fatal error.
    ///
    /// Sets: `camera`, `reason`.
    SessionDead,

    // === Stream pipeline ===
    /// Live acquisition failed; the session will fall back and retry.
    ///
    /// Sets: `camera`, `attempt`, `reason` (failure label + detail).
    ResolveFailed,

    /// The transcoder process could not be launched.
    ///
    /// Sets: `camera`, `attempt` (consecutive launch failures), `reason`.
    LaunchFailed,

    /// A live stream is being republished to the sink.
    ///
    /// Sets: `camera`, `pid`.
    LiveStarted,

    /// The placeholder clip is being looped to the sink.
    ///
    /// Sets: `camera`, `pid`.
    PlaceholderStarted,

    /// The active transcoder process exited.
    ///
    /// Sets: `camera`, `exit_code` (absent when killed by signal), `reason`
    /// (source kind label).
    ProcessExited,

    /// The watchdog observed no transcoder output beyond the staleness
    /// threshold.
    ///
    /// Sets: `camera`, `idle_ms`.
    StallDetected,

    /// The next live acquisition was scheduled after a failure.
    ///
    /// Sets: `camera`, `delay_ms`, `attempt` (consecutive failed
    /// acquisitions so far), `reason`.
    BackoffScheduled,

    // === Shutdown ===
    /// Shutdown requested (OS signal observed).
    ShutdownRequested,

    /// All sessions stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some sessions did not stop in time.
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Camera the event belongs to, if any.
    pub camera: Option<Arc<str>>,
    /// Consecutive-failure count, where applicable.
    pub attempt: Option<u32>,
    /// Scheduled delay before the next acquisition (ms, compact).
    pub delay_ms: Option<u32>,
    /// Observed output idle time when a stall fired (ms, compact).
    pub idle_ms: Option<u32>,
    /// Process exit code, when the process exited on its own.
    pub exit_code: Option<i32>,
    /// OS process id of a freshly started transcoder.
    pub pid: Option<u32>,
    /// Previous state for `StateChanged`.
    pub from: Option<SessionState>,
    /// New state for `StateChanged`.
    pub to: Option<SessionState>,
    /// Human-readable reason (failure labels, error details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            camera: None,
            attempt: None,
            delay_ms: None,
            idle_ms: None,
            exit_code: None,
            pid: None,
            from: None,
            to: None,
            reason: None,
        }
    }

    /// Attaches the camera name.
    #[inline]
    pub fn with_camera(mut self, camera: impl Into<Arc<str>>) -> Self {
        self.camera = Some(camera.into());
        self
    }

    /// Attaches a consecutive-failure count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a scheduled delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(compact_ms(d));
        self
    }

    /// Attaches an observed idle duration (stored as milliseconds).
    #[inline]
    pub fn with_idle(mut self, d: Duration) -> Self {
        self.idle_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a process exit code.
    #[inline]
    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    /// Attaches an OS process id.
    #[inline]
    pub fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }

    /// Attaches a state transition.
    #[inline]
    pub fn with_transition(mut self, from: SessionState, to: SessionState) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}
