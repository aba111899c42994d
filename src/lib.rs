//! # camvisor
//!
//! **camvisor** continuously republishes live video feeds from
//! cloud-connected cameras to downstream media sinks, looping a local
//! placeholder clip whenever a live feed is unavailable, and recovering
//! from transient failures with bounded, jittered backoff. It runs
//! unattended as a long-lived background process.
//!
//! ## Architecture
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ SessionActor │   │ SessionActor │   │ SessionActor │
//!     │  (camera #1) │   │  (camera #2) │   │  (camera #N) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │ resolve          │                  │
//!            ▼                  ▼                  ▼
//!      Resolver (cloud API) ── one live locator per attempt
//!            │
//!            ▼ launch
//!      Transcoder (ffmpeg) ──► output sink (live or placeholder loop)
//!            │ stderr activity
//!            ▼
//!      ActivityProbe ◄── Watchdog staleness checks
//!
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (LogWriter, AliveTracker, custom subscribers)    │
//! │  - OS signal handling, grace-bounded shutdown                     │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Session lifecycle
//! ```text
//! Init ─► Resolving ──ok──► StreamingLive
//!            │ fail            │ process exit / output stall
//!            ▼                 ▼
//!   StreamingPlaceholder   Resolving (immediate), or Backoff when the
//!            │              camera flaps repeatedly inside a short window
//!            │ retry timer
//!            └─► Resolving
//! ```
//!
//! Transient failures (camera offline, throttling, timeouts, process
//! death, stalls) never escape a session. Only fatal configuration — a
//! transcoder that cannot launch, a sink that rejects every placeholder
//! run — terminates a session, and the process exits nonzero once no
//! session remains.
//!
//! The sink-continuity contract: once a session reaches a streaming state,
//! *something valid* is always being written — live feed or placeholder —
//! so downstream consumers never observe a silently dead sink.

pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod policies;
pub mod process;
pub mod source;
pub mod subscribers;
pub mod watchdog;

// ---- Public re-exports ----

pub use config::{Config, ConfigError};
pub use core::{SessionActor, SessionParams, SessionState, Supervisor};
pub use error::{RuntimeError, SessionError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use process::{ActivityProbe, Exit, FfmpegTranscoder, ProcessError, ProcessHandle, Transcoder};
pub use source::{HttpResolver, ResolveError, Resolver, SourceKind, StreamSource};
pub use subscribers::{AliveTracker, LogWriter, Subscribe, SubscriberSet};
pub use watchdog::Watchdog;
