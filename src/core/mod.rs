//! Runtime core: session orchestration and lifecycle.
//!
//! Internal modules:
//! - [`session`]: the per-camera state machine actor;
//! - [`supervisor`]: spawns sessions, fans out events, drives shutdown;
//! - [`state`]: the session state enum;
//! - [`shutdown`]: cross-platform shutdown signal handling.

pub mod session;
mod shutdown;
mod state;
mod supervisor;

pub use session::{SessionActor, SessionParams};
pub use state::SessionState;
pub use supervisor::Supervisor;
