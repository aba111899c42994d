//! # Event subscribers for the camvisor runtime.
//!
//! The [`Subscribe`] trait plus built-in implementations for handling
//! runtime events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ```text
//! SessionActor ── publish(Event) ──► Bus ──► Supervisor listener
//!                                               │
//!                                         SubscriberSet::emit
//!                                      ┌────────┴────────┐
//!                                      ▼                 ▼
//!                                  LogWriter        AliveTracker
//!                              (tracing records)  (stuck-session list)
//! ```

mod alive;
mod log;
mod set;
mod subscriber;

pub use alive::AliveTracker;
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
